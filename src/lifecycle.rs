//! The lifecycle module orchestrates a page from generation to deletion:
//! crawl, compose, generate and persist, then edit, regenerate, reorder and
//! publish against the document store.

use std::collections::HashSet;

use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::crawl::{CrawlConfig, extract_brand_context};
use crate::error::{PageError, ValidationError};
use crate::generate::{GenerationContext, generate_full_spec, regenerate_one_section};
use crate::page::{BrandContext, Brief, Section, SectionContent, sort_sections, validate_sections};
use crate::storage::{PageStore, PageSummary, SectionUpdate, StoredPage};

/// Result of publishing a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub page_id: String,
    pub version: u32,
    /// Where the published page can be previewed.
    pub url: String,
}

/// Page operations over an explicitly passed store and crawl settings.
///
/// Operations that call the generation provider take the [`GenerationContext`]
/// as an argument, so reads and edits work without any model configured.
pub struct PageService<'a> {
    store: &'a dyn PageStore,
    crawl: &'a CrawlConfig,
}

impl<'a> PageService<'a> {
    pub fn new(store: &'a dyn PageStore, crawl: &'a CrawlConfig) -> Self {
        Self { store, crawl }
    }

    /// Generates a page from `brief` and persists it with its brief and brand context.
    ///
    /// A website that cannot be crawled only means generating without brand
    /// context. Nothing is stored unless generation succeeds.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad brief, a generation error when the
    /// provider fails or answers with unusable output, or a storage error.
    pub async fn generate(
        &self,
        generation: &GenerationContext<'_>,
        brief: &Brief,
        user_id: Option<&str>,
    ) -> Result<StoredPage, PageError> {
        brief.validate()?;

        let brand_context = self.brand_context_for(brief).await;
        let spec = generate_full_spec(generation, brief, brand_context.as_ref()).await?;
        let stored = self
            .store
            .save(&spec, brief, brand_context.as_ref(), user_id)?;

        info!(
            "Generated page {} with {} sections",
            stored.spec.page_id,
            stored.spec.sections.len()
        );
        Ok(stored)
    }

    async fn brand_context_for(&self, brief: &Brief) -> Option<BrandContext> {
        let Some(url) = brief.website() else {
            info!("No URL provided, generating without brand context");
            return None;
        };

        let brand_context = extract_brand_context(&url, self.crawl).await;
        if brand_context.is_none() {
            warn!("Website crawl failed, proceeding without brand context");
        }
        brand_context
    }

    /// # Errors
    ///
    /// Returns [`PageError::PageNotFound`] or a storage error.
    pub fn get(&self, page_id: &str) -> Result<StoredPage, PageError> {
        self.store
            .get_by_id(page_id)?
            .ok_or_else(|| PageError::PageNotFound(page_id.to_owned()))
    }

    /// # Errors
    ///
    /// Returns a storage error.
    pub fn list(&self, user_id: Option<&str>, limit: u32) -> Result<Vec<PageSummary>, PageError> {
        Ok(self.store.list_summaries(user_id, limit)?)
    }

    /// Replaces one section's data with `data`, which must fit the section's type.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown page or section, a validation
    /// error naming the offending `data` field, a version conflict when the page
    /// changed concurrently, or a storage error.
    pub fn edit_section(&self, page_id: &str, section_id: &str, data: Value) -> Result<StoredPage, PageError> {
        let page = self.get(page_id)?;
        let section = find_section(&page, section_id)?;

        let content = SectionContent::from_data(section.kind(), data)
            .map_err(|e| ValidationError::new("data", e.to_string()))?;
        content.validate().map_err(|e| e.within("data"))?;

        let edited = section.with_content(content)?;
        info!("Editing section {section_id} of page {page_id}");
        self.commit(&page, replace_section(&page, edited))
    }

    /// Regenerates one section's content and splices it back under the
    /// section's original `id`, `type` and `order`.
    ///
    /// Uses the stored brief and brand context unless `context_override` is
    /// given; an override with a URL is crawled afresh. The stored page is left
    /// untouched if generation fails.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown page or section, a generation
    /// error, a version conflict, or a storage error.
    pub async fn regenerate_section(
        &self,
        generation: &GenerationContext<'_>,
        page_id: &str,
        section_id: &str,
        context_override: Option<&Brief>,
    ) -> Result<StoredPage, PageError> {
        let page = self.get(page_id)?;
        let section = find_section(&page, section_id)?;

        let (brief, brand_context) = match context_override {
            Some(brief) => {
                brief.validate()?;
                let brand_context = if brief.website().is_some() {
                    self.brand_context_for(brief).await
                } else {
                    page.brand_context.clone()
                };
                (brief.clone(), brand_context)
            }
            None => (page.user_context.clone(), page.brand_context.clone()),
        };

        let regenerated =
            regenerate_one_section(generation, section, &brief, brand_context.as_ref()).await?;
        self.commit(&page, replace_section(&page, regenerated))
    }

    /// Stores a new ordering given as the full section list.
    ///
    /// The list must hold exactly the page's current section ids.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown page, a validation error for a
    /// list that is not a reordering of the current sections, a version
    /// conflict, or a storage error.
    pub fn reorder(&self, page_id: &str, mut sections: Vec<Section>) -> Result<StoredPage, PageError> {
        let page = self.get(page_id)?;
        validate_sections(&sections)?;

        let current: HashSet<&str> = page.spec.sections.iter().map(|s| s.id.as_str()).collect();
        let proposed: HashSet<&str> = sections.iter().map(|s| s.id.as_str()).collect();
        if current != proposed {
            return Err(ValidationError::new(
                "sections",
                "must contain exactly the page's current section ids",
            )
            .into());
        }

        sort_sections(&mut sections);
        info!("Reordering sections of page {page_id}");
        self.commit(&page, sections)
    }

    /// Marks the page published without changing its version.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::PageNotFound`] or a storage error.
    pub fn publish(&self, page_id: &str) -> Result<Publication, PageError> {
        let page = self
            .store
            .mark_published(page_id)?
            .ok_or_else(|| PageError::PageNotFound(page_id.to_owned()))?;

        info!("Published page {page_id} at version {}", page.spec.version);
        Ok(Publication {
            url: format!("/preview/{page_id}"),
            page_id: page.spec.page_id,
            version: page.spec.version,
        })
    }

    /// # Errors
    ///
    /// Returns [`PageError::PageNotFound`] or a storage error.
    pub fn delete(&self, page_id: &str) -> Result<(), PageError> {
        if self.store.delete_by_id(page_id)? {
            info!("Deleted page {page_id}");
            Ok(())
        } else {
            Err(PageError::PageNotFound(page_id.to_owned()))
        }
    }

    fn commit(&self, page: &StoredPage, sections: Vec<Section>) -> Result<StoredPage, PageError> {
        let page_id = &page.spec.page_id;
        match self
            .store
            .update_sections(page_id, &sections, page.spec.version)?
        {
            SectionUpdate::Updated(updated) => Ok(*updated),
            SectionUpdate::NotFound => Err(PageError::PageNotFound(page_id.clone())),
            SectionUpdate::VersionMismatch { current } => {
                warn!(
                    "Page {page_id} moved from version {} to {current} during update",
                    page.spec.version
                );
                Err(PageError::VersionConflict {
                    page_id: page_id.clone(),
                    expected: page.spec.version,
                })
            }
        }
    }
}

fn find_section<'p>(page: &'p StoredPage, section_id: &str) -> Result<&'p Section, PageError> {
    page.spec
        .section(section_id)
        .ok_or_else(|| PageError::SectionNotFound {
            page_id: page.spec.page_id.clone(),
            section_id: section_id.to_owned(),
        })
}

fn replace_section(page: &StoredPage, replacement: Section) -> Vec<Section> {
    page.spec
        .sections
        .iter()
        .map(|section| {
            if section.id == replacement.id {
                replacement.clone()
            } else {
                section.clone()
            }
        })
        .collect()
}
