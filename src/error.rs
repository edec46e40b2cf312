//! Error taxonomy shared by the generation pipeline and the page lifecycle.

use std::time::Duration;

use llm::error::LLMError;
use thiserror::Error;

/// A caller-supplied value that failed validation, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid `{field}`: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Prefixes the field path, e.g. `headline` becomes `sections.hero-1.headline`.
    #[must_use]
    pub fn within(self, parent: &str) -> Self {
        Self {
            field: format!("{parent}.{}", self.field),
            message: self.message,
        }
    }
}

/// Failure of a single page fetch during brand-context extraction.
///
/// Never surfaced past the extractor: a homepage failure turns into "no brand
/// context" and an inner-page failure is logged and skipped.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Failure of one call to the text-generation provider.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation provider failed: {0}")]
    Provider(#[from] LLMError),
    #[error("generation provider did not answer within {0:?}")]
    ProviderTimeout(Duration),
    #[error("malformed generation output: {reason}")]
    MalformedOutput { reason: String, raw: String },
    #[error("regenerated content repeats the current `{field}`")]
    RepeatedContent { field: &'static str },
}

impl GenerationError {
    pub(crate) fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        Self::MalformedOutput {
            reason: reason.into(),
            raw: raw.to_owned(),
        }
    }

    /// Output was received but could not be used as-is.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedOutput { .. } | Self::RepeatedContent { .. }
        )
    }

    /// Network, auth, rate-limit or timeout failure on the provider side.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::ProviderTimeout(_))
    }
}

/// Errors surfaced by [`crate::lifecycle::PageService`] operations.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("page {0} not found")]
    PageNotFound(String),
    #[error("section {section_id} not found in page {page_id}")]
    SectionNotFound { page_id: String, section_id: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("page {page_id} changed since version {expected}")]
    VersionConflict { page_id: String, expected: u32 },
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl PageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PageNotFound(_) | Self::SectionNotFound { .. })
    }

    /// Message suitable for showing to the person who issued the request.
    pub fn user_message(&self) -> String {
        match self {
            Self::PageNotFound(_) | Self::SectionNotFound { .. } => self.to_string(),
            Self::Validation(error) => error.to_string(),
            Self::VersionConflict { .. } => {
                format!("{self}; reload the page and try again")
            }
            Self::Generation(_) => "Could not generate content, try again.".to_owned(),
            Self::Storage(_) => "Internal storage failure.".to_owned(),
        }
    }
}
