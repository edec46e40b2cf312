//! The landgen library turns a short business brief, optionally enriched with the
//! voice of an existing website, into a structured landing-page specification,
//! and keeps that specification editable section by section.

pub mod constants;
pub mod crawl;
pub mod error;
pub mod generate;
pub mod lifecycle;
pub mod page;
pub mod parse;
pub mod prompt;
pub mod storage;

/// Enum representing the body-text extraction method used while crawling.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum TextBy {
    /// Visible text with scripts, styles and page chrome removed
    #[default]
    Stripped,
    /// Use dom_smoothie readability scoring to keep the main article
    Readability,
    /// Use fast_html2md to convert the page to markdown
    Markdown,
}

impl std::str::FromStr for TextBy {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "stripped" => Ok(TextBy::Stripped),
            "readability" => Ok(TextBy::Readability),
            "markdown" => Ok(TextBy::Markdown),
            _ => Err(format!("Invalid text extraction method: {}", input)),
        }
    }
}

pub use crawl::{CrawlConfig, extract_brand_context};
pub use error::{GenerationError, PageError, ValidationError};
pub use generate::{GenerationContext, generate_full_spec, regenerate_one_section};
pub use lifecycle::PageService;
pub use page::{Brief, BrandContext, PageSpecification, Section, SectionContent, SectionKind};
pub use prompt::{compose_generation_prompt, compose_regeneration_prompt};
pub use storage::{PageStore, Storage};
