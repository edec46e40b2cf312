//! The generate module sends composed prompts to the text-generation provider
//! and turns its raw JSON answers into page specifications and sections.

use std::time::Duration;

use anyhow::Result;
use llm::LLMProvider;
use llm::builder::LLMBuilder;
use llm::chat::{ChatMessage, ChatProvider};
use log::{debug, info, warn};
use rate_guard::{RateLimit, StdTokenBucket, TokenBucketBuilder};
use serde::Deserialize;
use serde_json::Value;

use crate::constants::{
    DEFAULT_PROVIDER_TIMEOUT, GENERATION_TEMPERATURE, PAGE_MAX_TOKENS, SECTION_MAX_TOKENS,
    SYSTEM_PERSONA,
};
use crate::error::GenerationError;
use crate::page::{
    BrandContext, Brief, PageSpecification, Section, SectionContent, sort_sections,
    validate_sections,
};
use crate::prompt::{compose_generation_prompt, compose_regeneration_prompt};

/// Models and limits shared by generation calls.
///
/// Holds only shared references, so each request can build its own context
/// over the same long-lived providers.
pub struct GenerationContext<'a> {
    /// Model used for full pages
    pub page_model: &'a dyn ChatProvider,
    /// Model used for single-section regeneration
    pub section_model: &'a dyn ChatProvider,
    /// Rate limiter for controlling request frequency
    pub rate_limiter: Option<&'a StdTokenBucket>,
    /// Upper bound on one provider call
    pub timeout: Duration,
}

impl<'a> GenerationContext<'a> {
    /// Context using one model for both kinds of call and the default timeout.
    pub fn new(model: &'a dyn ChatProvider) -> Self {
        Self {
            page_model: model,
            section_model: model,
            rate_limiter: None,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    async fn complete(
        &self,
        model: &dyn ChatProvider,
        prompt: String,
    ) -> Result<String, GenerationError> {
        if let Some(limiter) = self.rate_limiter {
            loop {
                match limiter.try_acquire(1) {
                    Ok(()) => break,
                    Err(_) => {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }

        let messages = vec![ChatMessage::user().content(prompt).build()];
        let response = tokio::time::timeout(self.timeout, model.chat(&messages))
            .await
            .map_err(|_| GenerationError::ProviderTimeout(self.timeout))?
            .inspect_err(|llm_error| warn!("Generation provider failed: {llm_error}"))?;

        response
            .text()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::malformed("provider returned no text", ""))
    }
}

/// Providers for page and section generation, built from one model definition.
pub struct Models {
    pub page: Box<dyn LLMProvider>,
    pub section: Box<dyn LLMProvider>,
}

/// Builds both generation models with the system persona and sampling settings.
///
/// `builder` is called once per model and should carry backend, model name,
/// API key and timeout.
///
/// # Errors
///
/// Returns an error if the LLM backend refuses the configuration.
pub fn build_models(builder: impl Fn() -> LLMBuilder) -> Result<Models> {
    let build = |max_tokens: u32| {
        builder()
            .system(SYSTEM_PERSONA)
            .temperature(GENERATION_TEMPERATURE)
            .max_tokens(max_tokens)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build LLM model: {}", e))
    };

    Ok(Models {
        page: build(PAGE_MAX_TOKENS)?,
        section: build(SECTION_MAX_TOKENS)?,
    })
}

/// Token bucket allowing `rpm` provider requests per minute.
pub fn rate_limiter(rpm: Option<u32>) -> Option<StdTokenBucket> {
    rpm.and_then(|rpm| {
        let capacity = rpm.max(1) as u64;
        let refill_interval = Duration::from_secs_f64(60.0 / capacity as f64);

        TokenBucketBuilder::builder()
            .capacity(capacity)
            .refill_amount(1_u64)
            .refill_every(refill_interval)
            .with_time(rate_guard::StdTimeSource::new())
            .with_precision::<rate_guard::Nanos>()
            .build()
            .ok()
    })
}

/// Shape of a full-page answer before defaults are filled in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedPage {
    page_id: Option<String>,
    version: Option<u32>,
    sections: Vec<Section>,
}

/// Shape of a section answer. Only `data` is used; the echoed identity is
/// compared for logging and never has to be well typed.
#[derive(Deserialize)]
struct GeneratedSection {
    id: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<Value>,
    order: Option<Value>,
    data: Value,
}

/// Generates a complete page specification for `brief`.
///
/// # Errors
///
/// Returns [`GenerationError::MalformedOutput`] when the answer is not strict
/// JSON of the page schema, and a provider error or timeout when the call fails.
pub async fn generate_full_spec(
    ctx: &GenerationContext<'_>,
    brief: &Brief,
    brand_context: Option<&BrandContext>,
) -> Result<PageSpecification, GenerationError> {
    info!(
        "Generating page for {} (brand context: {})",
        brief.industry,
        brand_context.is_some()
    );

    let prompt = compose_generation_prompt(brief, brand_context);
    debug!("Generation prompt is {} characters", prompt.text.len());

    let raw = ctx.complete(ctx.page_model, prompt.text).await?;
    parse_page(&raw, prompt.page_id)
}

fn parse_page(raw: &str, announced_page_id: String) -> Result<PageSpecification, GenerationError> {
    let generated: GeneratedPage = serde_json::from_str(raw)
        .map_err(|e| GenerationError::malformed(e.to_string(), raw))?;

    let mut sections = generated.sections;
    validate_sections(&sections).map_err(|e| GenerationError::malformed(e.to_string(), raw))?;
    for section in &sections {
        section
            .content
            .check_generated_shape()
            .map_err(|reason| GenerationError::malformed(reason, raw))?;
    }
    sort_sections(&mut sections);

    let version = match generated.version {
        Some(0) => return Err(GenerationError::malformed("version must be positive", raw)),
        Some(version) => version,
        None => 1,
    };

    Ok(PageSpecification {
        page_id: generated
            .page_id
            .filter(|page_id| !page_id.trim().is_empty())
            .unwrap_or(announced_page_id),
        version,
        sections,
    })
}

/// Generates new content for `section`, keeping its field names.
///
/// The returned section always carries the `id`, `type` and `order` of
/// `section`, whatever the provider echoed.
///
/// # Errors
///
/// Returns [`GenerationError::MalformedOutput`] when the answer is not strict
/// JSON with a `data` object of the section's type,
/// [`GenerationError::RepeatedContent`] when it reuses the current primary
/// wording, and a provider error or timeout when the call fails.
pub async fn regenerate_one_section(
    ctx: &GenerationContext<'_>,
    section: &Section,
    brief: &Brief,
    brand_context: Option<&BrandContext>,
) -> Result<Section, GenerationError> {
    info!("Regenerating {} section {}", section.kind(), section.id);

    let prompt = compose_regeneration_prompt(section, brief, brand_context);
    let raw = ctx.complete(ctx.section_model, prompt).await?;
    parse_section(&raw, section)
}

fn parse_section(raw: &str, current: &Section) -> Result<Section, GenerationError> {
    let generated: GeneratedSection = serde_json::from_str(raw)
        .map_err(|e| GenerationError::malformed(e.to_string(), raw))?;

    let content = SectionContent::from_data(current.kind(), generated.data)
        .map_err(|e| GenerationError::malformed(e.to_string(), raw))?;
    content
        .validate()
        .map_err(|e| GenerationError::malformed(e.to_string(), raw))?;
    content
        .check_generated_shape()
        .map_err(|reason| GenerationError::malformed(reason, raw))?;

    if let Some(field) = content.repeated_field(&current.content) {
        warn!("Regenerated {} section repeats its {field}", current.id);
        return Err(GenerationError::RepeatedContent { field });
    }

    let echoed = [
        ("id", generated.id, Value::from(current.id.as_str())),
        ("type", generated.kind, Value::from(current.kind().as_str())),
        ("order", generated.order, Value::from(current.order)),
    ];
    for (field, echo, expected) in echoed {
        if let Some(echo) = echo.filter(|echo| *echo != expected) {
            warn!(
                "Provider changed {field} of section {} to {echo}, keeping {expected}",
                current.id
            );
        }
    }

    current
        .with_content(content)
        .map_err(|e| GenerationError::malformed(e.to_string(), raw))
}
