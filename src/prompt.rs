//! The prompt module composes the instructions sent to the generation provider:
//! one for a complete page and one for regenerating a single section.

use uuid::Uuid;

use crate::constants::{
    BRAND_CONTEXT_HEADING, BRAND_CONTEXT_INSTRUCTIONS, CONTACT_RULES, CONTENT_GUIDELINES,
    FAQ_RULES, FEATURES_RULES, FOOTER_RULES, HERO_RULES, PAGE_ID_PREFIX, PAGE_SCHEMA_TEMPLATE,
    RAW_JSON_ONLY, REGENERATION_KEY_RULES, TESTIMONIALS_RULES,
};
use crate::page::{Brief, BrandContext, Section, SectionKind};

/// A full-page prompt together with the page identifier it announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPrompt {
    pub page_id: String,
    pub text: String,
}

/// Creates a fresh page identifier such as `landing-1a2b3c4d`.
pub fn new_page_id() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{PAGE_ID_PREFIX}{suffix}")
}

/// Builds the full-page generation prompt.
///
/// Every call announces a new page identifier. With a brand context the
/// crawled website governs tone; without one the brief's `brand_tone` does.
pub fn compose_generation_prompt(
    brief: &Brief,
    brand_context: Option<&BrandContext>,
) -> GenerationPrompt {
    let page_id = new_page_id();

    let tone_section = match brand_context {
        Some(context) => format!(
            "\n{BRAND_CONTEXT_HEADING}\n{context}\n\n{BRAND_CONTEXT_INSTRUCTIONS}"
        ),
        None => format!("\nUse a {} tone throughout all copy.\n", brief.brand_tone),
    };

    let schema = PAGE_SCHEMA_TEMPLATE
        .replace("{page_id}", &page_id)
        .replace("{company}", &brief.offer);

    let text = format!(
        "You are an expert landing page designer and copywriter. \
Generate a landing page JSON specification that converts visitors into customers.

## USER REQUIREMENTS
- Industry: {industry}
- Offer/Product: {offer}
- Target Audience: {audience}
- Brand Tone: {tone}
{tone_section}
{CONTENT_GUIDELINES}

## TECHNICAL REQUIREMENTS

{RAW_JSON_ONLY}

Use this exact structure:

{schema}

Generate the complete landing page JSON now:",
        industry = brief.industry,
        offer = brief.offer,
        audience = brief.target_audience,
        tone = brief.brand_tone,
    );

    GenerationPrompt { page_id, text }
}

/// What must change and what must stay fixed when regenerating each kind.
pub fn regeneration_rules(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Hero => HERO_RULES,
        SectionKind::Features => FEATURES_RULES,
        SectionKind::Testimonials => TESTIMONIALS_RULES,
        SectionKind::Faq => FAQ_RULES,
        SectionKind::Contact => CONTACT_RULES,
        SectionKind::Footer => FOOTER_RULES,
    }
}

/// Builds the prompt asking for fresh content for one section.
///
/// The section's current data is shown for reference and its `id`, `type` and
/// `order` are echoed back as fixed fields of the expected response.
pub fn compose_regeneration_prompt(
    section: &Section,
    brief: &Brief,
    brand_context: Option<&BrandContext>,
) -> String {
    let kind = section.kind();
    let current_data = serde_json::to_string_pretty(&section.content)
        .unwrap_or_else(|_| format!("{:?}", section.content));

    let crawl_info = brand_context
        .map(|context| format!("\n\nBRAND CONTEXT FROM WEBSITE:\n{context}\n"))
        .unwrap_or_default();

    format!(
        "You are an expert landing page designer. Regenerate a single landing page section.

ORIGINAL USER CONTEXT:
- Industry: {industry}
- Offer: {offer}
- Target Audience: {audience}
- Brand Tone: {tone}{crawl_info}

CURRENT {kind_upper} SECTION TO REPLACE:
{current_data}

REGENERATION INSTRUCTIONS:
{rules}

{REGENERATION_KEY_RULES}

{RAW_JSON_ONLY} Respond with exactly this shape, keeping id, type and order as given:

{{
  \"id\": \"{id}\",
  \"type\": \"{kind}\",
  \"order\": {order},
  \"data\": {{ ...new content using the same field names as the current data... }}
}}

Generate completely NEW and UNIQUE content now:",
        industry = brief.industry,
        offer = brief.offer,
        audience = brief.target_audience,
        tone = brief.brand_tone,
        kind_upper = kind.as_str().to_uppercase(),
        rules = regeneration_rules(kind),
        id = section.id,
        order = section.order,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::tests::hero_data;
    use serde_json::json;
    use spectral::prelude::*;

    fn bakery() -> Brief {
        Brief {
            industry: "bakery".to_owned(),
            offer: "custom cakes".to_owned(),
            target_audience: "event planners".to_owned(),
            brand_tone: "warm".to_owned(),
            url: None,
        }
    }

    fn hero() -> Section {
        serde_json::from_value(json!({
            "id": "hero-1",
            "type": "hero",
            "order": 0,
            "data": hero_data("Cakes that steal the show")
        }))
        .expect("valid hero")
    }

    #[test]
    fn brief_without_context_governs_tone() {
        let prompt = compose_generation_prompt(&bakery(), None);

        for expected in ["bakery", "custom cakes", "event planners", "warm tone"] {
            assert_that(&prompt.text.contains(expected)).is_true();
        }
        assert_that(&prompt.text.contains("BRAND CONTEXT")).is_false();
    }

    #[test]
    fn brand_context_is_embedded_and_takes_precedence() {
        let context = BrandContext::new("=== HOME PAGE ===\nURL: https://crumb.example/");
        let prompt = compose_generation_prompt(&bakery(), Some(&context));

        assert_that(&prompt.text.contains(BRAND_CONTEXT_HEADING)).is_true();
        assert_that(&prompt.text.contains("URL: https://crumb.example/")).is_true();
        assert_that(&prompt.text.contains("PRIMARY reference")).is_true();
        assert_that(&prompt.text.contains("Use a warm tone")).is_false();
    }

    #[test]
    fn each_prompt_announces_a_fresh_page_id() {
        let first = compose_generation_prompt(&bakery(), None);
        let second = compose_generation_prompt(&bakery(), None);

        assert_that(&first.page_id.starts_with(PAGE_ID_PREFIX)).is_true();
        assert_that(&first.page_id.len()).is_equal_to(PAGE_ID_PREFIX.len() + 8);
        assert_that(&first.page_id).is_not_equal_to(&second.page_id);
        assert_that(&first.text.contains(&format!("\"pageId\": \"{}\"", first.page_id))).is_true();
    }

    #[test]
    fn schema_lists_every_section_in_order() {
        let prompt = compose_generation_prompt(&bakery(), None);

        let mut last = 0;
        for (order, kind) in SectionKind::ALL.iter().enumerate() {
            let marker = format!("\"type\": \"{kind}\",\n      \"order\": {order},");
            let position = prompt.text.find(&marker).expect("section present in schema");
            assert_that(&(position >= last)).is_true();
            last = position;
        }
        assert_that(&prompt.text.contains("© <current year> custom cakes.")).is_true();
        assert_that(&prompt.text.contains("no explanatory text, just raw JSON")).is_true();
    }

    #[test]
    fn regeneration_prompt_echoes_identity_and_current_data() {
        let prompt = compose_regeneration_prompt(&hero(), &bakery(), None);

        assert_that(&prompt.contains("\"id\": \"hero-1\"")).is_true();
        assert_that(&prompt.contains("\"type\": \"hero\"")).is_true();
        assert_that(&prompt.contains("\"order\": 0")).is_true();
        assert_that(&prompt.contains("CURRENT HERO SECTION TO REPLACE")).is_true();
        assert_that(&prompt.contains("Cakes that steal the show")).is_true();
        assert_that(&prompt.contains(HERO_RULES)).is_true();
        assert_that(&prompt.contains("Don't use the exact same words/phrases")).is_true();
        assert_that(&prompt.contains("BRAND CONTEXT")).is_false();
    }

    #[test]
    fn regeneration_prompt_carries_brand_context() {
        let context = BrandContext::new("=== HOME PAGE ===\nURL: https://crumb.example/");
        let prompt = compose_regeneration_prompt(&hero(), &bakery(), Some(&context));

        assert_that(&prompt.contains("BRAND CONTEXT FROM WEBSITE:\n=== HOME PAGE ===")).is_true();
        assert_that(&prompt.contains("- Brand Tone: warm")).is_true();
    }

    #[test]
    fn every_kind_has_distinct_rules() {
        let rules: std::collections::HashSet<&str> =
            SectionKind::ALL.into_iter().map(regeneration_rules).collect();

        assert_that(&rules.len()).is_equal_to(SectionKind::ALL.len());
    }
}
