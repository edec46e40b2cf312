//! Landing-page data model: the caller's brief, the crawled brand context and the
//! typed section payloads a page specification is made of.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use url::Url;

use crate::error::ValidationError;

static HEX_COLOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("Failed to compile HEX_COLOR regex")
});

/// The business description a page is generated from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brief {
    pub industry: String,
    pub offer: String,
    pub target_audience: String,
    pub brand_tone: String,
    /// Existing website to borrow brand voice from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Brief {
    /// Checks field lengths and that `url`, when present, is an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value, max) in [
            ("industry", &self.industry, 100),
            ("offer", &self.offer, 500),
            ("target_audience", &self.target_audience, 200),
            ("brand_tone", &self.brand_tone, 200),
        ] {
            let length = value.trim().chars().count();
            if length == 0 {
                return Err(ValidationError::new(field, "must not be empty"));
            }
            if length > max {
                return Err(ValidationError::new(
                    field,
                    format!("must be at most {max} characters"),
                ));
            }
        }

        if let Some(url) = &self.url {
            parse_web_url(url).map_err(|message| ValidationError::new("url", message))?;
        }

        Ok(())
    }

    /// The website to crawl, if one was supplied and parses as an absolute URL.
    pub fn website(&self) -> Option<Url> {
        self.url.as_deref().and_then(|url| parse_web_url(url).ok())
    }
}

fn parse_web_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| format!("not an absolute URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(format!("unsupported scheme `{scheme}`")),
    }
}

/// Folded summary of a crawled website, fed to prompts as a style reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandContext(String);

impl BrandContext {
    pub fn new(context: impl Into<String>) -> Self {
        Self(context.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BrandContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// The closed set of section variants a page can contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Hero,
    Features,
    Testimonials,
    Faq,
    Contact,
    Footer,
}

impl SectionKind {
    pub const ALL: [SectionKind; 6] = [
        SectionKind::Hero,
        SectionKind::Features,
        SectionKind::Testimonials,
        SectionKind::Faq,
        SectionKind::Contact,
        SectionKind::Footer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Hero => "hero",
            SectionKind::Features => "features",
            SectionKind::Testimonials => "testimonials",
            SectionKind::Faq => "faq",
            SectionKind::Contact => "contact",
            SectionKind::Footer => "footer",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroData {
    pub headline: String,
    pub subheadline: String,
    pub cta_text: String,
    pub background_image: String,
    pub text_color: String,
    pub background_color: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturesData {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub items: Vec<FeatureItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: String,
    pub quote: String,
    pub author: String,
    pub role: String,
    pub company: String,
    pub rating: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestimonialsData {
    pub title: String,
    pub items: Vec<Testimonial>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    pub id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqData {
    pub title: String,
    pub items: Vec<FaqItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactData {
    pub title: String,
    pub description: String,
    pub fields: Vec<FormField>,
    pub submit_text: String,
    pub background_color: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterLink {
    pub label: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterData {
    pub links: Vec<FooterLink>,
    pub social_links: Vec<SocialLink>,
    pub copyright: String,
}

/// Variant-specific payload of a section, keyed by [`SectionKind`].
///
/// Serializes as the bare payload object; the kind travels in the enclosing
/// section's `type` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SectionContent {
    Hero(HeroData),
    Features(FeaturesData),
    Testimonials(TestimonialsData),
    Faq(FaqData),
    Contact(ContactData),
    Footer(FooterData),
}

impl SectionContent {
    /// Interprets a raw `data` object as the payload of the given kind.
    ///
    /// # Errors
    ///
    /// Returns an error when the object lacks a required field of that kind or a
    /// field has the wrong JSON type.
    pub fn from_data(kind: SectionKind, data: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            SectionKind::Hero => Self::Hero(serde_json::from_value(data)?),
            SectionKind::Features => Self::Features(serde_json::from_value(data)?),
            SectionKind::Testimonials => Self::Testimonials(serde_json::from_value(data)?),
            SectionKind::Faq => Self::Faq(serde_json::from_value(data)?),
            SectionKind::Contact => Self::Contact(serde_json::from_value(data)?),
            SectionKind::Footer => Self::Footer(serde_json::from_value(data)?),
        })
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            Self::Hero(_) => SectionKind::Hero,
            Self::Features(_) => SectionKind::Features,
            Self::Testimonials(_) => SectionKind::Testimonials,
            Self::Faq(_) => SectionKind::Faq,
            Self::Contact(_) => SectionKind::Contact,
            Self::Footer(_) => SectionKind::Footer,
        }
    }

    /// Field-level checks applied to both generated output and caller edits.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Hero(hero) => {
                require_text("headline", &hero.headline)?;
                require_text("subheadline", &hero.subheadline)?;
                require_text("ctaText", &hero.cta_text)?;
                parse_web_url(&hero.background_image)
                    .map_err(|message| ValidationError::new("backgroundImage", message))?;
                require_hex("textColor", &hero.text_color)?;
                require_hex("backgroundColor", &hero.background_color)
            }
            Self::Features(features) => {
                require_text("title", &features.title)?;
                for (index, item) in features.items.iter().enumerate() {
                    let within = format!("items[{index}]");
                    require_text("id", &item.id).map_err(|e| e.within(&within))?;
                    require_text("title", &item.title).map_err(|e| e.within(&within))?;
                }
                Ok(())
            }
            Self::Testimonials(testimonials) => {
                require_text("title", &testimonials.title)?;
                for (index, item) in testimonials.items.iter().enumerate() {
                    let within = format!("items[{index}]");
                    require_text("quote", &item.quote).map_err(|e| e.within(&within))?;
                    require_text("author", &item.author).map_err(|e| e.within(&within))?;
                    if !(1..=5).contains(&item.rating) {
                        return Err(
                            ValidationError::new("rating", "must be between 1 and 5")
                                .within(&within),
                        );
                    }
                }
                Ok(())
            }
            Self::Faq(faq) => {
                require_text("title", &faq.title)?;
                for (index, item) in faq.items.iter().enumerate() {
                    let within = format!("items[{index}]");
                    require_text("question", &item.question).map_err(|e| e.within(&within))?;
                    require_text("answer", &item.answer).map_err(|e| e.within(&within))?;
                }
                Ok(())
            }
            Self::Contact(contact) => {
                require_text("title", &contact.title)?;
                require_text("submitText", &contact.submit_text)?;
                require_hex("backgroundColor", &contact.background_color)?;
                for (index, field) in contact.fields.iter().enumerate() {
                    require_text("name", &field.name)
                        .map_err(|e| e.within(&format!("fields[{index}]")))?;
                }
                Ok(())
            }
            Self::Footer(footer) => {
                require_text("copyright", &footer.copyright)?;
                for (index, link) in footer.links.iter().enumerate() {
                    let within = format!("links[{index}]");
                    require_text("label", &link.label).map_err(|e| e.within(&within))?;
                    require_text("url", &link.url).map_err(|e| e.within(&within))?;
                }
                Ok(())
            }
        }
    }

    /// Checks the item counts and fixed values every generated section must carry.
    ///
    /// # Errors
    ///
    /// Returns a description of the first deviation.
    pub fn check_generated_shape(&self) -> Result<(), String> {
        let (found, expected) = match self {
            Self::Features(features) => (features.items.len(), 3),
            Self::Testimonials(testimonials) => {
                if testimonials.items.iter().any(|item| item.rating != 5) {
                    return Err("testimonial ratings must be 5".to_owned());
                }
                (testimonials.items.len(), 2)
            }
            Self::Faq(faq) => (faq.items.len(), 3),
            Self::Hero(_) | Self::Contact(_) | Self::Footer(_) => return Ok(()),
        };

        if found == expected {
            Ok(())
        } else {
            Err(format!(
                "{} section must have {expected} items, got {found}",
                self.kind()
            ))
        }
    }

    /// Names the first primary field whose text is reused verbatim from `previous`.
    ///
    /// Comparison is on trimmed, case-folded text. Footers never repeat since
    /// their structure is held fixed on purpose.
    pub fn repeated_field(&self, previous: &SectionContent) -> Option<&'static str> {
        match (self, previous) {
            (Self::Hero(new), Self::Hero(old)) => {
                same_text(&new.headline, &old.headline).then_some("headline")
            }
            (Self::Features(new), Self::Features(old)) => {
                if same_text(&new.title, &old.title) {
                    return Some("title");
                }
                reuses_any(
                    new.items.iter().map(|item| &item.title),
                    old.items.iter().map(|item| &item.title),
                )
                .then_some("items.title")
            }
            (Self::Testimonials(new), Self::Testimonials(old)) => {
                if reuses_any(
                    new.items.iter().map(|item| &item.quote),
                    old.items.iter().map(|item| &item.quote),
                ) {
                    return Some("items.quote");
                }
                reuses_any(
                    new.items.iter().map(|item| &item.author),
                    old.items.iter().map(|item| &item.author),
                )
                .then_some("items.author")
            }
            (Self::Faq(new), Self::Faq(old)) => reuses_any(
                new.items.iter().map(|item| &item.question),
                old.items.iter().map(|item| &item.question),
            )
            .then_some("items.question"),
            (Self::Contact(new), Self::Contact(old)) => {
                same_text(&new.title, &old.title).then_some("title")
            }
            _ => None,
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, "must not be empty"))
    } else {
        Ok(())
    }
}

fn require_hex(field: &str, value: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_REGEX.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("`{value}` is not a hex color"),
        ))
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn same_text(left: &str, right: &str) -> bool {
    normalize(left) == normalize(right)
}

fn reuses_any<'a>(
    new: impl Iterator<Item = &'a String>,
    old: impl Iterator<Item = &'a String>,
) -> bool {
    let old: HashSet<String> = old.map(|text| normalize(text)).collect();
    new.map(|text| normalize(text))
        .any(|text| old.contains(&text))
}

/// One typed, orderable content block of a page.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSection")]
pub struct Section {
    pub id: String,
    pub order: u32,
    pub content: SectionContent,
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        self.content.kind()
    }

    /// Keeps this section's identity (`id`, `type`, `order`) and takes `content`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `content` is of a different kind.
    pub fn with_content(&self, content: SectionContent) -> Result<Section, ValidationError> {
        if content.kind() != self.kind() {
            return Err(ValidationError::new(
                "type",
                format!(
                    "section {} is a {} section, got {} content",
                    self.id,
                    self.kind(),
                    content.kind()
                ),
            ));
        }

        Ok(Section {
            id: self.id.clone(),
            order: self.order,
            content,
        })
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Section", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("type", &self.kind())?;
        state.serialize_field("order", &self.order)?;
        state.serialize_field("data", &self.content)?;
        state.end()
    }
}

/// Wire shape of a section before its `data` is interpreted by `type`.
#[derive(Debug, Deserialize)]
struct RawSection {
    id: String,
    #[serde(rename = "type")]
    kind: SectionKind,
    order: u32,
    data: Value,
}

impl TryFrom<RawSection> for Section {
    type Error = serde_json::Error;

    fn try_from(raw: RawSection) -> Result<Self, Self::Error> {
        Ok(Section {
            content: SectionContent::from_data(raw.kind, raw.data)?,
            id: raw.id,
            order: raw.order,
        })
    }
}

/// Sorts sections by their explicit `order`, keeping insertion order on ties.
pub fn sort_sections(sections: &mut [Section]) {
    sections.sort_by_key(|section| section.order);
}

/// Checks page-level invariants: non-empty, unique ids and orders, valid payloads.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming the offending section field.
pub fn validate_sections(sections: &[Section]) -> Result<(), ValidationError> {
    if sections.is_empty() {
        return Err(ValidationError::new("sections", "must not be empty"));
    }

    let mut ids = HashSet::new();
    let mut orders = HashSet::new();
    for section in sections {
        if section.id.trim().is_empty() {
            return Err(ValidationError::new("sections.id", "must not be empty"));
        }
        if !ids.insert(section.id.as_str()) {
            return Err(ValidationError::new(
                "sections.id",
                format!("duplicate section id {}", section.id),
            ));
        }
        if !orders.insert(section.order) {
            return Err(ValidationError::new(
                "sections.order",
                format!("duplicate order {} at section {}", section.order, section.id),
            ));
        }
        section
            .content
            .validate()
            .map_err(|e| e.within(&format!("sections.{}", section.id)))?;
    }

    Ok(())
}

fn ordered_sections<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Section>, D::Error> {
    let mut sections = Vec::<Section>::deserialize(deserializer)?;
    sort_sections(&mut sections);
    Ok(sections)
}

/// The generated artifact: a versioned, ordered collection of sections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpecification {
    pub page_id: String,
    pub version: u32,
    #[serde(deserialize_with = "ordered_sections")]
    pub sections: Vec<Section>,
}

impl PageSpecification {
    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == section_id)
    }
}
