use std::time::Duration;

pub const MODEL_API_KEY_ENV_NAME: &str = "LANDGEN_MODEL_API_KEY";

pub const USER_AGENT: &str = "LandGen Bot (+https://github.com/landgen/landgen)";

/// Per-request timeout for homepage and inner-page fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_MAX_INNER_PAGES: usize = 2;
pub const DEFAULT_MAX_CANDIDATE_LINKS: usize = 5;

/// Cap on the cleaned body text kept per crawled page.
pub const PAGE_TEXT_LIMIT: usize = 3000;
/// Tighter cap applied to each page's text when folding the brand context.
pub const CONTEXT_PREVIEW_LIMIT: usize = 800;
pub const CONTEXT_HEADINGS_LIMIT: usize = 3;

pub const STRIPPED_ELEMENTS: [&str; 8] = [
    "script", "style", "nav", "footer", "header", "aside", "iframe", "noscript",
];

pub const SKIPPED_LINK_PREFIXES: [&str; 4] = ["#", "mailto:", "tel:", "javascript:"];

pub const GENERATION_TEMPERATURE: f32 = 0.7;
pub const PAGE_MAX_TOKENS: u32 = 2500;
pub const SECTION_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

pub const PAGE_ID_PREFIX: &str = "landing-";
pub const DEFAULT_LIST_LIMIT: u32 = 50;

pub(crate) const SYSTEM_PERSONA: &str = "You are an expert landing page designer and conversion copywriter. \
You create compelling marketing copy that drives action, matches brand voice, \
and resonates with target audiences. You have deep knowledge of persuasive writing, \
user psychology, and marketing best practices. \
You always return your work as valid JSON with no markdown formatting.";

pub(crate) const BRAND_CONTEXT_HEADING: &str = "## BRAND CONTEXT (Crawled from Website)";

pub(crate) const BRAND_CONTEXT_INSTRUCTIONS: &str = r#"
CRITICAL: Use the above brand context as your PRIMARY reference for:
- Tone of voice and writing style
- Language patterns and vocabulary
- Brand personality and messaging approach
- Visual aesthetic (colors, imagery style)
- Value propositions and positioning

The brand context outweighs the Brand Tone listed in the requirements whenever the two disagree.
The generated landing page should feel like a natural extension of the existing brand website.
Match the sophistication level, formality, and emotional tone you observe in the crawled content.
"#;

pub(crate) const CONTENT_GUIDELINES: &str = r#"## CONTENT GUIDELINES

**When a crawled website summary is included above:**
1. **Tone Matching**: Analyze the writing style, vocabulary, and sentence structure of the website. Mirror this style precisely.
2. **Voice Consistency**: If the brand is casual and conversational, be casual. If formal and authoritative, match that.
3. **Vocabulary**: Use similar terminology, industry jargon, and word choices as seen on the website.
4. **Messaging Alignment**: Echo the value propositions and benefits mentioned on the website.
5. **Visual Alignment**: If the website suggests colors or aesthetic preferences, respect those.

**General Guidelines:**
- Headlines should be compelling and benefit-driven (5-8 words)
- Subheadlines should expand on the value proposition (1-2 sentences)
- Features should focus on benefits, not just features
- Testimonials should feel authentic and specific
- FAQs should address real objections and concerns
- CTAs should be action-oriented and clear"#;

pub(crate) const RAW_JSON_ONLY: &str =
    "Return ONLY valid JSON. No markdown code blocks (```json), no explanatory text, just raw JSON.";

/// Output schema for a full page. `{page_id}` and `{company}` are substituted at compose time.
pub(crate) const PAGE_SCHEMA_TEMPLATE: &str = r##"{
  "pageId": "{page_id}",
  "version": 1,
  "sections": [
    {
      "id": "hero-1",
      "type": "hero",
      "order": 0,
      "data": {
        "headline": "string - powerful main headline (5-8 words, benefit-focused)",
        "subheadline": "string - supporting headline that expands the value prop (1-2 sentences)",
        "ctaText": "string - action button text (3-5 words, e.g., 'Start Free Trial', 'Get Started Now')",
        "backgroundImage": "https://images.unsplash.com/photo-... - relevant unsplash image URL",
        "textColor": "#FFFFFF",
        "backgroundColor": "#1a1a1a"
      }
    },
    {
      "id": "features-1",
      "type": "features",
      "order": 1,
      "data": {
        "title": "string - section headline",
        "description": "string - optional section description (1-2 sentences)",
        "items": [
          {
            "id": "f1",
            "title": "string - feature name (2-4 words)",
            "description": "string - benefit-focused description (1 sentence, focus on what the customer gains)",
            "icon": "emoji - single relevant emoji"
          },
          { "id": "f2", "title": "string", "description": "string", "icon": "emoji" },
          { "id": "f3", "title": "string", "description": "string", "icon": "emoji" }
        ]
      }
    },
    {
      "id": "testimonials-1",
      "type": "testimonials",
      "order": 2,
      "data": {
        "title": "string - section title (e.g., 'What Our Customers Say', 'Trusted By Thousands')",
        "items": [
          {
            "id": "t1",
            "quote": "string - authentic testimonial (1-2 sentences, focus on specific results or benefits)",
            "author": "string - realistic first and last name",
            "role": "string - job title",
            "company": "string - company name (can be real or realistic-sounding)",
            "rating": 5
          },
          { "id": "t2", "quote": "string", "author": "string", "role": "string", "company": "string", "rating": 5 }
        ]
      }
    },
    {
      "id": "faq-1",
      "type": "faq",
      "order": 3,
      "data": {
        "title": "Frequently Asked Questions",
        "items": [
          {
            "id": "q1",
            "question": "string - common objection or question (conversational style)",
            "answer": "string - clear, concise answer (1-2 sentences)"
          },
          { "id": "q2", "question": "string", "answer": "string" },
          { "id": "q3", "question": "string", "answer": "string" }
        ]
      }
    },
    {
      "id": "contact-1",
      "type": "contact",
      "order": 4,
      "data": {
        "title": "string - compelling CTA headline (e.g., 'Ready to Transform Your Business?')",
        "description": "string - supporting text that creates urgency or reinforces value (1-2 sentences)",
        "fields": [
          {"name": "email", "label": "Email Address", "type": "email", "required": true},
          {"name": "company", "label": "Company Name", "type": "text", "required": false},
          {"name": "message", "label": "How can we help?", "type": "textarea", "required": true}
        ],
        "submitText": "string - button text (e.g., 'Get Started', 'Request Demo')",
        "backgroundColor": "#f9fafb"
      }
    },
    {
      "id": "footer-1",
      "type": "footer",
      "order": 5,
      "data": {
        "links": [
          {"label": "Privacy Policy", "url": "/privacy"},
          {"label": "Terms of Service", "url": "/terms"},
          {"label": "Contact", "url": "/contact"}
        ],
        "socialLinks": [
          {"platform": "Twitter", "url": "https://twitter.com"},
          {"platform": "LinkedIn", "url": "https://linkedin.com"}
        ],
        "copyright": "© <current year> {company}. All rights reserved."
      }
    }
  ]
}"##;

pub(crate) const REGENERATION_KEY_RULES: &str = r#"KEY RULES:
1. Create completely NEW content (different headlines, copy, etc.) - NOT a slight variation
2. Keep the same JSON structure and field names
3. Maintain the brand tone and industry context
4. Keep appealing to the target audience
5. Don't use the exact same words/phrases as the current version
6. All data should be realistic and specific to the industry"#;

pub(crate) const HERO_RULES: &str = r#"For HERO section, regenerate with:
- NEW headline (5-8 words, powerful, unique angle)
- NEW subheadline (1-2 sentences, different messaging)
- Same CTA button text OR new CTA if makes sense
- NEW background image URL from Unsplash that fits the new angle
- Keep same text and background colors"#;

pub(crate) const FEATURES_RULES: &str = r#"For FEATURES section, regenerate with:
- NEW section title and description
- 3 NEW features (different benefits/angles from current)
- Keep emoji icons
- Different wording, same structure
- Focus on different value propositions"#;

pub(crate) const TESTIMONIALS_RULES: &str = r#"For TESTIMONIALS section, regenerate with:
- NEW section title
- 2 NEW testimonials (different quotes, different personas)
- NEW customer names, roles, companies
- Keep 5-star ratings
- Different benefits highlighted vs current version"#;

pub(crate) const FAQ_RULES: &str = r#"For FAQ section, regenerate with:
- NEW section title (if different angle needed)
- 3 NEW FAQ questions and answers
- Different common questions than current
- 1-2 sentence answers
- Address different concerns/use cases"#;

pub(crate) const CONTACT_RULES: &str = r#"For CONTACT section, regenerate with:
- NEW CTA headline
- NEW description copy
- Keep same form fields (email, company, message)
- NEW submit button text if appropriate
- Keep background color"#;

pub(crate) const FOOTER_RULES: &str = r#"For FOOTER section, regenerate with:
- Same link structure and URLs
- Same social links
- NEW copyright notice or company tagline if applicable"#;
