//! The parse module extracts brand signals from a single HTML page: title,
//! description, headings, cleaned body text and same-site links.

use dom_smoothie::{CandidateSelectMode, Config, Readability, TextMode};
use html2md;
use log::{debug, warn};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector as ScraperSelector};
use url::Url;

use crate::TextBy;
use crate::constants::{PAGE_TEXT_LIMIT, SKIPPED_LINK_PREFIXES, STRIPPED_ELEMENTS};

static TITLE_SELECTOR: Lazy<ScraperSelector> =
    Lazy::new(|| ScraperSelector::parse("title").expect("Failed to parse title selector"));
static META_SELECTOR: Lazy<ScraperSelector> =
    Lazy::new(|| ScraperSelector::parse("meta").expect("Failed to parse meta selector"));
static BODY_SELECTOR: Lazy<ScraperSelector> =
    Lazy::new(|| ScraperSelector::parse("body").expect("Failed to parse body selector"));
static ANCHOR_SELECTOR: Lazy<ScraperSelector> =
    Lazy::new(|| ScraperSelector::parse("a[href]").expect("Failed to parse anchor selector"));
static HEADING_SELECTORS: Lazy<[ScraperSelector; 3]> = Lazy::new(|| {
    ["h1", "h2", "h3"]
        .map(|tag| ScraperSelector::parse(tag).expect("Failed to parse heading selector"))
});

/// Heading texts of one page, grouped by level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headings {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
}

/// Signals extracted from one crawled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub url: Url,
    pub title: Option<String>,
    pub description: Option<String>,
    pub headings: Headings,
    /// Cleaned body text, capped at [`PAGE_TEXT_LIMIT`] characters.
    pub text: String,
}

impl PageRecord {
    /// Parses `html` fetched from `url` into a page record.
    ///
    /// Title, description and headings come from the whole page. The body text
    /// is taken after page chrome is removed, whatever `text_by` is.
    pub fn from_html(url: Url, html: &str, text_by: &TextBy) -> Self {
        let document = Html::parse_document(html);
        let content = without_page_chrome(&document);

        let text = match text_by {
            TextBy::Stripped => body_text(&content),
            TextBy::Readability => {
                readable_text(&content.html()).unwrap_or_else(|| body_text(&content))
            }
            TextBy::Markdown => html2md::parse_html(&content.html(), false),
        };

        PageRecord {
            title: parse_title(&document),
            description: parse_description(&document),
            headings: parse_headings(&document),
            text: truncate_chars(&collapse_whitespace(&text), PAGE_TEXT_LIMIT).to_owned(),
            url,
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn parse_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(element_text)
        .filter(|title| !title.is_empty())
}

/// Reads `<meta name="description">`, falling back to `og:description`.
fn parse_description(document: &Html) -> Option<String> {
    let meta_content = |attribute: &str, expected: &str| {
        document
            .select(&META_SELECTOR)
            .filter(|meta| {
                meta.value()
                    .attr(attribute)
                    .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected))
            })
            .filter_map(|meta| meta.value().attr("content"))
            .map(|content| content.trim().to_owned())
            .find(|content| !content.is_empty())
    };

    meta_content("name", "description").or_else(|| meta_content("property", "og:description"))
}

fn parse_headings(document: &Html) -> Headings {
    let [h1, h2, h3] = HEADING_SELECTORS.each_ref().map(|selector| {
        document
            .select(selector)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
    });

    Headings { h1, h2, h3 }
}

/// Copy of `document` with script, style and page-chrome elements detached.
fn without_page_chrome(document: &Html) -> Html {
    let mut content = document.clone();
    let chrome: Vec<_> = content
        .root_element()
        .descendants()
        .filter(|node| {
            node.value()
                .as_element()
                .is_some_and(|element| STRIPPED_ELEMENTS.contains(&element.name()))
        })
        .map(|node| node.id())
        .collect();

    for id in chrome {
        if let Some(mut node) = content.tree.get_mut(id) {
            node.detach();
        }
    }
    content
}

fn body_text(content: &Html) -> String {
    content
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| content.root_element())
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}

fn readable_text(html: &str) -> Option<String> {
    let config = Config {
        text_mode: TextMode::Markdown,
        candidate_select_mode: CandidateSelectMode::DomSmoothie,
        ..Default::default()
    };

    let article = Readability::new(html, None, Some(config)).and_then(|mut readability| readability.parse());
    match article {
        Ok(article) => Some(article.text_content.to_string()),
        Err(error) => {
            warn!("Readability extraction failed, using stripped text: {error}");
            None
        }
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `text` to at most `limit` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => text.get(..index).unwrap_or(text),
        None => text,
    }
}

/// Collects same-host links from the content of `html`, in document order.
///
/// Links inside page chrome (navigation, header, footer, sidebars) are ignored.
/// Links are resolved against `root`, stripped of query and fragment,
/// deduplicated, and never include `root` itself. At most `limit` are returned.
pub fn extract_internal_links(root: &Url, html: &str, limit: usize) -> Vec<Url> {
    let document = without_page_chrome(&Html::parse_document(html));
    let mut root_page = root.clone();
    root_page.set_query(None);
    root_page.set_fragment(None);
    let root_key = root_page.as_str().trim_end_matches('/').to_owned();

    let mut links: Vec<Url> = Vec::new();
    for href in document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
    {
        if links.len() >= limit {
            break;
        }

        let lowered = href.to_ascii_lowercase();
        if href.is_empty()
            || SKIPPED_LINK_PREFIXES
                .iter()
                .any(|prefix| lowered.starts_with(prefix))
        {
            continue;
        }

        let mut link = match root.join(href) {
            Ok(link) => link,
            Err(error) => {
                debug!("Ignoring unresolvable link {href}: {error}");
                continue;
            }
        };

        if !matches!(link.scheme(), "http" | "https")
            || link.host_str() != root.host_str()
            || link.port_or_known_default() != root.port_or_known_default()
        {
            continue;
        }

        link.set_query(None);
        link.set_fragment(None);
        if link.as_str().trim_end_matches('/') == root_key || links.contains(&link) {
            continue;
        }

        links.push(link);
    }

    debug!("Found {} internal links on {root}", links.len());
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectral::prelude::*;

    const HOMEPAGE: &str = r##"<!doctype html>
<html>
<head>
  <title>  Crumb &amp; Co.  Bakery </title>
  <meta property="og:description" content="OG fallback">
  <meta name="Description" content=" Cakes for every celebration. ">
  <style>.hero { color: red; }</style>
</head>
<body>
  <header><a href="/">Home</a></header>
  <nav><a href="/menu">Menu</a> <a href="/about#team">About</a></nav>
  <h1>Celebration cakes</h1>
  <h1>  Made   by hand </h1>
  <h2>Our story</h2>
  <h3>Weddings</h3>
  <p>We bake   every cake
     to order.</p>
  <script>var tracking = "ignore me";</script>
  <a href="/about?ref=home">About us</a>
  <a href="https://example.com/contact">Contact</a>
  <a href="https://other.example.org/">Elsewhere</a>
  <a href="mailto:hello@example.com">Mail</a>
  <a href="tel:+123">Call</a>
  <a href="JavaScript:void(0)">Nothing</a>
  <a href="#top">Top</a>
  <aside>Sidebar promo</aside>
  <footer>Copyright footer</footer>
</body>
</html>"##;

    fn root() -> Url {
        Url::parse("https://example.com/").expect("valid url")
    }

    #[test]
    fn extracts_title_description_and_headings() {
        let record = PageRecord::from_html(root(), HOMEPAGE, &TextBy::Stripped);

        assert_that(&record.title).is_equal_to(Some("Crumb & Co. Bakery".to_owned()));
        assert_that(&record.description).is_equal_to(Some("Cakes for every celebration.".to_owned()));
        assert_that(&record.headings.h1)
            .is_equal_to(vec!["Celebration cakes".to_owned(), "Made by hand".to_owned()]);
        assert_that(&record.headings.h2).is_equal_to(vec!["Our story".to_owned()]);
        assert_that(&record.headings.h3).is_equal_to(vec!["Weddings".to_owned()]);
    }

    #[test]
    fn falls_back_to_open_graph_description() {
        let html = r#"<html><head><meta property="og:description" content="From OG"></head><body></body></html>"#;
        let record = PageRecord::from_html(root(), html, &TextBy::Stripped);

        assert_that(&record.description).is_equal_to(Some("From OG".to_owned()));
        assert_that(&record.title).is_none();
    }

    #[test]
    fn stripped_text_drops_page_chrome_and_scripts() {
        let record = PageRecord::from_html(root(), HOMEPAGE, &TextBy::Stripped);

        assert_that(&record.text.contains("We bake every cake to order.")).is_true();
        for hidden in ["ignore me", "Sidebar promo", "Copyright footer", "Menu", "Home"] {
            assert_that(&record.text.contains(hidden)).is_false();
        }
    }

    #[test]
    fn body_text_is_capped() {
        let html = format!("<html><body><p>{}</p></body></html>", "é".repeat(PAGE_TEXT_LIMIT + 50));
        let record = PageRecord::from_html(root(), &html, &TextBy::Stripped);

        assert_that(&record.text.chars().count()).is_equal_to(PAGE_TEXT_LIMIT);
    }

    #[test]
    fn internal_links_keep_same_host_in_document_order() {
        let links = extract_internal_links(&root(), HOMEPAGE, 5);
        let links: Vec<&str> = links.iter().map(Url::as_str).collect();

        assert_that(&links).is_equal_to(vec![
            "https://example.com/about",
            "https://example.com/contact",
        ]);
    }

    #[test]
    fn links_in_page_chrome_are_not_candidates() {
        let html = r#"<html><body>
  <header><a href="/login">Log in</a></header>
  <nav><a href="/cart">Cart</a> <a href="/account">Account</a></nav>
  <main><a href="/about">About</a> <a href="/services">Services</a></main>
  <footer><a href="/privacy">Privacy</a></footer>
</body></html>"#;

        let links = extract_internal_links(&root(), html, 2);
        let paths: Vec<&str> = links.iter().map(Url::path).collect();

        assert_that(&paths).is_equal_to(vec!["/about", "/services"]);
    }

    #[test]
    fn markdown_text_drops_page_chrome() {
        let record = PageRecord::from_html(root(), HOMEPAGE, &TextBy::Markdown);

        assert_that(&record.text.contains("We bake every cake to order.")).is_true();
        for hidden in ["ignore me", "Sidebar promo", "Copyright footer", "Menu"] {
            assert_that(&record.text.contains(hidden)).is_false();
        }
    }

    #[test]
    fn internal_links_respect_limit() {
        let links = extract_internal_links(&root(), HOMEPAGE, 2);

        assert_that(&links).has_length(2);
    }

    #[test]
    fn page_without_links_yields_none() {
        let links = extract_internal_links(&root(), "<html><body><p>Just text</p></body></html>", 5);

        assert_that(&links).is_empty();
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_that(&truncate_chars("héllo", 2)).is_equal_to("hé");
        assert_that(&truncate_chars("hi", 10)).is_equal_to("hi");
    }
}
