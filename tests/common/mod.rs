#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use llm::{
    chat::{ChatMessage, ChatProvider, ChatResponse, Tool},
    error::LLMError,
};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use landgen::Brief;

/// Asserts that each provider answer makes full-page generation fail as malformed.
#[macro_export]
macro_rules! assert_malformed_pages {
    (
        $(
            $test_name:ident : response => $response:expr
        ),+ $(,)?
    ) => {
        $(
            #[tokio::test]
            async fn $test_name() {
                let model = StubLlmProvider::replying([$response]);
                let context = landgen::GenerationContext::new(&model);
                let error = landgen::generate_full_spec(&context, &common::bakery(), None)
                    .await
                    .expect_err("Expected malformed output to be rejected.");

                assert_that(&error.is_malformed()).is_true();
                assert_that(&error.is_provider_failure()).is_false();
            }
        )+
    }
}

/// One scripted provider answer.
pub enum Reply {
    Text(String),
    Fail(String),
    /// Never answers within any reasonable timeout.
    Stall,
}

/// Chat provider answering from a script and recording every prompt it receives.
pub struct StubLlmProvider {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl StubLlmProvider {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        StubLlmProvider {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::new(texts.into_iter().map(|text| Reply::Text(text.into())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("prompts lock").len()
    }
}

impl ChatProvider for StubLlmProvider {
    fn chat<'life0, 'life1, 'async_trait>(
        &'life0 self,
        messages: &'life1 [ChatMessage],
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Box<dyn ChatResponse>, LLMError>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let prompt = messages
            .iter()
            .map(|message| message.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().expect("prompts lock").push(prompt);
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Reply::Fail("no scripted reply left".to_owned()));

        Box::pin(async move {
            #[derive(Debug)]
            struct StringResponse(String);

            impl ChatResponse for StringResponse {
                fn text(&self) -> Option<String> {
                    Some(self.0.clone())
                }

                fn tool_calls(&self) -> Option<Vec<llm::ToolCall>> {
                    None
                }

                fn thinking(&self) -> Option<String> {
                    None
                }

                fn usage(&self) -> Option<llm::chat::Usage> {
                    None
                }
            }

            impl std::fmt::Display for StringResponse {
                fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(formatter, "{}", self.0)
                }
            }

            match reply {
                Reply::Text(text) => Ok(Box::new(StringResponse(text)) as Box<dyn ChatResponse>),
                Reply::Fail(message) => Err(LLMError::ProviderError(message)),
                Reply::Stall => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(LLMError::ProviderError("stalled".to_owned()))
                }
            }
        })
    }

    fn chat_with_tools<'life0, 'life1, 'life2, 'async_trait>(
        &'life0 self,
        messages: &'life1 [ChatMessage],
        _tools: Option<&'life2 [Tool]>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Box<dyn ChatResponse>, LLMError>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        'life2: 'async_trait,
        Self: 'async_trait,
    {
        self.chat(messages)
    }
}

pub fn bakery() -> Brief {
    Brief {
        industry: "bakery".to_owned(),
        offer: "custom cakes".to_owned(),
        target_audience: "event planners".to_owned(),
        brand_tone: "warm".to_owned(),
        url: None,
    }
}

pub fn hero_data(headline: &str) -> Value {
    json!({
        "headline": headline,
        "subheadline": "Hand-finished cakes delivered to any venue.",
        "ctaText": "Order a Tasting",
        "backgroundImage": "https://images.unsplash.com/photo-1578985545062",
        "textColor": "#FFFFFF",
        "backgroundColor": "#1a1a1a"
    })
}

pub fn faq_data(questions: [&str; 3]) -> Value {
    let items: Vec<Value> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            json!({"id": format!("q{}", index + 1), "question": question, "answer": "It depends on the date."})
        })
        .collect();
    json!({"title": "Frequently Asked Questions", "items": items})
}

/// A complete six-section page in the shape the generation prompt asks for.
pub fn page_json(headline: &str) -> Value {
    json!({
        "pageId": "landing-model01",
        "version": 1,
        "sections": [
            {"id": "hero-1", "type": "hero", "order": 0, "data": hero_data(headline)},
            {"id": "features-1", "type": "features", "order": 1, "data": {
                "title": "Why planners choose us",
                "items": [
                    {"id": "f1", "title": "On-time delivery", "description": "Every cake arrives set up.", "icon": "🚚"},
                    {"id": "f2", "title": "Tastings", "description": "Try before you commit.", "icon": "🍰"},
                    {"id": "f3", "title": "Any size", "description": "From 10 to 500 guests.", "icon": "🎂"}
                ]
            }},
            {"id": "testimonials-1", "type": "testimonials", "order": 2, "data": {
                "title": "What our clients say",
                "items": [
                    {"id": "t1", "quote": "The centrepiece of the gala.", "author": "Dana Reyes", "role": "Event Lead", "company": "Harbor Events", "rating": 5},
                    {"id": "t2", "quote": "Guests still talk about it.", "author": "Sam Okafor", "role": "Planner", "company": "Okafor & Co", "rating": 5}
                ]
            }},
            {"id": "faq-1", "type": "faq", "order": 3, "data": faq_data([
                "How far ahead should I order?",
                "Do you deliver?",
                "Can you do vegan?"
            ])},
            {"id": "contact-1", "type": "contact", "order": 4, "data": {
                "title": "Plan your cake",
                "description": "Tell us about your event.",
                "fields": [
                    {"name": "name", "label": "Full Name", "type": "text", "required": true},
                    {"name": "email", "label": "Email Address", "type": "email", "required": true},
                    {"name": "message", "label": "Message", "type": "textarea", "required": false}
                ],
                "submitText": "Request a Quote",
                "backgroundColor": "#f8f9fa"
            }},
            {"id": "footer-1", "type": "footer", "order": 5, "data": {
                "links": [{"label": "Privacy Policy", "url": "/privacy"}],
                "socialLinks": [{"platform": "instagram", "url": "https://instagram.com/crumb"}],
                "copyright": "© 2026 custom cakes. All rights reserved."
            }}
        ]
    })
}

/// Answer to a section regeneration prompt.
pub fn section_reply(id: &str, kind: &str, order: u32, data: Value) -> String {
    json!({"id": id, "type": kind, "order": order, "data": data}).to_string()
}

/// How the fixture site answers one path.
#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl Route {
    pub fn ok(body: impl Into<String>) -> Self {
        Route {
            status: 200,
            body: body.into(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Route {
            status,
            body: String::new(),
            delay: None,
        }
    }

    pub fn slow(body: impl Into<String>, delay: Duration) -> Self {
        Route {
            delay: Some(delay),
            ..Route::ok(body)
        }
    }
}

/// Minimal HTTP/1.1 site on a local port serving fixed routes.
///
/// Paths without a route answer 404. Every requested path is recorded.
pub struct SiteFixture {
    pub root: Url,
    requests: Arc<Mutex<Vec<String>>>,
}

impl SiteFixture {
    pub async fn start(routes: impl IntoIterator<Item = (&'static str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture site");
        let address = listener.local_addr().expect("fixture address");
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_owned(), route))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buffer = [0_u8; 1024];
                    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                        match stream.read(&mut buffer).await {
                            Ok(0) | Err(_) => return,
                            Ok(read) => request.extend_from_slice(&buffer[..read]),
                        }
                    }

                    let request = String::from_utf8_lossy(&request);
                    let path = request
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or("/")
                        .to_owned();
                    recorded.lock().expect("requests lock").push(path.clone());

                    let route = routes.get(&path).cloned().unwrap_or(Route::status(404));
                    if let Some(delay) = route.delay {
                        tokio::time::sleep(delay).await;
                    }

                    let response = format!(
                        "HTTP/1.1 {} Fixture\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        route.status,
                        route.body.len(),
                        route.body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        SiteFixture {
            root: Url::parse(&format!("http://{address}/")).expect("fixture url"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }
}

/// An HTML page with a title, one heading, some text and the given content links.
///
/// The navigation always carries a `/login` link.
pub fn html_page(title: &str, heading: &str, text: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{href}\">{href}</a>"))
        .collect();
    format!(
        "<html><head><title>{title}</title><meta name=\"description\" content=\"{title} description\"></head>\
<body><nav><a href=\"/login\">Log in</a></nav><h1>{heading}</h1><p>{text}</p><main>{anchors}</main><script>var tracking = 1;</script></body></html>"
    )
}
