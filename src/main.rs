//! landgen is a CLI tool that generates landing-page specifications from a short
//! business brief and keeps them editable section by section.
//!
//! Pages are stored in a local SQLite database. The main commands are:
//! 1. `generate` - Crawls an optional website and generates a complete page
//! 2. `regenerate-section` - Replaces one section with fresh AI-written content
//! 3. `edit-section`, `reorder`, `publish`, `delete` - Manual page maintenance

use std::fs;
use std::io::Read;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use llm::builder::{LLMBackend, LLMBuilder};
use log::{LevelFilter, info};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use landgen::{
    Brief, CrawlConfig, PageError, PageService, Section, Storage, TextBy,
    constants::{
        DEFAULT_LIST_LIMIT, DEFAULT_MAX_CANDIDATE_LINKS, DEFAULT_MAX_INNER_PAGES,
        MODEL_API_KEY_ENV_NAME,
    },
    crawl::extract_brand_context,
    generate::{GenerationContext, Models, build_models, rate_limiter},
};

/// A CLI tool to generate landing-page specifications from a business brief
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute
    #[command(subcommand)]
    command: Command,

    /// Path to database file to store pages in
    #[arg(long, global = true, default_value = "landgen.db")]
    db: String,

    #[arg(long, short, action = clap::ArgAction::Count, help = "Output v(v...)erbosity: error (0), warn (1), info (2), debug (3), trace (4)", global = true, default_value_t = 2)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Print the brand context extracted from a website
    Crawl {
        /// The website homepage URL
        url: String,
        #[command(flatten)]
        crawl: CrawlArgs,
    },
    #[command(flatten)]
    Page(PageCommand),
}

/// Commands working on the page database
#[derive(Subcommand)]
enum PageCommand {
    /// Generate a new landing page from a brief and store it
    Generate {
        #[command(flatten)]
        brief: BriefArgs,
        /// Owner of the page, used to filter listings
        #[arg(long)]
        user_id: Option<String>,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        crawl: CrawlArgs,
    },
    /// Print a stored page with the brief it was generated from
    Show {
        page_id: String,
    },
    /// List stored pages, most recently updated first
    List {
        /// Only pages of this user
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long, short, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
    },
    /// Replace one section's data with JSON read from a file ("-" for stdin)
    EditSection {
        page_id: String,
        section_id: String,
        data_file: String,
    },
    /// Regenerate one section with new content using the stored brief
    RegenerateSection {
        page_id: String,
        section_id: String,
        /// JSON brief to use instead of the stored one
        #[arg(long)]
        context_file: Option<String>,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        crawl: CrawlArgs,
    },
    /// Store a new section order from a JSON section list ("-" for stdin)
    Reorder {
        page_id: String,
        sections_file: String,
    },
    /// Mark a page as published
    Publish {
        page_id: String,
    },
    /// Delete a page
    Delete {
        page_id: String,
    },
}

#[derive(Args)]
struct BriefArgs {
    /// Industry the business operates in
    #[arg(long)]
    industry: String,
    /// Product or service being offered
    #[arg(long)]
    offer: String,
    /// Who the page should speak to
    #[arg(long)]
    audience: String,
    /// Tone of voice, used when no website is crawled
    #[arg(long, default_value = "professional")]
    tone: String,
    /// Existing website to take brand voice from
    #[arg(long)]
    url: Option<String>,
}

#[derive(Args)]
struct ModelArgs {
    /// Model URL in the form backend://model-name (e.g. openai://gpt-4o)
    #[arg(long, short)]
    model: String,
    /// Timeout of one generation request in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,
    /// Rate limit: requests per minute (default: no limit)
    #[arg(long, short = 'r')]
    rpm: Option<u32>,
}

#[derive(Args)]
struct CrawlArgs {
    /// Inner pages to crawl besides the homepage
    #[arg(long, default_value_t = DEFAULT_MAX_INNER_PAGES)]
    max_inner_pages: usize,
    /// Homepage links considered for crawling
    #[arg(long, default_value_t = DEFAULT_MAX_CANDIDATE_LINKS)]
    max_candidate_links: usize,
    /// Timeout of each page fetch in seconds
    #[arg(long, default_value_t = 10)]
    fetch_timeout: u64,
    /// Text extraction method: "stripped" (default), "readability" or "markdown"
    #[arg(long, default_value = "stripped")]
    text_by: TextBy,
}

impl From<CrawlArgs> for CrawlConfig {
    fn from(args: CrawlArgs) -> Self {
        CrawlConfig {
            max_inner_pages: args.max_inner_pages,
            max_candidate_links: args.max_candidate_links,
            timeout: Duration::from_secs(args.fetch_timeout),
            text_by: args.text_by,
            ..CrawlConfig::default()
        }
    }
}

impl From<BriefArgs> for Brief {
    fn from(args: BriefArgs) -> Self {
        Brief {
            industry: args.industry,
            offer: args.offer,
            target_audience: args.audience,
            brand_tone: args.tone,
            url: args.url,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    match cli.command {
        Command::Crawl { url, crawl } => handle_crawl_command(url, crawl.into()).await,
        Command::Page(command) => handle_page_command(command, &cli.db).await,
    }
}

async fn handle_page_command(command: PageCommand, db: &str) -> Result<()> {
    let storage = Storage::new(db)?;
    let crawl_config = CrawlConfig::default();

    match command {
        PageCommand::Generate {
            brief,
            user_id,
            model,
            crawl,
        } => {
            let crawl = crawl.into();
            let service = PageService::new(&storage, &crawl);
            let models = build_models_from_args(&model)?;
            let limiter = rate_limiter(model.rpm);
            let ctx = generation_context(&models, limiter.as_ref(), &model);
            let page = service
                .generate(&ctx, &brief.into(), user_id.as_deref())
                .await
                .map_err(report)?;
            print_json(&page)
        }
        PageCommand::RegenerateSection {
            page_id,
            section_id,
            context_file,
            model,
            crawl,
        } => {
            let crawl = crawl.into();
            let service = PageService::new(&storage, &crawl);
            let context_override: Option<Brief> = match context_file {
                Some(path) => Some(read_json(&path)?),
                None => None,
            };
            let models = build_models_from_args(&model)?;
            let limiter = rate_limiter(model.rpm);
            let ctx = generation_context(&models, limiter.as_ref(), &model);
            let page = service
                .regenerate_section(&ctx, &page_id, &section_id, context_override.as_ref())
                .await
                .map_err(report)?;
            print_json(&page)
        }
        PageCommand::Show { page_id } => {
            let service = PageService::new(&storage, &crawl_config);
            print_json(&service.get(&page_id).map_err(report)?)
        }
        PageCommand::List { user_id, limit } => {
            let service = PageService::new(&storage, &crawl_config);
            print_json(&service.list(user_id.as_deref(), limit).map_err(report)?)
        }
        PageCommand::EditSection {
            page_id,
            section_id,
            data_file,
        } => {
            let service = PageService::new(&storage, &crawl_config);
            let data: Value = read_json(&data_file)?;
            print_json(
                &service
                    .edit_section(&page_id, &section_id, data)
                    .map_err(report)?,
            )
        }
        PageCommand::Reorder {
            page_id,
            sections_file,
        } => {
            let service = PageService::new(&storage, &crawl_config);
            let sections: Vec<Section> = read_json(&sections_file)?;
            print_json(&service.reorder(&page_id, sections).map_err(report)?)
        }
        PageCommand::Publish { page_id } => {
            let service = PageService::new(&storage, &crawl_config);
            print_json(&service.publish(&page_id).map_err(report)?)
        }
        PageCommand::Delete { page_id } => {
            let service = PageService::new(&storage, &crawl_config);
            service.delete(&page_id).map_err(report)?;
            info!("Page {page_id} deleted");
            Ok(())
        }
    }
}

async fn handle_crawl_command(url: String, config: CrawlConfig) -> Result<()> {
    let url = Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid website url: {}", e))?;
    match extract_brand_context(&url, &config).await {
        Some(context) => println!("{context}"),
        None => info!("No brand context could be extracted from {url}"),
    }
    Ok(())
}

/// Logs the user-facing message before handing the error to anyhow.
fn report(error: PageError) -> anyhow::Error {
    log::error!("{}", error.user_message());
    error.into()
}

fn build_models_from_args(args: &ModelArgs) -> Result<Models> {
    let model_url =
        Url::parse(&args.model).map_err(|e| anyhow::anyhow!("Invalid model URL: {}", e))?;
    let backend = LLMBackend::from_str(model_url.scheme())
        .map_err(|e| anyhow::anyhow!("Invalid LLM backend: {}", e))?;
    let model_name = [
        model_url
            .host_str()
            .context("Specify model name as host URL.")?,
        model_url.username(),
    ]
    .iter()
    .filter(|x| !x.is_empty())
    .cloned()
    .collect::<Vec<_>>()
    .join(":");

    let api_key = match std::env::var(MODEL_API_KEY_ENV_NAME) {
        Ok(model_key) => Some(model_key),
        Err(err) => {
            info!("{err} while providing api key");
            None
        }
    };

    build_models(|| {
        let builder = LLMBuilder::new()
            .backend(backend.clone())
            .model(model_name.clone())
            .timeout_seconds(args.timeout);
        match &api_key {
            Some(key) => builder.api_key(key.clone()),
            None => builder,
        }
    })
}

fn generation_context<'a>(
    models: &'a Models,
    limiter: Option<&'a rate_guard::StdTokenBucket>,
    args: &ModelArgs,
) -> GenerationContext<'a> {
    GenerationContext {
        page_model: models.page.as_ref(),
        section_model: models.section.as_ref(),
        rate_limiter: limiter,
        timeout: Duration::from_secs(args.timeout),
    }
}

/// Reads JSON from `path`, or from stdin when `path` is "-".
fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        buffer
    } else {
        fs::read_to_string(path).context(format!("Failed to read file: {path}"))?
    };

    serde_json::from_str(&content).context(format!("Invalid JSON in {path}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectral::prelude::*;

    #[test]
    fn crawl_and_page_commands_share_one_command_line() {
        let crawl = Cli::try_parse_from(["landgen", "crawl", "https://crumb.example/"])
            .expect("crawl parses");
        let show = Cli::try_parse_from(["landgen", "--db", "pages.db", "show", "landing-1a2b3c4d"])
            .expect("show parses");

        assert_that(&matches!(crawl.command, Command::Crawl { ref url, .. } if url == "https://crumb.example/"))
            .is_true();
        assert_that(&matches!(show.command, Command::Page(PageCommand::Show { ref page_id }) if page_id == "landing-1a2b3c4d"))
            .is_true();
        assert_that(&show.db.as_str()).is_equal_to("pages.db");
    }
}
