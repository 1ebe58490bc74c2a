use anyhow::Context;
use clap::{Parser, Subcommand};

use briefly::ai::Language;
use briefly::app::{App, SummarizeRequest, SummaryOutcome};
use briefly::config::Config;
use briefly::models::{Provider, SummaryRecord};

#[derive(Debug, Parser)]
#[command(
    name = "briefly",
    version,
    about = "Summarize web pages and keep the summaries cached"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the cached summary for a page
    Show {
        url: String,
        /// Page title, used when the URL alone does not match
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Summarize a page, reusing a cached summary of the same page when possible
    Summarize {
        url: String,
        /// Extra instruction for the model (always generates a new summary)
        #[arg(long, default_value = "")]
        hint: String,
        /// deepseek or qwen
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// zh or en
        #[arg(long)]
        language: Option<String>,
        /// Ignore the cache
        #[arg(long)]
        fresh: bool,
    },
    /// List the most recent summaries of a page
    History { url: String },
}

#[tokio::main]
async fn main() {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when there was nothing to show.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = Config::load().context("failed to load config")?;
    let app = App::new(&config)
        .await
        .with_context(|| format!("failed to open summary cache at {}", config.db_path))?;

    match cli.command {
        Command::Show { url, title } => match app.cached(&url, &title).await? {
            Some(hit) => {
                if !hit.step.is_same_page() {
                    eprintln!(
                        "No summary for this page; \
                         showing the most recent summary of another page."
                    );
                }
                print_record(&hit.record, Some(hit.step.as_str()));
                Ok(true)
            }
            None => {
                eprintln!("No cached summary for {}", url);
                Ok(false)
            }
        },

        Command::Summarize {
            url,
            hint,
            provider,
            model,
            language,
            fresh,
        } => {
            let request = SummarizeRequest {
                url,
                user_hint: hint,
                provider: provider.as_deref().map(str::parse::<Provider>).transpose()?,
                model,
                api_key: None,
                language: language.as_deref().map(Language::parse),
                fresh,
            };

            let outcome = app
                .summarize(&request)
                .await
                .with_context(|| format!("failed to summarize {}", request.url))?;
            match outcome {
                SummaryOutcome::Cached(hit) => {
                    print_record(&hit.record, Some(hit.step.as_str()))
                }
                SummaryOutcome::Generated(record) => print_record(&record, None),
            }
            Ok(true)
        }

        Command::History { url } => {
            let entries = app.page_history(&url).await?;
            if entries.is_empty() {
                eprintln!("No history for {}", url);
                return Ok(false);
            }
            for (idx, record) in entries.iter().enumerate() {
                println!("#{} ------------------------------------------------", idx + 1);
                print_record(record, None);
                println!();
            }
            Ok(true)
        }
    }
}

fn print_record(record: &SummaryRecord, matched_by: Option<&str>) {
    let when = record
        .updated_at_utc()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown time".to_string());

    let mut meta = format!("{} | {}/{} | {}", record.url, record.provider, record.model, when);
    if !record.user_hint.is_empty() {
        meta.push_str(&format!(" | hint: {}", record.user_hint));
    }
    if let Some(step) = matched_by {
        meta.push_str(&format!(" | cached ({})", step));
    }

    eprintln!("{}", meta);
    println!("{}", record.markdown);
}
