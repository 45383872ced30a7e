use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Read;
use std::time::Instant;
use tracing::{info, warn};
use url::Url;

use jobcard::environment::Settings;
use jobcard::logging::configure_cli_logging;
use jobcard::prompt::job_card_prompt;
use jobcard::{generate_job_card, JobCardRequest, OllamaBackend};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Pretty-printed JSON job card
    Json,
    /// Plain-text summary for a notes pad
    Notes,
}

/// Turn a saved page or transcript into a job card using the local model.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Page title
    #[arg(short, long)]
    title: Option<String>,

    /// Page URL
    #[arg(short, long)]
    url: Option<String>,

    /// File with the page text; read from stdin when omitted
    #[arg(short, long)]
    file: Option<String>,

    /// Video link to attach to the generated card
    #[arg(short, long)]
    youtube: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Print the prompt that would be sent and exit
    #[arg(long)]
    prompt_only: bool,

    /// Model to use (overrides OLLAMA_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    configure_cli_logging(args.verbose);

    // Check the link before spending time on the model.
    let youtube = match &args.youtube {
        Some(link) => {
            let parsed = Url::parse(link).with_context(|| format!("Invalid video link: {}", link))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("Video link must be http or https: {}", link);
            }
            Some(link.clone())
        }
        None => None,
    };

    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page text from {}", path))?,
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read page text from stdin")?;
            content
        }
    };

    let request = JobCardRequest {
        title: args.title,
        url: args.url,
        text: Some(text),
    };

    if args.prompt_only {
        println!("{}", job_card_prompt(&request));
        return Ok(());
    }

    let mut settings = Settings::from_env();
    if let Some(model) = args.model {
        settings.model = model;
    }
    let backend = OllamaBackend::new(&settings);

    info!(
        "Generating job card with {} at {}:{}",
        settings.model, settings.ollama_host, settings.ollama_port
    );
    let start_time = Instant::now();
    let response = generate_job_card(&backend, &request).await;
    info!("Finished in {:.2?}", start_time.elapsed());

    if let Some(warning) = &response.warning {
        warn!("{}", warning);
    }

    let card = match youtube {
        Some(link) => response.job_card.with_youtube_link(&link),
        None => response.job_card,
    };

    match args.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&card).context("Failed to serialize job card")?
        ),
        OutputFormat::Notes => println!("{}", card.to_notes()),
    }

    Ok(())
}
