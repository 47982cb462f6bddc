use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use job_intake::config::AppConfig;
use job_intake::job_acquisition::ExtractionOutcome;
use job_intake::{start_web_server, Services};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

#[derive(Parser)]
#[command(name = "cvenom-jobs", version, about = "Job posting intake service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve,
    /// Extract one job posting and print the outcome as JSON
    Fetch {
        /// Job posting URL
        url: String,
    },
    /// Run OCR on a screenshot and print the recognized text
    Ocr {
        /// Path to a PNG/JPEG screenshot
        image: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("job_intake=info,rocket=warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        Registry::default()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Serve => start_web_server(config).await,
        Commands::Fetch { url } => {
            let services = Services::from_config(&config)?;
            let outcome = services.orchestrator.acquire_job_text(&url).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if let ExtractionOutcome::Success { text, .. } = &outcome {
                info!("Extracted {} characters", text.chars().count());
            }
            Ok(())
        }
        Commands::Ocr { image } => {
            let services = Services::from_config(&config)?;
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let text = services.ocr.extract_text_from_image(&bytes).await?;
            println!("{}", text);
            Ok(())
        }
    }
}
