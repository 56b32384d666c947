use std::time::Duration;

use clap::Parser;
use govease::markdown::render_result;
use govease::pipeline::{self, DefaultPipeline};
use govease::{Config, Language, PipelineRequest};
use tracing::info;

/// Ask how to get something done with a government office.
#[derive(Debug, Parser)]
#[command(name = "govease", version, about)]
struct Cli {
    /// The question, e.g. "renew passport".
    #[arg(required = true, value_parser = non_blank)]
    query: Vec<String>,

    /// Country whose procedures apply.
    #[arg(short, long, value_parser = non_blank)]
    country: String,

    /// Answer language, by name or ISO code (e.g. "Urdu", "es").
    #[arg(short, long, default_value = "English")]
    language: Language,

    /// Number of search results to fetch.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    fan_out: Option<u64>,

    /// Concurrent fetches.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    workers: Option<u64>,

    /// Wall-clock budget for the fetch phase, in seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    budget_secs: Option<u64>,

    /// Print the result as JSON instead of Markdown.
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Overrides the environment's tunables with any flags given.
    fn apply(&self, config: &mut Config) {
        if let Some(width) = self.fan_out {
            config.tuning.fan_out_width = width as usize;
        }
        if let Some(workers) = self.workers {
            config.tuning.fetch_workers = workers as usize;
        }
        if let Some(secs) = self.budget_secs {
            config.tuning.overall_fetch_budget = Duration::from_secs(secs);
        }
    }
}

fn non_blank(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("must not be blank".to_string());
    }
    Ok(trimmed.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("govease=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    info!(tuning = ?config.tuning, "configuration loaded");

    let pipeline = DefaultPipeline::from_config(&config, pipeline::http_client()?);
    let request = PipelineRequest {
        query: cli.query.join(" "),
        country: cli.country,
        target_language: cli.language,
    };

    let result = pipeline.process_query(&request).await;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_result(&request, &result));
    }
    Ok(())
}
