use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use mediaget::config::Config;
use mediaget::extractors::{builtin_ids, ExtractorEvent, ExtractorRegistry, Outcome};

/// Extract media information from one or more URLs and print JSON.
#[derive(Parser, Debug)]
#[command(name = "mediaget")]
#[command(about = "Find the media behind a URL", long_about = None)]
struct Args {
    /// Page or media URL(s) to extract.
    #[arg(required = true)]
    urls: Vec<String>,

    /// Only report which extractor would handle each URL.
    #[arg(long, default_value_t = false)]
    check: bool,

    /// Output compact JSON instead of pretty.
    #[arg(long, default_value_t = false)]
    compact: bool,
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns whether every URL succeeded.
async fn run() -> Result<bool> {
    let args = Args::parse();

    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate(&builtin_ids())
        .context("Invalid configuration")?;

    let registry = ExtractorRegistry::from_config(config).context("Failed to build registry")?;
    let ids: Vec<&str> = registry.kinds().iter().map(|k| k.id()).collect();
    debug!(extractors = ?ids, "Registry ready");

    let mut results = Vec::with_capacity(args.urls.len());
    let mut all_ok = true;

    for raw in &args.urls {
        let entry = if args.check {
            let extractor = Url::parse(raw)
                .ok()
                .and_then(|url| registry.kind_for(&url).map(|k| k.id()));
            all_ok &= extractor.is_some();
            json!({ "url": raw, "supported": extractor.is_some(), "extractor": extractor })
        } else {
            let entry = extract_one(&registry, raw).await;
            all_ok &= entry.get("ok").and_then(serde_json::Value::as_bool) == Some(true);
            entry
        };
        results.push(entry);
    }

    let output = if results.len() == 1 {
        results.remove(0)
    } else {
        json!({ "results": results })
    };

    let rendered = if args.compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{rendered}");

    Ok(all_ok)
}

async fn extract_one(registry: &ExtractorRegistry, raw: &str) -> serde_json::Value {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            warn!(url = %raw, "Invalid URL: {e}");
            return json!({ "url": raw, "ok": false, "unsupported": false, "error": format!("invalid URL: {e}") });
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let logger = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            log_event(&event);
        }
    });

    let result = registry.dispatch_with_events(&url, &tx).await;
    drop(tx);
    if let Err(e) = logger.await {
        warn!("Event logger task failed: {e}");
    }

    match result {
        Ok(media) => json!({ "url": raw, "ok": true, "media": media }),
        Err(e) => json!({
            "url": raw,
            "ok": false,
            "unsupported": e.is_unsupported(),
            "error": format!("{e:#}"),
        }),
    }
}

fn log_event(event: &ExtractorEvent) {
    match event {
        ExtractorEvent::Progress(p) => debug!(
            extractor = p.extractor,
            url = %p.url,
            progress = p.fraction,
            message = p.message.as_deref().unwrap_or(""),
            "Extraction progress"
        ),
        ExtractorEvent::Completed(c) => match &c.outcome {
            Outcome::Succeeded { media_count } => {
                info!(extractor = c.extractor, url = %c.url, media_count, "Extraction completed");
            }
            Outcome::Failed { reason } => {
                warn!(extractor = c.extractor, url = %c.url, reason = %reason, "Extraction failed");
            }
        },
    }
}

fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mediaget=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    // Logs go to stderr so stdout stays valid JSON
    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
