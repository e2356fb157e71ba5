//! Narration pipeline binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vnar_pipeline::{Pipeline, PipelineConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vnar=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let mut args = std::env::args().skip(1);
    let video = match args.next() {
        Some(v) => v,
        None => {
            eprintln!("usage: vnar-pipeline <video> [out_dir]");
            std::process::exit(2);
        }
    };
    let out_dir = args.next().unwrap_or_else(|| "vnar-out".to_string());

    info!("Starting vnar-pipeline");
    let config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", config);

    let pipeline = match Pipeline::from_env(config) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create pipeline: {}", e);
            std::process::exit(1);
        }
    };

    match pipeline.run(&video, &out_dir).await {
        Ok(output) => {
            info!(
                "Narrated {} events into {}",
                output.timeline.len(),
                output.audio_path.display()
            );
        }
        Err(e) => {
            error!("Pipeline failed: {}", e);
            std::process::exit(1);
        }
    }
}
