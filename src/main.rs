use std::{process::exit, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use doctorbot::{settings::Args, web, ChatOrchestrator, Settings};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    doctorbot::init_tracing("info");

    if let Err(e) = run().await {
        error!("{e:#}");
        exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let mut settings = Settings::from_file(&args.config)
        .with_context(|| format!("Problem while loading {}", args.config.display()))?;
    settings
        .apply_port_override(std::env::var("PORT").ok().as_deref())
        .context("Problem while applying PORT")?;

    info!("Doctor chatbot server {}", env!("CARGO_PKG_VERSION"));
    let chat = ChatOrchestrator::connect(&settings)
        .await
        .context("Problem while starting the chat pipeline")?;

    web::serve(Arc::new(chat), settings.web.address).await;
    Ok(())
}
