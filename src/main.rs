use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use yanyue_harvester::config::Config;
use yanyue_harvester::engine::chromium::ChromiumEngine;
use yanyue_harvester::harvester::Harvester;
use yanyue_harvester::ocr::tesseract::TesseractRecognizer;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    info!("starting yanyue harvester (crawl delay {:?})", config.crawl_delay);

    let engine = ChromiumEngine::launch(&config).await?;
    let page = engine.new_page(&config).await?;
    let recognizer = Arc::new(TesseractRecognizer::new());

    let mut harvester = Harvester::new(config, Arc::new(page), recognizer)?;
    let outcome = harvester.run().await;

    engine.close().await?;
    outcome?;

    info!("harvest complete");
    Ok(())
}
