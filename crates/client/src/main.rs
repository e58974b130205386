//! Headless engine host.
//!
//! ```bash
//! # Built-in demo in real time
//! cargo run -p retro-client
//!
//! # A content directory, 600 ticks as fast as possible
//! RETRO_CONTENT_DIR=./content RETRO_TICKS=600 cargo run -p retro-client
//! ```

use anyhow::Result;

use engine_content::ContentFactory;
use engine_core::{OpcodeRevision, Services};
use retro_client::services::LoggingAudio;
use retro_client::{ClientConfig, Session, demo};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env();
    let _guard = retro_client::logging::setup_logging(&config)?;

    let content = match &config.content_dir {
        Some(dir) => ContentFactory::new(dir)
            .opcode_revision(config.opcode_revision)
            .load()?,
        None => {
            tracing::info!("RETRO_CONTENT_DIR not set, running the built-in demo");
            demo::content(config.opcode_revision.unwrap_or(OpcodeRevision::Current))?
        }
    };
    tracing::info!(
        title = %content.title,
        stages = content.scenes.len(),
        revision = %content.config.opcode_revision,
        "Starting client"
    );

    let engine = content.into_engine(Services::default().with_audio(LoggingAudio))?;
    let session = Session::start(engine, config.digests)?;

    match config.ticks {
        Some(ticks) => session.run_headless(ticks).await?,
        None => session.run_realtime().await?,
    }

    let summary = session.finish(config.digests).await?;
    tracing::info!(
        frame = summary.status.frame,
        state = %summary.status.state,
        stage = ?summary.status.stage,
        digest = summary.digest.as_deref().unwrap_or("-"),
        "Client shutdown complete"
    );
    Ok(())
}
