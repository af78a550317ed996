use std::sync::Arc;

use subinfo_core::{config::Config, context::RuntimeContext};

#[tokio::main]
async fn main() -> Result<(), subinfo_core::Error> {
    subinfo_core::logging::init("subinfo")?;

    let cfg = Arc::new(Config::load()?);
    let ctx = Arc::new(RuntimeContext::init(&cfg).await?);

    subinfo_telegram::router::run_polling(cfg, ctx)
        .await
        .map_err(|e| subinfo_core::Error::External(format!("telegram bot failed: {e}")))?;

    tracing::info!("stopped");
    Ok(())
}
