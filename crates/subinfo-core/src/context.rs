//! Process-scoped runtime state.
//!
//! Built once at startup, before any batch is accepted, and shared by handle.
//! Everything inside is either immutable after construction or safe for
//! concurrent use.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    dispatcher::{BatchReport, Dispatcher},
    fetcher::SubscriptionFetcher,
    http::{PooledTransport, SubscriptionTransport},
    providers::{self, ProviderTable},
    report::{RenderedOutput, ReportRenderer},
    Result,
};

pub struct RuntimeContext {
    providers: Arc<ProviderTable>,
    dispatcher: Dispatcher,
    renderer: ReportRenderer,
    shutdown: CancellationToken,
}

impl RuntimeContext {
    /// Build the shared HTTP pool, load provider names and wire the dispatcher.
    pub async fn init(cfg: &Config) -> Result<Self> {
        let transport: Arc<dyn SubscriptionTransport> = Arc::new(PooledTransport::new(&cfg.http)?);
        let providers =
            providers::load_remote(transport.as_ref(), &cfg.provider_mappings_url).await;

        Ok(Self::from_parts(
            transport,
            providers,
            cfg.max_concurrent_fetches,
            ReportRenderer::new(cfg.render_options()),
        ))
    }

    pub fn from_parts(
        transport: Arc<dyn SubscriptionTransport>,
        providers: ProviderTable,
        max_concurrent: usize,
        renderer: ReportRenderer,
    ) -> Self {
        let providers = Arc::new(providers);
        let fetcher = SubscriptionFetcher::new(transport, providers.clone());
        Self {
            providers,
            dispatcher: Dispatcher::new(fetcher, max_concurrent),
            renderer,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn providers(&self) -> &ProviderTable {
        &self.providers
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Fetch and render one batch. `None` when the process is shutting down.
    pub async fn process_batch(&self, urls: Vec<String>) -> Option<(BatchReport, RenderedOutput)> {
        let report = self
            .dispatcher
            .run_until_cancelled(urls, &self.shutdown)
            .await?;
        let output = self.renderer.render(&report);
        Some((report, output))
    }

    /// Cancel pending batches and stop admitting new fetches.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.dispatcher.close();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fetcher::tests::StubTransport, report::RenderOptions};

    fn ctx(stub: StubTransport) -> RuntimeContext {
        RuntimeContext::from_parts(
            Arc::new(stub),
            ProviderTable::parse("alpha=Alpha"),
            4,
            ReportRenderer::new(RenderOptions::default()),
        )
    }

    #[tokio::test]
    async fn processes_a_mixed_batch() {
        let stub = StubTransport::default()
            .ok("https://alpha.example/s", "upload=1;download=2;total=30")
            .status("https://beta.example/s", 404);
        let ctx = ctx(stub);

        let (report, output) = ctx
            .process_batch(vec![
                "https://alpha.example/s".to_string(),
                "https://beta.example/s".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.success_count(), 1);

        let RenderedOutput::Inline(text) = output else {
            panic!("expected inline output");
        };
        assert!(text.contains("<b>Alpha</b>"));
        assert!(text.contains("HTTP 404"));
    }

    #[tokio::test]
    async fn shutdown_stops_new_batches() {
        let ctx = ctx(StubTransport::default());
        ctx.shutdown();
        assert!(ctx.is_shutting_down());
        assert!(ctx
            .process_batch(vec!["https://alpha.example/s".to_string()])
            .await
            .is_none());
    }
}
