//! Bounded fan-out / ordered fan-in over subscription URLs.

use std::{collections::HashSet, sync::Arc};

use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::fetcher::{FetchErrorKind, FetchResult, SubscriptionFetcher};

pub const DEFAULT_MAX_CONCURRENT: usize = 30;

/// Results of one batch, in first-occurrence input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub results: Vec<FetchResult>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FetchResult> {
        self.results.iter()
    }
}

/// Remove duplicates by exact string equality, keeping first occurrences.
pub fn dedupe_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for url in urls {
        let url = url.into();
        if seen.insert(url.clone()) {
            out.push(url);
        }
    }
    out
}

/// Process-wide admission control for outbound fetches.
///
/// Clones share the same semaphore, so the bound holds across every batch
/// running concurrently in the process. Each URL holds one permit for its whole
/// fetch-classify duration.
#[derive(Clone)]
pub struct Dispatcher {
    fetcher: SubscriptionFetcher,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl Dispatcher {
    pub fn new(fetcher: SubscriptionFetcher, max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            fetcher,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stop admitting new fetches. Pending acquisitions fail immediately.
    pub fn close(&self) {
        self.permits.close();
    }

    pub async fn run<I, S>(&self, urls: I) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls = dedupe_urls(urls);
        if urls.is_empty() {
            return BatchReport::default();
        }

        // Dropping this future drops the JoinSet, which aborts every task and
        // releases any permit it holds.
        let mut tasks = JoinSet::new();
        for (idx, url) in urls.iter().cloned().enumerate() {
            let permits = self.permits.clone();
            let fetcher = self.fetcher.clone();
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => fetcher.fetch(&url).await,
                    Err(_) => FetchResult::failure(
                        &url,
                        FetchErrorKind::TransportOrTimeout,
                        "dispatcher is shutting down",
                    ),
                };
                (idx, result)
            });
        }

        let mut slots: Vec<Option<FetchResult>> = vec![None; urls.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => tracing::error!(error = %e, "fetch task failed"),
            }
        }

        let results = slots
            .into_iter()
            .zip(urls.iter())
            .map(|(slot, url)| {
                slot.unwrap_or_else(|| {
                    FetchResult::failure(url, FetchErrorKind::Internal, "fetch task panicked")
                })
            })
            .collect();

        BatchReport { results }
    }

    /// Like [`Dispatcher::run`], but gives up (returning `None`) once `cancel`
    /// fires. All permits held by the abandoned batch are released.
    pub async fn run_until_cancelled<I, S>(
        &self,
        urls: I,
        cancel: &CancellationToken,
    ) -> Option<BatchReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            report = self.run(urls) => Some(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        http::{SubscriptionTransport, TransportError, UsageResponse},
        providers::ProviderTable,
    };

    /// Transport that tracks how many fetches are in flight at once.
    #[derive(Default)]
    struct GaugeTransport {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
        delay_ms: u64,
    }

    impl GaugeTransport {
        fn with_delay(delay_ms: u64) -> Self {
            Self {
                delay_ms,
                ..Self::default()
            }
        }

        async fn hold(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SubscriptionTransport for GaugeTransport {
        async fn fetch_usage(&self, url: &str) -> Result<UsageResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.hold().await;
            if url.contains("missing") {
                return Ok(UsageResponse {
                    status: 404,
                    usage_header: None,
                });
            }
            if url.contains("panic") {
                panic!("boom");
            }
            Ok(UsageResponse {
                status: 200,
                usage_header: Some("upload=1;download=1;total=10".to_string()),
            })
        }

        async fn fetch_body(&self, _url: &str) -> Result<String, TransportError> {
            self.hold().await;
            Err(TransportError::Timeout)
        }
    }

    fn dispatcher(transport: Arc<GaugeTransport>, capacity: usize) -> Dispatcher {
        let fetcher = SubscriptionFetcher::new(transport, Arc::new(ProviderTable::empty()));
        Dispatcher::new(fetcher, capacity)
    }

    #[test]
    fn dedupe_keeps_first_occurrence_order() {
        let out = dedupe_urls(["b", "a", "b", "c", "a"]);
        assert_eq!(out, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_requests() {
        let t = Arc::new(GaugeTransport::default());
        let d = dispatcher(t.clone(), 4);
        let report = d.run(Vec::<String>::new()).await;
        assert!(report.is_empty());
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn preserves_input_order_and_isolates_failures() {
        let t = Arc::new(GaugeTransport::with_delay(5));
        let d = dispatcher(t, 3);
        let urls = vec![
            "https://a.example/1",
            "https://a.example/missing",
            "https://a.example/1",
            "https://a.example/2",
            "https://a.example/panic",
            "https://a.example/3",
        ];

        let report = d.run(urls).await;
        let got: Vec<&str> = report.iter().map(|r| r.url()).collect();
        assert_eq!(
            got,
            vec![
                "https://a.example/1",
                "https://a.example/missing",
                "https://a.example/2",
                "https://a.example/panic",
                "https://a.example/3",
            ]
        );
        assert_eq!(report.success_count(), 3);
        assert!(matches!(
            report.results[1],
            FetchResult::Failure {
                error_kind: FetchErrorKind::HttpStatus(404),
                ..
            }
        ));
        assert!(matches!(
            report.results[3],
            FetchResult::Failure {
                error_kind: FetchErrorKind::Internal,
                ..
            }
        ));
        assert_eq!(d.available_permits(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_capacity_across_concurrent_batches() {
        let t = Arc::new(GaugeTransport::with_delay(2));
        let d = dispatcher(t.clone(), 5);

        let batch = |prefix: &'static str| {
            (0..120)
                .map(move |i| format!("https://{prefix}.example/{i}"))
                .collect::<Vec<_>>()
        };

        let other = d.clone();
        let (a, b) = tokio::join!(d.run(batch("a")), other.run(batch("b")));
        assert_eq!(a.len(), 120);
        assert_eq!(b.len(), 120);
        assert!(t.peak.load(Ordering::SeqCst) <= 5);
        assert!(t.peak.load(Ordering::SeqCst) >= 2);
        assert_eq!(d.available_permits(), 5);
    }

    #[tokio::test]
    async fn cancelling_a_batch_releases_permits() {
        let t = Arc::new(GaugeTransport::with_delay(10_000));
        let d = dispatcher(t, 2);
        let cancel = CancellationToken::new();

        let run = {
            let d = d.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                d.run_until_cancelled(
                    (0..10).map(|i| format!("https://slow.example/{i}")),
                    &cancel,
                )
                .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(d.available_permits(), 0);

        cancel.cancel();
        assert!(run.await.unwrap().is_none());

        // Aborted tasks drop their permits once the runtime polls them.
        for _ in 0..50 {
            if d.available_permits() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(d.available_permits(), 2);
    }

    #[tokio::test]
    async fn closed_dispatcher_fails_fast() {
        let t = Arc::new(GaugeTransport::default());
        let d = dispatcher(t.clone(), 2);
        d.close();
        let report = d.run(["https://a.example/"]).await;
        assert!(matches!(
            report.results[0],
            FetchResult::Failure {
                error_kind: FetchErrorKind::TransportOrTimeout,
                ..
            }
        ));
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }
}
