//! The process context: everything built once at start-up.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CachedFetcher, PayloadCache};
use crate::config::Settings;
use crate::fetch::{FetchClient, FetchError, HttpTransport, Transport};
use crate::report::ReportPipeline;
use crate::scheduler::{LogSink, ReportSink, WebhookSink, spawn_auto_report, spawn_cache_sweeper};
use crate::sources::{FlightAdapter, GtfsAdapter, HafasAdapter, SourceAdapter, TrainAdapter};

/// Shared services for request handlers and background jobs.
///
/// There is no global state: the cache and the fetch client are reachable
/// only through this context.
pub struct AppContext {
    pub settings: Settings,
    pub cache: Arc<PayloadCache>,
    pub client: FetchClient,
    pub pipeline: ReportPipeline,
    http: Option<reqwest::Client>,
    jobs: Vec<JoinHandle<()>>,
}

impl AppContext {
    /// Build the context on the real network.
    pub fn new(settings: Settings) -> Result<Self, FetchError> {
        let transport = HttpTransport::new(&settings.http)?;
        let http = transport.http().clone();
        let mut context = Self::with_transport(settings, Arc::new(transport));
        context.http = Some(http);
        Ok(context)
    }

    /// Build the context over any transport.
    pub fn with_transport(settings: Settings, transport: Arc<dyn Transport>) -> Self {
        let cache = Arc::new(PayloadCache::new(&settings.cache));
        let client = FetchClient::new(transport, settings.retry.clone());
        let fetcher = CachedFetcher::new(client.clone(), cache.clone());
        let tz = settings.timezone;
        let sources = &settings.sources;

        let flights: Arc<dyn SourceAdapter> = Arc::new(FlightAdapter::new(
            fetcher.clone(),
            sources.flights.clone(),
            tz,
        ));
        let live: Arc<dyn SourceAdapter> =
            Arc::new(HafasAdapter::new(fetcher.clone(), sources.hafas.clone(), tz));
        let timetable: Arc<dyn SourceAdapter> =
            Arc::new(GtfsAdapter::new(fetcher, sources.gtfs.clone(), tz));
        let trains: Arc<dyn SourceAdapter> = Arc::new(TrainAdapter::new(live, timetable));

        let pipeline = ReportPipeline::new(
            flights,
            trains,
            settings.analysis.clone(),
            settings.pipeline_deadline,
            tz,
        );

        Self {
            settings,
            cache,
            client,
            pipeline,
            http: None,
            jobs: Vec::new(),
        }
    }

    /// Sinks for automatic reports: always the log, plus the webhook when
    /// one is configured and a network client exists.
    pub fn sinks(&self) -> Vec<Arc<dyn ReportSink>> {
        let mut sinks: Vec<Arc<dyn ReportSink>> = vec![Arc::new(LogSink)];
        if let (Some(url), Some(http)) = (&self.settings.webhook_url, &self.http) {
            sinks.push(Arc::new(
                WebhookSink::new(url.clone(), http.clone())
                    .with_limit(self.settings.message_limit),
            ));
        }
        sinks
    }

    /// Start the cache sweeper and, if enabled, the auto-report loop.
    pub fn start_background(&mut self) {
        self.jobs.push(spawn_cache_sweeper(
            self.cache.clone(),
            self.settings.cache.sweep_interval,
        ));
        if let Some(handle) = spawn_auto_report(
            self.pipeline.clone(),
            self.settings.report_interval_hours,
            self.sinks(),
        ) {
            self.jobs.push(handle);
        }
        info!(jobs = self.jobs.len(), "background jobs started");
    }

    pub fn background_jobs(&self) -> usize {
        self.jobs.len()
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        for job in &self.jobs {
            job.abort();
        }
    }
}
