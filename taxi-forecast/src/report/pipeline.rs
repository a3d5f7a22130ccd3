//! Concurrent report orchestration.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::analysis::AnalysisConfig;
use crate::domain::{ReportMode, ReportWindow, SourceKind};
use crate::sources::{SourceAdapter, SourceResult, UnavailableReason, next_tgv};

use super::Report;

/// Fetches both sources concurrently under one deadline and builds the
/// report from whatever answered in time. Trains are also asked for the
/// rest of today and tomorrow to find the next TGV.
///
/// A source that misses the deadline counts as unavailable for this report;
/// its task keeps running so it can still fill the cache for the next one.
#[derive(Clone)]
pub struct ReportPipeline {
    flights: Arc<dyn SourceAdapter>,
    trains: Arc<dyn SourceAdapter>,
    analysis: AnalysisConfig,
    deadline: Duration,
    tz: Tz,
}

impl ReportPipeline {
    pub fn new(
        flights: Arc<dyn SourceAdapter>,
        trains: Arc<dyn SourceAdapter>,
        analysis: AnalysisConfig,
        deadline: Duration,
        tz: Tz,
    ) -> Self {
        Self {
            flights,
            trains,
            analysis,
            deadline,
            tz,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Build a report for `mode` as of now.
    pub async fn build_report(&self, mode: ReportMode) -> Report {
        let now = Utc::now().with_timezone(&self.tz);
        self.build_report_at(mode, now).await
    }

    /// Build a report for `mode` as of `now`.
    pub async fn build_report_at(&self, mode: ReportMode, now: DateTime<Tz>) -> Report {
        let window = ReportWindow::for_mode(mode, now, self.analysis.now_window());
        let deadline = Instant::now() + self.deadline;

        let flights = spawn_source(self.flights.clone(), window.clone());
        let trains = spawn_source(self.trains.clone(), window.clone());
        let horizon = spawn_source(self.trains.clone(), ReportWindow::through_tomorrow(now));

        let (flights, trains, horizon) = tokio::join!(
            settle(flights, deadline, SourceKind::Flight),
            settle(trains, deadline, SourceKind::Train),
            settle(horizon, deadline, SourceKind::Train),
        );

        let report = Report::assemble(window, flights, trains, &self.analysis)
            .with_next_tgv(next_tgv(&horizon));
        info!(
            mode = %mode,
            window = %report.window_description(),
            flights = report.flights.arrivals().len(),
            trains = report.trains.arrivals().len(),
            degraded = report.degraded,
            tgv = report.next_tgv.is_some(),
            "report built"
        );
        report
    }
}

fn spawn_source(adapter: Arc<dyn SourceAdapter>, window: ReportWindow) -> JoinHandle<SourceResult> {
    tokio::spawn(async move { adapter.fetch(&window).await })
}

/// Wait for a source task until `deadline`.
async fn settle(
    handle: JoinHandle<SourceResult>,
    deadline: Instant,
    kind: SourceKind,
) -> SourceResult {
    match tokio::time::timeout_at(deadline, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(source = %kind, error = %e, "source task failed");
            SourceResult::Unavailable(UnavailableReason::TaskFailed(e.to_string()))
        }
        Err(_) => {
            // Dropping the handle detaches the task; it runs to completion.
            warn!(source = %kind, "source missed the report deadline");
            SourceResult::Unavailable(UnavailableReason::DeadlineExceeded)
        }
    }
}
