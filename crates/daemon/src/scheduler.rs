use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use videodog_common::config::MAX_INTERVAL_MINUTES;
use videodog_common::error::AppError;
use videodog_engine::{AppContext, CheckOutcome, Spool};

/// Per-tick tally of check outcomes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub not_due: usize,
    pub idle: usize,
    pub announced: usize,
    pub recorded: usize,
    pub baselined: usize,
    pub fetch_failed: usize,
    pub announce_failed: usize,
}

impl TickReport {
    /// Sources whose feed was actually read this tick.
    pub fn checked(&self) -> usize {
        self.idle
            + self.announced
            + self.recorded
            + self.baselined
            + self.announce_failed
    }

    fn record(&mut self, outcome: &CheckOutcome) {
        match outcome {
            CheckOutcome::NotDue => self.not_due += 1,
            CheckOutcome::NoNewItems => self.idle += 1,
            CheckOutcome::Announced { .. } => self.announced += 1,
            CheckOutcome::Recorded { .. } => self.recorded += 1,
            CheckOutcome::Baselined { .. } => self.baselined += 1,
            CheckOutcome::FetchFailed(_) => self.fetch_failed += 1,
            CheckOutcome::AnnounceFailed { .. } => self.announce_failed += 1,
        }
    }
}

/// Periodic driver: every tick, every monitored source is offered a check.
/// Sources that are not due cost nothing beyond the staleness gate.
pub struct Scheduler {
    ctx: Arc<AppContext>,
    tick: Duration,
}

impl Scheduler {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        // Validation bounds the interval; clamp anyway so the conversion cannot overflow.
        let minutes = ctx.config.tick_interval_minutes.min(MAX_INTERVAL_MINUTES);
        let tick = Duration::from_secs(minutes * 60);
        Self { ctx, tick }
    }

    /// Override the tick period.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Check every source once, in key order.
    ///
    /// Fetch and announce failures stay with their source. A spool failure
    /// aborts the tick and is returned.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickReport, AppError> {
        let mut report = TickReport::default();

        for source in self.ctx.sources.iter() {
            let outcome = self
                .ctx
                .processor
                .check_source(source, now)
                .await
                .inspect_err(|e| {
                    tracing::error!(source = source.key(), error = %e, "Spool failure during check");
                })?;
            report.record(&outcome);
        }

        if report.checked() > 0 || report.fetch_failed > 0 {
            tracing::info!(
                checked = report.checked(),
                announced = report.announced,
                recorded = report.recorded,
                fetch_failed = report.fetch_failed,
                announce_failed = report.announce_failed,
                "Tick complete"
            );
        } else {
            tracing::debug!(not_due = report.not_due, "Tick complete, nothing due");
        }
        Ok(report)
    }

    /// Tick until `shutdown` resolves or a fatal error occurs. A non-fatal
    /// error aborts only the current tick.
    ///
    /// `shutdown` is only observed between ticks; a tick in progress always
    /// runs to completion.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            tick_secs = self.tick.as_secs(),
            sources = self.ctx.sources.len(),
            announce = self.ctx.processor.announces(),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Scheduler stopping");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }

            if let Err(e) = self.run_tick(Utc::now()).await {
                if e.is_fatal() {
                    return Err(e);
                }
                tracing::warn!(error = %e, "Tick aborted, retrying on the next tick");
            }
        }
    }
}

/// Take the startup baseline, then schedule until `shutdown` resolves.
///
/// `spool` is closed on every exit path, including a failed baseline.
pub async fn serve<F>(ctx: Arc<AppContext>, spool: &Spool, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()>,
{
    let result = async {
        ctx.bootstrap().await?;
        Scheduler::new(ctx).run(shutdown).await
    }
    .await;

    spool.close().await;
    result
}
