//! Monitored sources and the staleness gate.
//!
//! Each configured channel becomes a [`MonitoredSource`] that lives for the
//! whole process. The only mutable state is when the channel was last
//! checked, guarded by a lock owned by that source alone, so unrelated
//! channels never serialize on each other.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::MutexGuard;

use videodog_common::config::AppConfig;
use videodog_common::types::Destination;

/// A channel being watched for new uploads.
#[derive(Debug)]
pub struct MonitoredSource {
    key: String,
    channel_id: String,
    destination: Destination,
    poll_interval: TimeDelta,
    /// `None` until the first check, which makes a fresh source always due.
    last_checked_at: Mutex<Option<DateTime<Utc>>>,
    /// Set when the startup baseline could not be taken for this source.
    baseline_pending: AtomicBool,
    /// Held for the whole fetch-filter-announce-mark sequence.
    in_flight: tokio::sync::Mutex<()>,
}

impl MonitoredSource {
    pub fn new(
        key: impl Into<String>,
        channel_id: impl Into<String>,
        destination: Destination,
        poll_interval: TimeDelta,
    ) -> Self {
        Self {
            key: key.into(),
            channel_id: channel_id.into(),
            destination,
            poll_interval,
            last_checked_at: Mutex::new(None),
            baseline_pending: AtomicBool::new(false),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn poll_interval(&self) -> TimeDelta {
        self.poll_interval
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        *self.lock_last_checked()
    }

    /// Returns `true` if the source is due at `now`, recording `now` as the
    /// last check in the same critical section. Returns `false` and leaves
    /// the state untouched otherwise.
    ///
    /// A `now` earlier than the last check means the wall clock stepped
    /// back. The source is then due and gets re-stamped, so polling resumes
    /// on the corrected clock instead of waiting for it to catch up.
    pub fn try_acquire_check(&self, interval: TimeDelta, now: DateTime<Utc>) -> bool {
        let mut last = self.lock_last_checked();
        let due = match *last {
            None => true,
            Some(checked) if now < checked => {
                tracing::warn!(
                    source = %self.key,
                    last_checked_at = %checked,
                    now = %now,
                    "Clock moved backwards, treating source as due"
                );
                true
            }
            Some(checked) => now - checked >= interval,
        };
        if due {
            *last = Some(now);
        }
        due
    }

    /// Record a check at `now` regardless of staleness.
    pub fn record_check(&self, now: DateTime<Utc>) {
        *self.lock_last_checked() = Some(now);
    }

    /// Wait until no other procedure is working on this source.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.in_flight.lock().await
    }

    pub fn baseline_pending(&self) -> bool {
        self.baseline_pending.load(Ordering::SeqCst)
    }

    pub fn set_baseline_pending(&self, pending: bool) {
        self.baseline_pending.store(pending, Ordering::SeqCst);
    }

    fn lock_last_checked(&self) -> std::sync::MutexGuard<'_, Option<DateTime<Utc>>> {
        // The guarded value is a plain timestamp, it cannot be left half-written.
        self.last_checked_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Convert a configured interval, saturating instead of overflowing.
pub fn interval_from_minutes(minutes: u64) -> TimeDelta {
    i64::try_from(minutes)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .unwrap_or(TimeDelta::MAX)
}

/// Arena of monitored sources indexed by configuration key.
#[derive(Debug, Default)]
pub struct SourceSet {
    sources: BTreeMap<String, Arc<MonitoredSource>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one source per configured channel.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut set = Self::new();
        for (key, channel) in &config.channels {
            let minutes = config.poll_interval_for(channel);
            set.insert(MonitoredSource::new(
                key.clone(),
                channel.channel_id.clone(),
                channel.destination(),
                interval_from_minutes(minutes),
            ));
        }
        set
    }

    /// Add a source, replacing any source with the same key.
    pub fn insert(&mut self, source: MonitoredSource) -> Arc<MonitoredSource> {
        let source = Arc::new(source);
        self.sources.insert(source.key.clone(), Arc::clone(&source));
        source
    }

    pub fn get(&self, key: &str) -> Option<&Arc<MonitoredSource>> {
        self.sources.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<MonitoredSource>> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source(minutes: i64) -> MonitoredSource {
        MonitoredSource::new(
            "main",
            "UC123",
            Destination {
                webhook_url: "https://discord.com/api/webhooks/1/abc".into(),
                role_id: None,
            },
            TimeDelta::minutes(minutes),
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 16, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_source_is_due() {
        let src = source(10);
        assert_eq!(src.last_checked_at(), None);
        assert!(src.try_acquire_check(src.poll_interval(), t0()));
        assert_eq!(src.last_checked_at(), Some(t0()));
    }

    #[test]
    fn test_gate_within_and_after_interval() {
        let src = source(10);
        let interval = src.poll_interval();

        assert!(src.try_acquire_check(interval, t0()));
        assert!(!src.try_acquire_check(interval, t0() + TimeDelta::minutes(9)));
        // A refused check does not move the timestamp.
        assert_eq!(src.last_checked_at(), Some(t0()));
        assert!(src.try_acquire_check(interval, t0() + TimeDelta::minutes(10)));
        assert!(!src.try_acquire_check(interval, t0() + TimeDelta::minutes(11)));
    }

    #[test]
    fn test_record_check_defers_next_check() {
        let src = source(10);
        src.record_check(t0());
        assert!(!src.try_acquire_check(src.poll_interval(), t0() + TimeDelta::minutes(5)));
    }

    #[test]
    fn test_concurrent_gate_grants_once() {
        let src = source(10);
        let now = t0();

        let granted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| src.try_acquire_check(src.poll_interval(), now)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap() as usize)
                .sum()
        });

        assert_eq!(granted, 1);
    }

    #[test]
    fn test_clock_step_back_keeps_source_pollable() {
        let src = source(10);
        let interval = src.poll_interval();
        assert!(src.try_acquire_check(interval, t0()));

        // Thirty real minutes later, but the clock was set back one hour.
        let stepped_back = t0() - TimeDelta::hours(1) + TimeDelta::minutes(30);
        assert!(src.try_acquire_check(interval, stepped_back));
        assert_eq!(src.last_checked_at(), Some(stepped_back));

        // The gate runs on the corrected clock from here on.
        assert!(!src.try_acquire_check(interval, stepped_back + TimeDelta::minutes(5)));
        assert!(src.try_acquire_check(interval, stepped_back + TimeDelta::minutes(10)));
    }

    #[test]
    fn test_interval_from_minutes_saturates() {
        assert_eq!(interval_from_minutes(10), TimeDelta::minutes(10));
        assert_eq!(interval_from_minutes(400_000_000_000_000_000), TimeDelta::MAX);
        assert_eq!(interval_from_minutes(u64::MAX), TimeDelta::MAX);
    }

    #[test]
    fn test_from_config_with_huge_interval_does_not_panic() {
        let config = AppConfig::from_json(
            r#"{
                "poll_interval_minutes": 400000000000000000,
                "channels": {"a": {"channel_id": "UC_A", "webhook_url": "https://h.example/a"}}
            }"#,
        )
        .unwrap();

        let set = SourceSet::from_config(&config);
        assert_eq!(set.get("a").unwrap().poll_interval(), TimeDelta::MAX);
    }

    #[test]
    fn test_baseline_flag() {
        let src = source(10);
        assert!(!src.baseline_pending());
        src.set_baseline_pending(true);
        assert!(src.baseline_pending());
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig::from_json(
            r#"{
                "poll_interval_minutes": 15,
                "channels": {
                    "b": {"channel_id": "UC_B", "webhook_url": "https://h.example/b"},
                    "a": {"channel_id": "UC_A", "webhook_url": "https://h.example/a", "role_id": "7", "poll_interval_minutes": 5}
                }
            }"#,
        )
        .unwrap();

        let set = SourceSet::from_config(&config);
        assert_eq!(set.len(), 2);

        let keys: Vec<&str> = set.iter().map(|s| s.key()).collect();
        assert_eq!(keys, ["a", "b"]);

        let a = set.get("a").unwrap();
        assert_eq!(a.channel_id(), "UC_A");
        assert_eq!(a.poll_interval(), TimeDelta::minutes(5));
        assert_eq!(a.destination().role_id.as_deref(), Some("7"));
        assert_eq!(set.get("b").unwrap().poll_interval(), TimeDelta::minutes(15));
    }
}
