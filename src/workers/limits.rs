//! Limits watcher: turns changes of advertised bounds into governor limit events.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::governor::{Governor, Policies, UnitReport};

/// Polls the bounds of every managed unit and reports limit changes to the governor.
pub struct LimitsWatcher {
    shutdown_token: CancellationToken,
    governor: Arc<dyn Governor>,
    policies: Arc<dyn Policies>,
    interval: Duration,
}

impl LimitsWatcher {
    pub fn new(
        shutdown_token: CancellationToken,
        governor: Arc<dyn Governor>,
        policies: Arc<dyn Policies>,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            shutdown_token,
            governor,
            policies,
            interval,
        })
    }

    /// Runs one observation pass and returns the number of limit events fired.
    ///
    /// A unit fires when the platform's limits differ from the ones the governor
    /// last acted on, which start records, so a change right after start is
    /// never lost.
    pub fn poll(&self) -> usize {
        let managed: Vec<UnitReport> = self
            .governor
            .units()
            .into_iter()
            .filter(|r| r.managed)
            .collect();

        let mut fired = 0;
        for report in managed {
            let unit = report.id;
            let bounds = match self.policies.bounds(unit) {
                Ok(bounds) => bounds,
                Err(err) => {
                    warn!(
                        component = "limits-watcher",
                        event = "bounds_read_failed",
                        unit = unit,
                        error = %err,
                        "cannot read unit bounds"
                    );
                    continue;
                }
            };
            if bounds.window() == report.window {
                continue;
            }

            fired += 1;
            debug!(
                component = "limits-watcher",
                event = "limits_changed",
                unit = unit,
                min_khz = bounds.min,
                max_khz = bounds.max,
                prev_min_khz = report.window.min,
                prev_max_khz = report.window.max,
                "unit limits changed"
            );
            if let Err(err) = self.governor.on_bounds_changed(unit) {
                warn!(
                    component = "limits-watcher",
                    event = "limits_apply_failed",
                    unit = unit,
                    error = %err,
                    "failed to re-apply target after limit change"
                );
            }
        }
        fired
    }

    /// Polls until the shutdown token is cancelled.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            component = "limits-watcher",
            event = "started",
            interval_ms = self.interval.as_millis() as u64,
            "limits watcher started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    info!(component = "limits-watcher", event = "stopped", "limits watcher stopped");
                    return;
                }
                _ = ticker.tick() => {
                    // Bounds reads and re-clamps may hit sysfs.
                    let watcher = self.clone();
                    if let Err(err) = tokio::task::spawn_blocking(move || watcher.poll()).await {
                        warn!(
                            component = "limits-watcher",
                            event = "poll_failed",
                            error = %err,
                            "limits poll did not complete"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::{Bounds, Error, Relation, SetSpeed, UnitId};
    use crate::platform::{Request, SimPlatform};

    fn setup() -> (Arc<SimPlatform>, Arc<SetSpeed>) {
        let platform = Arc::new(
            SimPlatform::new()
                .with_unit(0, Bounds::new(800_000, 2_000_000, 1_200_000), vec![])
                .with_unit(1, Bounds::new(800_000, 2_000_000, 1_000_000), vec![]),
        );
        let gov = Arc::new(SetSpeed::new(platform.clone(), platform.clone()));
        gov.attach(0).unwrap();
        gov.start(0).unwrap();
        gov.attach(1).unwrap();
        (platform, gov)
    }

    fn watcher(platform: &Arc<SimPlatform>, gov: &Arc<SetSpeed>) -> Arc<LimitsWatcher> {
        LimitsWatcher::new(
            CancellationToken::new(),
            gov.clone(),
            platform.clone(),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn test_first_pass_records_only() {
        let (platform, gov) = setup();
        let w = watcher(&platform, &gov);

        assert_eq!(w.poll(), 0);
        assert_eq!(platform.request_count(), 0);
    }

    #[test]
    fn test_limit_change_fires_once_for_managed_units() {
        let (platform, gov) = setup();
        let w = watcher(&platform, &gov);
        w.poll();

        platform.set_limits(0, 800_000, 1_000_000).unwrap();
        platform.set_limits(1, 800_000, 900_000).unwrap();
        assert_eq!(w.poll(), 1);
        assert_eq!(
            platform.last_request(),
            Some(Request {
                unit: 0,
                freq: 1_000_000,
                relation: Relation::AtOrAbove,
            })
        );

        // Current frequency moved but limits did not: nothing to do.
        assert_eq!(w.poll(), 0);
        assert_eq!(platform.request_count(), 1);
    }

    #[test]
    fn test_change_right_after_start_is_clamped() {
        let (platform, gov) = setup();
        let w = watcher(&platform, &gov);
        assert_eq!(w.poll(), 0);

        gov.start(1).unwrap();
        platform.set_limits(1, 800_000, 900_000).unwrap();

        assert_eq!(w.poll(), 1);
        assert_eq!(
            platform.requests(),
            vec![Request {
                unit: 1,
                freq: 900_000,
                relation: Relation::AtOrAbove,
            }]
        );
        assert_eq!(platform.bounds(1).unwrap().cur, 900_000);
    }

    #[test]
    fn test_restarted_unit_is_compared_with_its_new_start() {
        let (platform, gov) = setup();
        let w = watcher(&platform, &gov);

        gov.stop(0);
        platform.set_limits(0, 800_000, 1_500_000).unwrap();
        // Limits moved while unmanaged: nothing to re-apply.
        assert_eq!(w.poll(), 0);

        gov.start(0).unwrap();
        assert_eq!(w.poll(), 0);

        platform.set_limits(0, 800_000, 1_000_000).unwrap();
        assert_eq!(w.poll(), 1);
        assert_eq!(platform.request_count(), 1);
    }

    struct SlowPolicies {
        inner: Arc<SimPlatform>,
    }

    impl Policies for SlowPolicies {
        fn bounds(&self, unit: UnitId) -> Result<Bounds, Error> {
            std::thread::sleep(Duration::from_millis(50));
            self.inner.bounds(unit)
        }

        fn units(&self) -> Result<Vec<UnitId>, Error> {
            self.inner.units()
        }
    }

    #[tokio::test]
    async fn test_slow_bounds_reads_do_not_stall_runtime() {
        let (platform, gov) = setup();
        let token = CancellationToken::new();
        let slow = Arc::new(SlowPolicies {
            inner: platform.clone(),
        });
        let w = LimitsWatcher::new(token.clone(), gov.clone(), slow, Duration::from_millis(1));
        let handle = tokio::spawn(w.run());

        let started = std::time::Instant::now();
        let mut ticks = 0;
        while started.elapsed() < Duration::from_millis(300) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            ticks += 1;
        }
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();

        assert!(ticks >= 10, "runtime stalled by limits polling: {} ticks", ticks);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (platform, gov) = setup();
        let token = CancellationToken::new();
        let w = LimitsWatcher::new(token.clone(), gov.clone(), platform.clone(), Duration::from_millis(5));

        let handle = tokio::spawn(w.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        platform.set_limits(0, 800_000, 1_000_000).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
        assert_eq!(platform.bounds(0).unwrap().cur, 1_000_000);
    }
}
