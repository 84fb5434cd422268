//! Periodic refresh of the tray's displayed values
//!
//! Each tick reads every feature and one power sample on the blocking pool.
//! A tick waits at most `budget` for that work; past the budget the previous
//! snapshot stays on screen, flagged stale, and the unfinished refresh is
//! carried over to the next tick instead of starting another one.

use crate::core::{PowerSample, Result};
use crate::features::{FeatureController, FeatureId};
use crate::gpio::PinAccessor;
use crate::telemetry::{PowerSource, PowerTracker};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One feature as last read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureReading {
    pub feature: FeatureId,
    pub gpio: String,
    pub enabled: Option<bool>,
    pub error: Option<String>,
}

/// Everything the tray displays
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraySnapshot {
    pub features: Vec<FeatureReading>,
    pub power_watts: Option<f64>,
    /// Display delta against the previous sample (zero inside the noise band)
    pub power_delta: Option<f64>,
    pub power_error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// The last refresh overran its budget; values are from an earlier tick
    pub stale: bool,
}

impl TraySnapshot {
    /// Menu label, e.g. "Power: 4.32 W (+0.12)"
    pub fn power_label(&self) -> String {
        match (self.power_watts, self.power_delta) {
            (Some(watts), Some(delta)) if delta != 0.0 => format!("Power: {:.2} W ({:+.2})", watts, delta),
            (Some(watts), _) => format!("Power: {:.2} W", watts),
            (None, _) => "Power: n/a W".to_string(),
        }
    }

    pub fn feature(&self, id: FeatureId) -> Option<&FeatureReading> {
        self.features.iter().find(|f| f.feature == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Refreshed,
    /// Budget elapsed; the refresh keeps running in the background
    Stale,
}

struct Refresh {
    features: Vec<FeatureReading>,
    power: Result<PowerSample>,
}

pub struct Poller<P, S> {
    controller: Arc<FeatureController<P>>,
    power: Arc<S>,
    tracker: PowerTracker,
    budget: Duration,
    in_flight: Option<JoinHandle<Refresh>>,
    tx: watch::Sender<TraySnapshot>,
}

impl<P, S> Poller<P, S>
where
    P: PinAccessor + 'static,
    S: PowerSource + 'static,
{
    pub fn new(
        controller: Arc<FeatureController<P>>,
        power: Arc<S>,
        noise_threshold: f64,
        budget: Duration,
    ) -> (Self, watch::Receiver<TraySnapshot>) {
        let (tx, rx) = watch::channel(TraySnapshot::default());
        let poller = Self {
            controller,
            power,
            tracker: PowerTracker::new(noise_threshold),
            budget,
            in_flight: None,
            tx,
        };
        (poller, rx)
    }

    /// Run one refresh, bounded by the budget
    pub async fn tick(&mut self) -> TickOutcome {
        let mut handle = match self.in_flight.take() {
            Some(handle) => handle,
            None => self.spawn_refresh(),
        };

        match tokio::time::timeout(self.budget, &mut handle).await {
            Ok(Ok(refresh)) => {
                self.publish(refresh);
                TickOutcome::Refreshed
            }
            Ok(Err(e)) => {
                log::warn!("Tray refresh task failed: {}", e);
                self.tx.send_modify(|s| s.stale = true);
                TickOutcome::Stale
            }
            Err(_) => {
                log::debug!("Tray refresh exceeded {:?}, keeping previous values", self.budget);
                self.in_flight = Some(handle);
                self.tx.send_modify(|s| s.stale = true);
                TickOutcome::Stale
            }
        }
    }

    /// Tick every `period` until every receiver is gone
    pub async fn run(mut self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!("Tray polling every {}ms", period.as_millis());

        loop {
            interval.tick().await;
            if self.tx.is_closed() {
                break;
            }
            self.tick().await;
        }
    }

    fn spawn_refresh(&self) -> JoinHandle<Refresh> {
        let controller = Arc::clone(&self.controller);
        let power = Arc::clone(&self.power);

        tokio::task::spawn_blocking(move || {
            let features = controller
                .statuses()
                .into_iter()
                .map(|(feature, state)| FeatureReading {
                    feature: feature.id,
                    gpio: feature.gpio_label(),
                    enabled: state.as_ref().ok().copied(),
                    error: state.err().map(|e| e.to_string()),
                })
                .collect();
            Refresh {
                features,
                power: power.sample(),
            }
        })
    }

    fn publish(&mut self, refresh: Refresh) {
        let (power_watts, power_delta, power_error) = match refresh.power {
            Ok(sample) => {
                let watts = sample.watts;
                let delta = self.tracker.record(sample);
                (Some(watts), Some(delta.displayed()), None)
            }
            Err(e) => (None, None, Some(e.to_string())),
        };

        self.tx.send_replace(TraySnapshot {
            features: refresh.features,
            power_watts,
            power_delta,
            power_error,
            refreshed_at: Some(Utc::now()),
            stale: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Error, Level, RailReading};
    use crate::gpio::fake::FakePins;
    use crate::tray::{TrayAction, TrayEvent, TrayMachine};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    /// Returns queued wattages, then fails; optionally sleeps first
    struct ScriptedPower {
        watts: Mutex<Vec<f64>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedPower {
        fn new(watts: &[f64]) -> Self {
            Self {
                watts: Mutex::new(watts.iter().rev().copied().collect()),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(&[5.0, 5.0, 5.0])
            }
        }
    }

    impl PowerSource for ScriptedPower {
        fn sample(&self) -> Result<PowerSample> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            match self.watts.lock().unwrap().pop() {
                Some(power) => Ok(PowerSample::new(vec![RailReading {
                    name: "rail".into(),
                    voltage: None,
                    current: None,
                    power,
                }])),
                None => Err(Error::TelemetryUnavailable("script exhausted".into())),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn poller<P: PinAccessor + 'static, S: PowerSource + 'static>(
        pins: P,
        power: S,
        budget_ms: u64,
    ) -> (Poller<P, S>, watch::Receiver<TraySnapshot>) {
        Poller::new(
            Arc::new(FeatureController::new(pins)),
            Arc::new(power),
            0.05,
            Duration::from_millis(budget_ms),
        )
    }

    #[tokio::test]
    async fn test_refresh_publishes_snapshot() {
        let pins = FakePins::new();
        pins.set_level(27, Level::High);
        let (mut poller, rx) = poller(pins, ScriptedPower::new(&[4.00, 4.02, 4.50]), 1000);

        assert_eq!(poller.tick().await, TickOutcome::Refreshed);
        {
            let snapshot = rx.borrow();
            assert_eq!(snapshot.feature(FeatureId::Gps).unwrap().enabled, Some(true));
            assert_eq!(snapshot.feature(FeatureId::Usb).unwrap().enabled, Some(false));
            assert_eq!(snapshot.power_label(), "Power: 4.00 W");
            assert!(!snapshot.stale);
        }

        poller.tick().await;
        assert_eq!(rx.borrow().power_delta, Some(0.0));
        assert_eq!(rx.borrow().power_label(), "Power: 4.02 W");

        poller.tick().await;
        assert_eq!(rx.borrow().power_label(), "Power: 4.50 W (+0.48)");

        poller.tick().await;
        assert_eq!(rx.borrow().power_label(), "Power: n/a W");
        assert!(rx.borrow().power_error.is_some());
    }

    #[tokio::test]
    async fn test_pin_errors_are_per_feature() {
        let (mut poller, rx) = poller(FakePins::denying(&[16]), ScriptedPower::new(&[1.0]), 1000);
        poller.tick().await;

        let snapshot = rx.borrow();
        let lora = snapshot.feature(FeatureId::Lora).unwrap();
        assert_eq!(lora.enabled, None);
        assert!(lora.error.as_ref().unwrap().contains("GPIO16"));
        assert_eq!(snapshot.feature(FeatureId::Gps).unwrap().enabled, Some(false));
    }

    #[tokio::test]
    async fn test_slow_accessor_does_not_block_tick() {
        let slow_pins = FakePins::slow(Duration::from_millis(300));
        let (mut poller, rx) = poller(slow_pins, ScriptedPower::new(&[1.0]), 50);
        let mut tray = TrayMachine::new();

        let start = Instant::now();
        assert_eq!(poller.tick().await, TickOutcome::Stale);
        assert!(start.elapsed() < Duration::from_millis(250));
        assert!(rx.borrow().stale);

        // Interaction keeps flowing while the refresh is outstanding
        assert_eq!(tray.handle(TrayEvent::LeftClick), TrayAction::OpenStatusWindow);
        assert_eq!(tray.handle(TrayEvent::Tick), TrayAction::None);
    }

    #[tokio::test]
    async fn test_overrunning_refresh_is_not_duplicated() {
        let power = Arc::new(ScriptedPower::slow(Duration::from_millis(300)));
        let (mut poller, rx) = Poller::new(
            Arc::new(FeatureController::new(FakePins::new())),
            Arc::clone(&power),
            0.05,
            Duration::from_millis(50),
        );

        assert_eq!(poller.tick().await, TickOutcome::Stale);
        assert_eq!(poller.tick().await, TickOutcome::Stale);
        assert_eq!(power.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(poller.tick().await, TickOutcome::Refreshed);
        assert_eq!(power.calls.load(Ordering::SeqCst), 1);
        assert!(!rx.borrow().stale);
        assert_eq!(rx.borrow().power_watts, Some(5.0));
    }
}
