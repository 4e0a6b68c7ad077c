use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration, Instant};

/// Watches the telemetry link for silence.
///
/// Clones share state, so the socket handler updates and the watchdog task
/// reads the same clock.
#[derive(Clone, Debug)]
pub struct TelemetryHealth {
    last_update: Arc<Mutex<Option<Instant>>>,
    pub silence_threshold: Duration,
    warned: Arc<Mutex<bool>>,
}

impl TelemetryHealth {
    pub fn new(silence_threshold_secs: u64) -> Self {
        TelemetryHealth {
            last_update: Arc::new(Mutex::new(None)),
            silence_threshold: Duration::from_secs(silence_threshold_secs),
            warned: Arc::new(Mutex::new(false)),
        }
    }

    /// Record a valid sample
    pub fn update(&self) {
        if let Ok(mut time) = self.last_update.lock() {
            *time = Some(Instant::now());
        }
        if let Ok(mut warned) = self.warned.lock() {
            if *warned {
                log::info!("[HEALTH] Telemetry resumed");
                *warned = false;
            }
        }
    }

    /// None until the first sample has arrived
    pub fn time_since_last_update(&self) -> Option<Duration> {
        self.last_update
            .lock()
            .ok()
            .and_then(|t| t.map(|t| t.elapsed()))
    }

    /// Never silent before the first sample; readiness covers that case
    pub fn is_silent(&self) -> bool {
        self.time_since_last_update()
            .map(|d| d > self.silence_threshold)
            .unwrap_or(false)
    }

    pub fn report(&self) -> HealthReport {
        HealthReport {
            telemetry_seen: self.time_since_last_update().is_some(),
            telemetry_healthy: !self.is_silent(),
            silence_duration_secs: self
                .time_since_last_update()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
        }
    }

    /// True once per silence period
    fn should_warn(&self) -> bool {
        if !self.is_silent() {
            return false;
        }
        match self.warned.lock() {
            Ok(mut warned) if !*warned => {
                *warned = true;
                true
            }
            _ => false,
        }
    }
}

impl Default for TelemetryHealth {
    fn default() -> Self {
        Self::new(5)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    pub telemetry_seen: bool,
    pub telemetry_healthy: bool,
    pub silence_duration_secs: f64,
}

/// Periodic silence check. Runs until the runtime shuts down.
pub async fn telemetry_health_task(health: TelemetryHealth, check_interval: Duration) {
    loop {
        sleep(check_interval).await;

        if health.should_warn() {
            if let Some(duration) = health.time_since_last_update() {
                log::warn!(
                    "[HEALTH] Telemetry SILENT for {:.1}s, haptic state frozen",
                    duration.as_secs_f64()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_not_silent_before_first_sample() {
        let health = TelemetryHealth::new(0);
        assert!(health.time_since_last_update().is_none());
        assert!(!health.is_silent());
        assert!(!health.report().telemetry_seen);
    }

    #[test]
    fn test_silence_detection() {
        let health = TelemetryHealth::new(1);
        health.update();
        assert!(!health.is_silent());

        thread::sleep(std::time::Duration::from_millis(1100));
        assert!(health.is_silent());

        health.update();
        assert!(!health.is_silent());
    }

    #[test]
    fn test_warns_once_per_silence() {
        let mut health = TelemetryHealth::new(0);
        health.silence_threshold = Duration::from_millis(10);
        health.update();
        thread::sleep(std::time::Duration::from_millis(30));

        assert!(health.should_warn());
        assert!(!health.should_warn());

        health.update();
        thread::sleep(std::time::Duration::from_millis(30));
        assert!(health.should_warn());
    }

    #[test]
    fn test_clones_share_clock() {
        let health = TelemetryHealth::default();
        let other = health.clone();
        other.update();
        assert!(health.report().telemetry_seen);
    }
}
