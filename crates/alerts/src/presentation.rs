//! Display decorations for raised alerts.
//!
//! These wrap an immutable [`Alert`] and only change how it is rendered and
//! announced; they never alter what the evaluator raised.

use std::time::{Duration, Instant};

use vitals_core::{Alert, AlertSeverity};

/// `"Patient {id}: {condition} (Time: {timestamp})"`.
pub fn format_message(alert: &Alert) -> String {
    format!(
        "Patient {}: {} (Time: {})",
        alert.patient_id, alert.condition, alert.timestamp
    )
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// An alert tagged with a priority level and the reason for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PrioritizedAlert {
    alert: Alert,
    level: AlertSeverity,
    reason: String,
}

impl PrioritizedAlert {
    pub fn new(alert: Alert, level: AlertSeverity, reason: impl Into<String>) -> Self {
        Self {
            alert,
            level,
            reason: reason.into(),
        }
    }

    /// Prioritize using the alert's own severity, falling back to `Medium`.
    pub fn from_severity(alert: Alert, reason: impl Into<String>) -> Self {
        let level = alert.severity.unwrap_or(AlertSeverity::Medium);
        Self::new(alert, level, reason)
    }

    pub fn alert(&self) -> &Alert {
        &self.alert
    }

    pub fn level(&self) -> AlertSeverity {
        self.level
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn message(&self) -> String {
        format!(
            "{} [PRIORITY: {} - {}]",
            format_message(&self.alert),
            self.level,
            self.reason
        )
    }

    pub fn is_critical(&self) -> bool {
        self.level == AlertSeverity::Critical
    }

    /// `High` or `Critical`.
    pub fn is_high_priority(&self) -> bool {
        matches!(self.level, AlertSeverity::High | AlertSeverity::Critical)
    }

    pub fn reprioritize(&mut self, level: AlertSeverity, reason: impl Into<String>) {
        let previous = self.level;
        self.level = level;
        self.reason = reason.into();
        tracing::info!(
            patient_id = self.alert.patient_id,
            from = %previous,
            to = %level,
            reason = %self.reason,
            "Alert priority updated",
        );
    }

    /// Log the alert at a level matching its priority.
    pub fn announce(&self) {
        let message = self.message();
        match self.level {
            AlertSeverity::Critical => tracing::error!(%message, "Critical priority alert"),
            AlertSeverity::High => tracing::warn!(%message, "High priority alert"),
            AlertSeverity::Medium | AlertSeverity::Low => tracing::info!(%message, "Alert"),
        }
    }
}

// ---------------------------------------------------------------------------
// Repetition
// ---------------------------------------------------------------------------

/// Outcome of [`RepeatSchedule::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// The alert fires; this is firing number `n` (1-based).
    Fire(u32),
    /// Too early to repeat; wait this much longer.
    TooSoon(Duration),
    /// Every repetition has fired.
    Completed,
}

/// Bounded repetition of one alert with a minimum interval between firings.
#[derive(Debug, Clone)]
pub struct RepeatSchedule {
    alert: Alert,
    max_repeats: u32,
    interval: Duration,
    fired: u32,
    last_fired: Option<Instant>,
}

impl RepeatSchedule {
    pub fn new(alert: Alert, max_repeats: u32, interval: Duration) -> Self {
        Self {
            alert,
            max_repeats,
            interval,
            fired: 0,
            last_fired: None,
        }
    }

    pub fn alert(&self) -> &Alert {
        &self.alert
    }

    /// Decide whether the alert fires at `now`, recording it if so.
    ///
    /// The first poll always fires unless `max_repeats` is zero.
    pub fn poll(&mut self, now: Instant) -> Poll {
        if self.is_completed() {
            return Poll::Completed;
        }
        if let Some(last) = self.last_fired {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.interval {
                return Poll::TooSoon(self.interval - elapsed);
            }
        }
        self.fired += 1;
        self.last_fired = Some(now);
        tracing::debug!(
            patient_id = self.alert.patient_id,
            fired = self.fired,
            max_repeats = self.max_repeats,
            "Repeated alert fired",
        );
        Poll::Fire(self.fired)
    }

    pub fn message(&self) -> String {
        format!(
            "{} [REPEATED: {}/{} times]",
            format_message(&self.alert),
            self.fired,
            self.max_repeats
        )
    }

    pub fn fired(&self) -> u32 {
        self.fired
    }

    pub fn max_repeats(&self) -> u32 {
        self.max_repeats
    }

    pub fn is_completed(&self) -> bool {
        self.fired >= self.max_repeats
    }

    pub fn reset(&mut self) {
        self.fired = 0;
        self.last_fired = None;
    }

    /// Time until the next repetition may fire; zero before the first firing
    /// and once completed.
    pub fn time_until_next(&self, now: Instant) -> Duration {
        match self.last_fired {
            Some(last) if !self.is_completed() => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn alert() -> Alert {
        Alert::new(7, "High Heart Rate: 130.0 bpm", 1_000).with_severity(AlertSeverity::High)
    }

    #[test]
    fn base_message_format() {
        assert_eq!(
            format_message(&alert()),
            "Patient 7: High Heart Rate: 130.0 bpm (Time: 1000)"
        );
    }

    #[test]
    fn priority_suffix_and_flags() {
        let mut p = PrioritizedAlert::new(alert(), AlertSeverity::High, "tachycardia");
        assert_eq!(
            p.message(),
            "Patient 7: High Heart Rate: 130.0 bpm (Time: 1000) [PRIORITY: HIGH - tachycardia]"
        );
        assert!(p.is_high_priority());
        assert!(!p.is_critical());

        p.reprioritize(AlertSeverity::Critical, "sustained");
        assert!(p.is_critical());
        assert!(p.message().ends_with("[PRIORITY: CRITICAL - sustained]"));

        p.reprioritize(AlertSeverity::Low, "resolved");
        assert!(!p.is_high_priority());
    }

    #[test]
    fn priority_defaults_to_alert_severity() {
        let p = PrioritizedAlert::from_severity(alert(), "auto");
        assert_eq!(p.level(), AlertSeverity::High);

        let plain = PrioritizedAlert::from_severity(Alert::new(1, "x", 0), "auto");
        assert_eq!(plain.level(), AlertSeverity::Medium);
    }

    #[test]
    fn repeat_respects_interval_and_bound() {
        let start = Instant::now();
        let interval = Duration::from_secs(30);
        let mut schedule = RepeatSchedule::new(alert(), 2, interval);

        assert_eq!(schedule.time_until_next(start), Duration::ZERO);
        assert_eq!(schedule.poll(start), Poll::Fire(1));
        assert!(schedule.message().ends_with("[REPEATED: 1/2 times]"));

        let early = start + Duration::from_secs(10);
        assert_eq!(schedule.poll(early), Poll::TooSoon(Duration::from_secs(20)));
        assert_eq!(schedule.time_until_next(early), Duration::from_secs(20));

        assert_eq!(schedule.poll(start + interval), Poll::Fire(2));
        assert!(schedule.is_completed());
        assert_matches!(schedule.poll(start + interval * 5), Poll::Completed);
        assert_eq!(schedule.time_until_next(start + interval), Duration::ZERO);
        assert!(schedule.message().ends_with("[REPEATED: 2/2 times]"));
    }

    #[test]
    fn reset_starts_over() {
        let start = Instant::now();
        let mut schedule = RepeatSchedule::new(alert(), 1, Duration::from_secs(5));
        assert_eq!(schedule.poll(start), Poll::Fire(1));
        assert_eq!(schedule.poll(start), Poll::Completed);

        schedule.reset();
        assert_eq!(schedule.fired(), 0);
        assert_eq!(schedule.poll(start), Poll::Fire(1));
    }

    #[test]
    fn zero_repeats_never_fires() {
        let mut schedule = RepeatSchedule::new(alert(), 0, Duration::from_secs(1));
        assert_eq!(schedule.poll(Instant::now()), Poll::Completed);
    }
}
