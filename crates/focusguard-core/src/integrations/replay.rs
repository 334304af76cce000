//! Scripted activity replay.
//!
//! A replay script is a JSON-lines file. Each non-empty line that does not
//! start with `#` is one step:
//!
//! ```text
//! {"activity": {"event_type": "scroll_loop", "severity": "medium", "duration_seconds": 400,
//!               "target": {"url": "https://reddit.com"}}}
//! {"reply": "10 minutes"}
//! {"advance_secs": 600}
//! {"activity": null}
//! ```
//!
//! Steps run against a [`Monitor`] on a simulated clock, so a script
//! covering an hour of activity replays instantly.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::ActivityAnalyzer;
use crate::error::{CoreError, Result};
use crate::event::BehavioralEvent;
use crate::events::Event;
use crate::monitor::Monitor;

/// Longest single `advance_secs` step: one week.
pub const MAX_ADVANCE_SECS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStep {
    /// Replace the current activity (`null` = nothing unproductive) and tick.
    Activity(Option<BehavioralEvent>),
    /// Answer the open negotiation.
    Reply(String),
    /// Let simulated time pass, ticking at the monitor's interval.
    AdvanceSecs(f64),
}

/// Span of an `advance_secs` step.
fn advance_span(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || !(0.0..=MAX_ADVANCE_SECS).contains(&secs) {
        return Err(CoreError::invalid_value(
            "advance_secs",
            format!("must be between 0 and {MAX_ADVANCE_SECS}, got {secs}"),
        ));
    }
    Duration::try_milliseconds((secs * 1000.0).round() as i64)
        .ok_or_else(|| CoreError::invalid_value("advance_secs", format!("{secs} is out of range")))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayScript {
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    /// Parse a JSON-lines script.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` naming the first line that is not a valid step,
    /// including `advance_secs` values that are negative or longer than a week.
    pub fn parse(input: &str) -> Result<Self> {
        let mut steps = Vec::new();
        for (idx, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let step = serde_json::from_str::<ReplayStep>(line).map_err(|e| {
                CoreError::invalid_value(format!("line {}", idx + 1), e.to_string())
            })?;
            if let ReplayStep::AdvanceSecs(secs) = step {
                advance_span(secs).map_err(|e| {
                    CoreError::invalid_value(format!("line {}", idx + 1), e.to_string())
                })?;
            }
            steps.push(step);
        }
        Ok(Self { steps })
    }
}

/// Analyzer reporting whatever activity the script last set.
#[derive(Debug, Clone, Default)]
pub struct ReplayAnalyzer {
    current: Option<BehavioralEvent>,
}

impl ReplayAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_activity(&mut self, event: Option<BehavioralEvent>) {
        self.current = event;
    }
}

impl ActivityAnalyzer for ReplayAnalyzer {
    fn analyze_current_activity(&mut self) -> Option<BehavioralEvent> {
        self.current.clone()
    }
}

/// Drives a monitor through a script starting at `start`.
///
/// Returns every event emitted, in order, and the simulated end time.
///
/// # Errors
///
/// Fails when a `reply` step arrives while no negotiation is open, or when an
/// `advance_secs` step is out of range or would move past the last
/// representable instant.
pub fn run_script(
    script: &ReplayScript,
    monitor: &mut Monitor<ReplayAnalyzer>,
    start: DateTime<Utc>,
) -> Result<(Vec<Event>, DateTime<Utc>)> {
    let tick = monitor.tick_interval();
    let mut now = start;
    let mut emitted = Vec::new();

    for step in &script.steps {
        match step {
            ReplayStep::Activity(activity) => {
                monitor
                    .analyzer_mut()
                    .set_activity(activity.clone().map(|e| e.with_detected_at(now)));
                emitted.extend(monitor.tick_at(now));
            }
            ReplayStep::Reply(text) => {
                emitted.extend(monitor.submit_reply_at(text, now)?);
            }
            ReplayStep::AdvanceSecs(secs) => {
                let end = now.checked_add_signed(advance_span(*secs)?).ok_or_else(|| {
                    CoreError::invalid_value("advance_secs", format!("{secs} passes the end of time"))
                })?;
                while now < end {
                    now = now.checked_add_signed(tick).map_or(end, |t| t.min(end));
                    emitted.extend(monitor.tick_at(now));
                }
                debug!(at = %now, "replay advanced");
            }
        }
    }

    Ok((emitted, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    #[test]
    fn parses_steps_and_skips_comments() {
        let script = ReplayScript::parse(
            r#"
            # a distraction
            {"activity": {"event_type": "distraction_site", "severity": "medium", "duration_seconds": 40, "target": {"url": "https://youtube.com"}}}
            {"reply": "5 minutes"}

            {"advance_secs": 300}
            {"activity": null}
            "#,
        )
        .unwrap();
        assert_eq!(script.steps.len(), 4);
        match &script.steps[0] {
            ReplayStep::Activity(Some(e)) => assert_eq!(e.event_type, EventType::DistractionSite),
            other => panic!("unexpected step {other:?}"),
        }
        assert!(matches!(script.steps[3], ReplayStep::Activity(None)));
    }

    #[test]
    fn reports_bad_line_number() {
        let err = ReplayScript::parse("{\"reply\": \"ok\"}\n{\"bogus\": 1}").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn rejects_out_of_range_advance_on_parse() {
        let err = ReplayScript::parse("{\"reply\": \"ok\"}\n{\"advance_secs\": 1e18}").unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { .. }));
        assert!(err.to_string().contains("line 2"));
        assert!(ReplayScript::parse(r#"{"advance_secs": -5}"#).is_err());
        assert!(ReplayScript::parse(r#"{"advance_secs": 604800}"#).is_ok());
    }

    #[test]
    fn run_script_rejects_out_of_range_advance() {
        use crate::config::Config;

        let mut monitor = Monitor::new(ReplayAnalyzer::new(), &Config::default());
        let start = Utc::now();
        for secs in [1e18, f64::NAN, f64::INFINITY, -1.0] {
            let script = ReplayScript { steps: vec![ReplayStep::AdvanceSecs(secs)] };
            let err = run_script(&script, &mut monitor, start).unwrap_err();
            assert!(matches!(err, CoreError::InvalidValue { .. }), "{secs}");
        }

        let script = ReplayScript { steps: vec![ReplayStep::AdvanceSecs(60.0)] };
        let near_end = DateTime::<Utc>::MAX_UTC - Duration::seconds(10);
        assert!(run_script(&script, &mut monitor, near_end).is_err());
    }

    #[test]
    fn advance_ticks_up_to_the_exact_end() {
        use crate::config::Config;

        let mut monitor = Monitor::new(ReplayAnalyzer::new(), &Config::default());
        let start = Utc::now();
        let script = ReplayScript { steps: vec![ReplayStep::AdvanceSecs(12.5)] };
        let (_, end) = run_script(&script, &mut monitor, start).unwrap();
        assert_eq!(end, start + Duration::milliseconds(12_500));
    }

    #[test]
    fn analyzer_returns_last_activity() {
        let mut analyzer = ReplayAnalyzer::new();
        assert!(analyzer.analyze_current_activity().is_none());
        let e = BehavioralEvent::new(
            EventType::Other,
            crate::event::Severity::Low,
            Default::default(),
            1.0,
        );
        analyzer.set_activity(Some(e));
        assert!(analyzer.analyze_current_activity().is_some());
        assert!(analyzer.analyze_current_activity().is_some());
    }
}
