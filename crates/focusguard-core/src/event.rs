//! Behavioral events: what unproductive activity was observed, how severe it
//! is, and for how long it has been going on.
//!
//! Events are produced by an external activity analyzer and treated as
//! immutable values by the rest of the pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Medium severity triggers once observed for longer than this.
pub const MEDIUM_TRIGGER_SECONDS: f64 = 30.0;

/// Low severity triggers once observed for longer than this.
pub const LOW_TRIGGER_SECONDS: f64 = 120.0;

/// Kind of unproductive activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Endless feed scrolling
    ScrollLoop,
    /// Content that is never negotiable
    AdultContent,
    /// A site on the user's distraction list
    DistractionSite,
    /// Anything else the analyzer flags
    Other,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::ScrollLoop => "scroll_loop",
            EventType::AdultContent => "adult_content",
            EventType::DistractionSite => "distraction_site",
            EventType::Other => "other",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "scroll_loop" | "scroll" => Ok(EventType::ScrollLoop),
            "adult_content" | "adult" => Ok(EventType::AdultContent),
            "distraction_site" | "distraction" => Ok(EventType::DistractionSite),
            "other" => Ok(EventType::Other),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// What the activity is happening on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub process_name: Option<String>,
}

impl Target {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            process_name: None,
        }
    }

    pub fn process(name: impl Into<String>) -> Self {
        Self {
            url: None,
            process_name: Some(name.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.process_name.is_none()
    }

    /// Short human-readable name: the url host when it parses, otherwise the
    /// raw url, otherwise the process name.
    pub fn display_name(&self) -> String {
        if let Some(ref raw) = self.url {
            return url::Url::parse(raw)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
                .unwrap_or_else(|| raw.clone());
        }
        self.process_name
            .clone()
            .unwrap_or_else(|| "this".to_string())
    }
}

/// A timestamped observation of unproductive activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralEvent {
    pub event_type: EventType,
    pub severity: Severity,
    #[serde(default)]
    pub target: Target,
    /// Contiguous observation time, never negative.
    pub duration_seconds: f64,
    #[serde(default = "chrono::Utc::now")]
    pub detected_at: DateTime<Utc>,
    /// Free-form analyzer context. Only ever checked for presence.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl BehavioralEvent {
    pub fn new(
        event_type: EventType,
        severity: Severity,
        target: Target,
        duration_seconds: f64,
    ) -> Self {
        Self {
            event_type,
            severity,
            target,
            duration_seconds: if duration_seconds.is_finite() {
                duration_seconds.max(0.0)
            } else {
                0.0
            },
            detected_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_detected_at(mut self, at: DateTime<Utc>) -> Self {
        self.detected_at = at;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The interruption policy table.
    ///
    /// High always triggers; Medium after more than 30s; Low after more
    /// than 120s.
    pub fn should_trigger_intervention(&self) -> bool {
        match self.severity {
            Severity::High => true,
            Severity::Medium => self.duration_seconds > MEDIUM_TRIGGER_SECONDS,
            Severity::Low => self.duration_seconds > LOW_TRIGGER_SECONDS,
        }
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds / 60.0
    }

    /// String metadata lookup, e.g. the site `category`.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(severity: Severity, secs: f64) -> BehavioralEvent {
        BehavioralEvent::new(EventType::Other, severity, Target::url("https://example.com"), secs)
    }

    #[test]
    fn high_severity_always_triggers() {
        assert!(event(Severity::High, 0.0).should_trigger_intervention());
    }

    #[test]
    fn medium_threshold_is_strict() {
        assert!(!event(Severity::Medium, 29.9).should_trigger_intervention());
        assert!(!event(Severity::Medium, 30.0).should_trigger_intervention());
        assert!(event(Severity::Medium, 30.1).should_trigger_intervention());
    }

    #[test]
    fn low_threshold_is_strict() {
        assert!(!event(Severity::Low, 120.0).should_trigger_intervention());
        assert!(event(Severity::Low, 120.5).should_trigger_intervention());
    }

    #[test]
    fn negative_duration_is_clamped() {
        assert_eq!(event(Severity::Low, -5.0).duration_seconds, 0.0);
    }

    #[test]
    fn display_name_prefers_url_host() {
        let t = Target::url("https://www.reddit.com/r/rust");
        assert_eq!(t.display_name(), "reddit.com");
        assert_eq!(Target::url("reddit.com").display_name(), "reddit.com");
        assert_eq!(Target::process("steam").display_name(), "steam");
    }

    #[test]
    fn event_deserializes_with_defaults() {
        let json = r#"{"event_type":"scroll_loop","severity":"medium","duration_seconds":180,
                       "target":{"url":"https://reddit.com"}}"#;
        let e: BehavioralEvent = serde_json::from_str(json).unwrap();
        assert_eq!(e.event_type, EventType::ScrollLoop);
        assert_eq!(e.severity, Severity::Medium);
        assert!(e.metadata.is_empty());
        assert!(e.target.process_name.is_none());
    }

    #[test]
    fn parses_cli_style_names() {
        assert_eq!("distraction-site".parse::<EventType>().unwrap(), EventType::DistractionSite);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("bogus".parse::<EventType>().is_err());
    }
}
