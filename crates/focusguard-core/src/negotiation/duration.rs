//! Coarse extraction of a requested duration from a free-text reply.
//!
//! Matchers are tried in a fixed order and the first hit wins:
//!
//! 1. `<number> minute(s) | min(s) | m`
//! 2. `<number> hour(s) | hr(s) | h`, times 60
//! 3. phrases: "half hour" -> 30, "quarter hour" -> 15, bare "hour" -> 60
//! 4. a bare integer in 1..=180, read as minutes
//!
//! Anything else is unspecified, which is not an error: the negotiation
//! re-prompts.

use once_cell::sync::Lazy;
use regex::Regex;

/// Largest bare number accepted as a minute count.
pub const MAX_BARE_MINUTES: u32 = 180;

static MINUTES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:minutes?|mins?|m)\b").expect("valid regex"));

static HOURS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:hours?|hrs?|h)\b").expect("valid regex"));

static BARE_INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").expect("valid regex"));

type Matcher = fn(&str) -> Option<f64>;

const MATCHERS: [(&str, Matcher); 4] = [
    ("minutes", match_minutes),
    ("hours", match_hours),
    ("phrase", match_phrase),
    ("bare_number", match_bare_number),
];

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn match_minutes(text: &str) -> Option<f64> {
    capture_number(&MINUTES_RE, text)
}

fn match_hours(text: &str) -> Option<f64> {
    capture_number(&HOURS_RE, text).map(|h| h * 60.0)
}

fn match_phrase(text: &str) -> Option<f64> {
    let lower = text.to_lowercase();
    if !lower.contains("hour") {
        return None;
    }
    if lower.contains("half") {
        Some(30.0)
    } else if lower.contains("quarter") {
        Some(15.0)
    } else {
        Some(60.0)
    }
}

fn match_bare_number(text: &str) -> Option<f64> {
    let n = BARE_INT_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())?;
    (1..=MAX_BARE_MINUTES).contains(&n).then_some(n as f64)
}

/// Requested minutes in `reply`, or `None` when unspecified.
pub fn parse_requested_minutes(reply: &str) -> Option<f64> {
    MATCHERS
        .iter()
        .find_map(|(_, matcher)| matcher(reply))
}

/// Like [`parse_requested_minutes`] but also names the matcher that fired.
pub fn parse_with_matcher(reply: &str) -> Option<(&'static str, f64)> {
    MATCHERS
        .iter()
        .find_map(|(name, matcher)| matcher(reply).map(|m| (*name, m)))
}

/// Render a quantity (minutes or seconds) for messages: whole numbers without decimals.
pub fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_forms() {
        assert_eq!(parse_requested_minutes("10 minutes"), Some(10.0));
        assert_eq!(parse_requested_minutes("just 1 minute please"), Some(1.0));
        assert_eq!(parse_requested_minutes("5 min"), Some(5.0));
        assert_eq!(parse_requested_minutes("15mins"), Some(15.0));
        assert_eq!(parse_requested_minutes("7m"), Some(7.0));
        assert_eq!(parse_requested_minutes("2.5 Minutes"), Some(2.5));
    }

    #[test]
    fn hour_forms() {
        assert_eq!(parse_requested_minutes("2 hours"), Some(120.0));
        assert_eq!(parse_requested_minutes("1 hr"), Some(60.0));
        assert_eq!(parse_requested_minutes("1.5h"), Some(90.0));
    }

    #[test]
    fn minutes_take_priority_over_hours() {
        assert_eq!(parse_requested_minutes("1 hour or maybe 20 minutes"), Some(20.0));
    }

    #[test]
    fn phrases() {
        assert_eq!(parse_requested_minutes("half hour"), Some(30.0));
        assert_eq!(parse_requested_minutes("half an hour?"), Some(30.0));
        assert_eq!(parse_requested_minutes("a quarter hour"), Some(15.0));
        assert_eq!(parse_requested_minutes("an hour"), Some(60.0));
    }

    #[test]
    fn bare_numbers_within_range() {
        assert_eq!(parse_requested_minutes("30"), Some(30.0));
        assert_eq!(parse_requested_minutes("give me 45"), Some(45.0));
        assert_eq!(parse_requested_minutes("180"), Some(180.0));
        assert_eq!(parse_requested_minutes("181"), None);
        assert_eq!(parse_requested_minutes("0"), None);
    }

    #[test]
    fn words_starting_with_m_are_not_minutes() {
        // "10 more" must not read as "10 m"; it falls through to the bare number.
        assert_eq!(parse_with_matcher("10 more"), Some(("bare_number", 10.0)));
    }

    #[test]
    fn unspecified_replies() {
        assert_eq!(parse_requested_minutes("whatever"), None);
        assert_eq!(parse_requested_minutes(""), None);
        assert_eq!(parse_requested_minutes("a little longer"), None);
    }

    #[test]
    fn formats_numbers() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(9.6), "9.6");
    }
}
