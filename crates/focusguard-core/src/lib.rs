//! # FocusGuard Core Library
//!
//! This library provides the core logic for FocusGuard, a digital-wellbeing
//! counselor that watches for unhealthy activity, negotiates a time limit with
//! the user, and enforces it when the time is up. All operations are available
//! through the standalone CLI binary; any GUI is a thin layer over the same
//! core library.
//!
//! ## Architecture
//!
//! - **Intervention gate**: decides whether a detected behavior deserves an
//!   intervention, with a global cooldown
//! - **Negotiation**: a multi-round dialogue that ends in a time-bound
//!   agreement
//! - **Compliance**: watches active agreements for warnings, expiry, and
//!   violations
//! - **Enforcement**: closes the offending target after a grace period
//! - **Monitor**: a wall-clock polling loop that requires the caller to
//!   periodically invoke `tick()`
//!
//! ## Key Components
//!
//! - [`Monitor`]: The tick loop driving the whole pipeline
//! - [`NegotiationEngine`]: Dialogue state machine
//! - [`ComplianceTracker`]: Agreement bookkeeping
//! - [`Config`]: Application configuration management
//! - [`ActivityAnalyzer`], [`BrowserController`]: Traits for collaborators

pub mod agreement;
pub mod compliance;
pub mod config;
pub mod enforcement;
pub mod error;
pub mod event;
pub mod events;
pub mod integrations;
pub mod intervention;
pub mod monitor;
pub mod negotiation;

pub use agreement::Agreement;
pub use compliance::{ComplianceHandler, ComplianceReport, ComplianceTracker};
pub use config::Config;
pub use enforcement::{EnforcementEngine, EnforcementHandler};
pub use error::{ConfigError, CoreError};
pub use event::{BehavioralEvent, EventType, Severity, Target};
pub use events::Event;
pub use integrations::{
    ActivityAnalyzer, BrowserController, InterventionCallback, ReplayAnalyzer, ReplayScript,
};
pub use intervention::{InterventionGate, InterventionStrategy, StrategyKind, Urgency};
pub use monitor::Monitor;
pub use negotiation::{NegotiationEngine, NegotiationOutcome, NegotiationState};
