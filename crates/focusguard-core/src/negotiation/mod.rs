//! Multi-round negotiation of a time-bound agreement.
//!
//! [`duration`] reads a requested number of minutes out of free text,
//! [`policy`] decides what is reasonable for each event type, and
//! [`NegotiationEngine`] runs the dialogue.

pub mod duration;
mod engine;
pub mod policy;

pub use engine::{
    NegotiationEngine, NegotiationOutcome, NegotiationState, OpeningMessage, Resolution,
    DEFAULT_MAX_NEGOTIATION_ROUNDS,
};
