mod gate;

pub use gate::{
    InterventionAction, InterventionGate, InterventionRecord, InterventionStrategy, StrategyKind,
    Urgency, DEFAULT_COOLDOWN_SECONDS, DEFAULT_HISTORY_CAPACITY,
};
