pub mod replay;
mod traits;

pub use replay::{ReplayAnalyzer, ReplayScript, ReplayStep};
pub use traits::{ActivityAnalyzer, BrowserController, InterventionCallback};
