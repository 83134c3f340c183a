//! # agentlaw coherence
//!
//! Consistency between alternative renderings of one artifact. A `Sheaf`
//! groups named `View`s of a canonical value with a `glue` that rebuilds the
//! value from renderings; `check` then holds complete views to exact
//! round-trips and lossy views to non-contradiction.
//!
//! Semantic closeness of lossy renderings is delegated to a
//! `SemanticDistance`, so callers can plug in their own metric.

pub mod check;
pub mod config;
pub mod distance;
pub mod error;
pub mod sheaf;
pub mod view;

pub use check::{Checker, CoherenceResult, Conflict, check, entails};
pub use config::CoherenceConfig;
pub use distance::{ExactDistance, SemanticDistance, TokenOverlapDistance};
pub use error::SheafError;
pub use sheaf::{Renderings, Sheaf, make_sheaf};
pub use view::{View, make_view};
