//! Experiment configuration record
//!
//! Typed schema, open values for driver-specific settings, and lazy typed
//! views over those settings.

pub mod schema;
pub mod value;
pub mod views;

pub use schema::*;
pub use value::{Number, ParamMap, ParamValue};
pub use views::DaqConfig;
