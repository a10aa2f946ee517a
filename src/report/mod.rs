//! Clinical report schema: typed model, permissive coercion, and structural
//! validation of model-produced JSON.

pub mod coerce;
pub mod types;
pub mod validate;

pub use coerce::coerce_report;
pub use types::*;
pub use validate::validate_report;
