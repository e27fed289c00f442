// Application Layer - dispatch, discrimination, validation

pub mod dispatch;
pub mod discriminate;
pub mod validate;

pub use dispatch::Dispatcher;
pub use discriminate::{discriminate, Outcome};
pub use validate::{validate_language, FalseNegative, FalsePositive, ValidationReport};
