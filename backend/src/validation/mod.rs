//! Validation for request payloads.
//!
//! Payloads derive `Validate`; handlers call `validate()` before anything
//! reaches the signature services.

pub mod rules;

pub use validator::Validate;
