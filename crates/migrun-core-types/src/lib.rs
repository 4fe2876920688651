//! Core types shared across migrun crates
//!
//! - **Correlation**: `RunId` stamps every log line of one CLI invocation
//! - **Sensitive data**: `Sensitive<T>` marker for automatic redaction
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::RunId;
pub use sensitive::Sensitive;
