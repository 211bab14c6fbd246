//! Agent definitions and their configuration loader.

pub mod core;

pub use self::core::AgentSpec;
