//! Concrete model providers.

pub mod openai;
