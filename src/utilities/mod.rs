//! Configuration, errors, schemas, output coercion and templating.

pub mod config;
pub mod converter;
pub mod errors;
pub mod schema;
pub mod string_utils;
