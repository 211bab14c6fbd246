//! Prompt template interpolation.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utilities::errors::ConfigError;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").expect("valid variable pattern"));

/// Names of the `{variable}` placeholders in `template`, in order of appearance.
pub fn template_variables(template: &str) -> Vec<String> {
    VARIABLE_PATTERN
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Interpolate `{variable}` placeholders while leaving JSON braces untouched.
///
/// Only placeholders whose name starts with a letter or underscore and
/// contains alphanumerics, underscores or hyphens are replaced. With no
/// inputs at all the template is returned unchanged; otherwise every
/// placeholder must have a value.
///
/// `key` names the configuration entry being interpolated, for the error.
pub fn interpolate_only(
    template: &str,
    inputs: &HashMap<String, String>,
    key: &str,
) -> Result<String, ConfigError> {
    if inputs.is_empty() || !template.contains('{') {
        return Ok(template.to_string());
    }

    if let Some(missing) = template_variables(template)
        .into_iter()
        .find(|v| !inputs.contains_key(v))
    {
        return Err(ConfigError::MissingInput {
            key: key.to_string(),
            variable: missing,
        });
    }

    let result = VARIABLE_PATTERN.replace_all(template, |cap: &regex::Captures<'_>| {
        inputs.get(&cap[1]).cloned().unwrap_or_default()
    });
    Ok(result.into_owned())
}
