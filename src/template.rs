//! Placeholder interpolation for YAML configs
//!
//! Handles `{{ env.NAME }}` placeholders so secrets such as client
//! credentials can stay out of the config file. Substitution happens on the
//! raw text before it is parsed.

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Regex for matching placeholders: {{ namespace.name }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\.([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}").unwrap()
});

/// The only namespace placeholders may use
const ENV_NAMESPACE: &str = "env";

/// Render `{{ env.NAME }}` placeholders from the process environment
pub fn render_env(template: &str) -> Result<String> {
    render_with(template, |name| std::env::var(name).ok())
}

/// Render `{{ env.NAME }}` placeholders using `lookup` to resolve names.
///
/// Every undefined variable is reported in a single error.
pub fn render_with<F>(template: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();
    let mut unsupported = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |cap: &Captures<'_>| {
        let namespace = &cap[1];
        let name = &cap[2];

        if namespace != ENV_NAMESPACE {
            unsupported.push(format!("{namespace}.{name}"));
            return cap[0].to_string();
        }

        match lookup(name) {
            Some(value) => value,
            None => {
                missing.push(format!("{ENV_NAMESPACE}.{name}"));
                cap[0].to_string()
            }
        }
    });

    if !unsupported.is_empty() {
        return Err(Error::template(format!(
            "unsupported placeholder(s) {}; only '{{{{ env.NAME }}}}' is available",
            unsupported.join(", ")
        )));
    }

    if !missing.is_empty() {
        return Err(Error::undefined_var(missing.join(", ")));
    }

    Ok(rendered.into_owned())
}

/// Check if a string contains placeholders
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all placeholder paths from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| format!("{}.{}", &cap[1], &cap[2]))
        .collect()
}
