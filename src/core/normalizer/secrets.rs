//! Secret detection and masking.

use crate::core::config::SecretHandling;
use indexmap::IndexMap;
use serde_json::Value;

/// Environment variables carrying secrets must use this name prefix.
pub const SECRET_ENV_PREFIX: &str = "DBT_ENV_SECRET";

/// Sentinel written in place of a redacted value.
pub const REDACTED: &str = "REDACTED";

const SECRET_FIELD_MARKERS: &[&str] = &["password", "secret", "private_key", "passphrase"];

pub fn is_secret_variable(name: &str) -> bool {
    name.starts_with(SECRET_ENV_PREFIX)
}

/// Whether a connection detail field holds a credential.
pub fn is_secret_field(field: &str) -> bool {
    let field = field.to_ascii_lowercase();
    field == "token"
        || field.ends_with("_token")
        || SECRET_FIELD_MARKERS
            .iter()
            .any(|marker| field.contains(marker))
}

/// Masked replacement for a secret value, or `None` when it must be dropped.
pub fn mask(handling: SecretHandling, name: &str) -> Option<String> {
    match handling {
        SecretHandling::Redact => Some(REDACTED.to_string()),
        SecretHandling::Placeholder => Some(format!("${{var.{}}}", name.to_lowercase())),
        SecretHandling::Omit => None,
    }
}

/// Copy connection details with every secret field masked.
///
/// Under [`SecretHandling::Omit`] secret fields are removed, not blanked.
pub fn mask_details(
    details: &IndexMap<String, Value>,
    handling: SecretHandling,
) -> IndexMap<String, Value> {
    details
        .iter()
        .filter_map(|(field, value)| {
            if !is_secret_field(field) {
                return Some((field.clone(), value.clone()));
            }
            mask(handling, field).map(|masked| (field.clone(), Value::String(masked)))
        })
        .collect()
}
