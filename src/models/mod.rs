pub mod todo;
pub mod token;
pub mod user;

use uuid::Uuid;

/// Parse a document id taken from a path or a token. Anything that is not a
/// UUID cannot name a stored document.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

/// Trim a string field in place, keeping `None` as `None`.
pub(crate) fn trim_field(field: &mut Option<String>) {
    if let Some(value) = field.as_mut() {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }
}
