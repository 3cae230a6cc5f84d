//! Download filename derivation.

use crate::models::PublicationInfo;

/// Substituted when nothing survives sanitizing.
pub const FALLBACK_NAME: &str = "document";

/// Keep alphanumerics, `-`, `_`, `.` and space; drop everything else and
/// trim surrounding whitespace. Never returns an empty string.
pub fn sanitize(candidate: &str) -> String {
    let kept: String = candidate
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
        .collect();

    let trimmed = kept.trim();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `DOF_{date}_{type}_file{id}`, sanitized. Identical inputs always give
/// identical names, so repeated downloads of a file keep their name.
pub fn base_name(publication: &PublicationInfo, file_id: i64) -> String {
    sanitize(&format!(
        "DOF_{}_{}_file{}",
        publication.date, publication.publication_type, file_id
    ))
}
