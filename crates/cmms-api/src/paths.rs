// ── REST path helpers ──
//
// Screens name their endpoint either as `"/faenas/"` or as `"equipos"`.
// Both resolve to the same collection path relative to the API root, and
// item paths always carry the trailing slash the backend router expects.

use std::fmt::Display;

/// Normalise an endpoint name into a collection path: `faenas/`.
///
/// Leading slashes are stripped so the path joins onto the API base URL
/// instead of replacing its path.
pub fn collection_path(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{trimmed}/")
}

/// Path of a single item: `faenas/{id}/`.
///
/// The id is percent-encoded as one path segment, so a text key holding `/`
/// or `?` cannot address another route. An empty key stays an empty segment.
pub fn item_path(endpoint: &str, id: impl Display) -> String {
    let id = id.to_string();
    let segment = url::form_urlencoded::byte_serialize(id.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("{}{segment}/", collection_path(endpoint))
}
