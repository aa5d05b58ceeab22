//! Convert a session page URL into the shareable join URL.

const SESSION_SEGMENT: &str = "/session/";
const JOIN_SEGMENT: &str = "/join/";

/// Replace the first `/session/` segment of `url` with `/join/`.
///
/// URLs without the segment are returned unchanged.
pub fn join_link(url: &str) -> String {
    url.replacen(SESSION_SEGMENT, JOIN_SEGMENT, 1)
}
