/// Splits a request path into the shortlink name and the remaining suffix.
///
/// `/j/JIRA-000` becomes `("j", "JIRA-000")`; a path with no further
/// segments yields an empty suffix. Trailing slashes inside the suffix are
/// preserved.
pub fn split(path: &str) -> (&str, &str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.split_once('/') {
        Some((name, suffix)) => (name, suffix),
        None => (trimmed, ""),
    }
}
