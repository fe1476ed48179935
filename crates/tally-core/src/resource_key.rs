//! Canonical permission keys for HTTP endpoints.
//!
//! A key has the shape `"<METHOD> - <path>"` where every path parameter
//! segment is replaced with `:var`, so `/user/:uuid` and `/user/:id`
//! share one key.

/// Placeholder every path parameter collapses to.
pub const PARAM_PLACEHOLDER: &str = ":var";

/// Build the permission key for `method` + `route_template`.
///
/// The path gets a leading `/` if missing and loses exactly one trailing
/// `/`. Segments written as `:name`, `*name` or `{name}` count as path
/// parameters.
pub fn normalize(method: &str, route_template: &str) -> String {
    let mut path = String::with_capacity(route_template.len() + 1);
    if !route_template.starts_with('/') {
        path.push('/');
    }
    path.push_str(route_template);
    // The root route keeps its slash; `"GET - "` would name no path at all.
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    let mut key = String::with_capacity(method.len() + path.len() + 3);
    key.push_str(method);
    key.push_str(" - ");
    for (i, segment) in path.split('/').enumerate() {
        if i > 0 {
            key.push('/');
        }
        if is_param_segment(segment) {
            key.push_str(PARAM_PLACEHOLDER);
        } else {
            key.push_str(segment);
        }
    }
    key
}

fn is_param_segment(segment: &str) -> bool {
    segment.len() > 1
        && (segment.starts_with(':')
            || segment.starts_with('*')
            || (segment.starts_with('{') && segment.ends_with('}')))
}
