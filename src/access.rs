//! Zone classification and the role/zone routing decision.
//!
//! Everything here is pure: the same `(role, path)` pair always produces the same
//! `Decision`. The middleware in `auth` supplies the role from the session lookup.

use crate::models::Role;

/// Where unauthenticated visitors of a protected zone are sent.
pub const LOGIN_ROUTE: &str = "/login";

/// Zone
///
/// A path-prefix-defined region of the application reserved for one role.
/// Paths outside every zone are unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Student,
    Tutor,
    Admin,
}

impl Zone {
    /// The only role allowed to stay inside this zone.
    pub fn owner(self) -> Role {
        match self {
            Zone::Student => Role::Student,
            Zone::Tutor => Role::Tutor,
            Zone::Admin => Role::Admin,
        }
    }
}

/// ZONES
///
/// The single table of protected prefixes. The trigger surface (`is_protected`,
/// `matcher_patterns`) and the per-request classifier (`classify`) both read it.
pub const ZONES: &[(&str, Zone)] = &[
    ("/dashboard", Zone::Student),
    ("/tutor", Zone::Tutor),
    ("/admin", Zone::Admin),
];

/// Decision
///
/// Terminal outcome of the access router for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Let the request through untouched.
    Forward,
    /// Send the client to this path on the same origin.
    Redirect(&'static str),
}

/// classify
///
/// Maps a request path to its zone. A prefix only matches on a segment boundary:
/// `/tutor` and `/tutor/availability` are in the tutor zone, `/tutors` is not.
pub fn classify(path: &str) -> Option<Zone> {
    ZONES
        .iter()
        .find(|(prefix, _)| matches_prefix(path, prefix))
        .map(|&(_, zone)| zone)
}

/// Whether the access router runs for this path at all.
pub fn is_protected(path: &str) -> bool {
    classify(path).is_some()
}

/// matcher_patterns
///
/// The trigger surface in route-pattern form (`/dashboard`, `/dashboard/:path*`, ...),
/// used for startup logging and documentation.
pub fn matcher_patterns() -> Vec<String> {
    ZONES
        .iter()
        .flat_map(|(prefix, _)| [prefix.to_string(), format!("{prefix}/:path*")])
        .collect()
}

/// decide
///
/// Applies the access rules to a resolved role (or its absence) and a path:
/// - no role: redirect to `/login`;
/// - role visiting another role's zone: redirect to the role's home route;
/// - own zone or no zone: forward.
pub fn decide(role: Option<Role>, path: &str) -> Decision {
    let Some(role) = role else {
        return Decision::Redirect(LOGIN_ROUTE);
    };

    match classify(path) {
        Some(zone) if zone != role.zone() => Decision::Redirect(role.home_route()),
        _ => Decision::Forward,
    }
}

/// normalize_path
///
/// Canonical form of a request path, used both to classify and to forward, so the
/// gate and the page renderer always see the same path:
/// - percent-encoded unreserved characters are decoded (`%2e` is `.`, `%61` is `a`);
/// - `\` separates segments like `/`, and empty segments collapse;
/// - `.` segments are dropped and `..` removes the previous segment (never past the root);
/// - a trailing slash is kept.
pub fn normalize_path(raw: &str) -> String {
    let mut segments: Vec<String> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        let segment = decode_unreserved(segment);
        match segment.as_str() {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    if !segments.is_empty() && (raw.ends_with('/') || raw.ends_with('\\')) {
        path.push('/');
    }
    path
}

// Only unreserved characters are decoded; `%2F` and friends keep their meaning.
fn decode_unreserved(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(segment.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .filter(|&b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'));
            if let Some(byte) = decoded {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    // Only ASCII bytes were substituted, so the input's UTF-8 validity is preserved.
    String::from_utf8(out).unwrap_or_else(|_| segment.to_string())
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
