//! Version details baked in at compile time.

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Abbreviated commit the binary was built from, or `unknown`.
pub const BUILD_HASH: &str = env!("BUILD_HASH");

const BUILD_DIRTY: &str = env!("BUILD_DIRTY");

/// Version with commit, e.g. `0.1.0 (abc1234)`; a trailing `*` marks
/// uncommitted changes.
#[must_use]
pub fn version_string() -> String {
    let dirty = if BUILD_DIRTY == "true" { "*" } else { "" };
    format!("{VERSION} ({BUILD_HASH}{dirty})")
}
