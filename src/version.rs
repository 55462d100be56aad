//! Build metadata embedded by the build script.
//!
//! Values come from `vergen`; builds outside a git checkout report
//! `"unknown"` for the git fields.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// RFC 3339 build time, or "unknown".
pub const BUILD_TIMESTAMP: &str = match option_env!("VERGEN_BUILD_TIMESTAMP") {
    Some(ts) => ts,
    None => "unknown",
};

/// Whether the working tree had uncommitted changes at build time.
pub fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

fn short_sha() -> &'static str {
    &GIT_SHA[..7.min(GIT_SHA.len())]
}

/// `{version}+{branch}.{sha}`, with `.dirty` appended for dirty trees.
///
/// ```rust
/// let v = muninn::version::version_string();
/// assert!(v.starts_with(muninn::version::PKG_VERSION));
/// ```
pub fn version_string() -> String {
    let dirty = if git_dirty() { ".dirty" } else { "" };
    format!("{PKG_VERSION}+{GIT_BRANCH}.{}{dirty}", short_sha())
}

/// Multi-line report for `muninn version`.
pub fn build_report() -> String {
    format!(
        "muninn {}\nbuilt:    {BUILD_TIMESTAMP}\nfeatures: {}",
        version_string(),
        enabled_features().join(", ")
    )
}

/// Optional features compiled into this build.
pub fn enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();
    if cfg!(feature = "local-inference") {
        features.push("local-inference");
    }
    if cfg!(feature = "cuda") {
        features.push("cuda");
    }
    if cfg!(feature = "cli") {
        features.push("cli");
    }
    if features.is_empty() {
        features.push("none");
    }
    features
}
