//! Common constants used throughout the Ritual engine.

/// Supported manifest file names, tried in order
pub const MANIFEST_FILES: [&str; 3] = ["ritual.json", "ritual.yml", "ritual.yaml"];

/// Directory under a recipe holding template sources
pub const TEMPLATES_DIR: &str = "templates";

/// Directory under a recipe holding static sources
pub const STATIC_DIR: &str = "static";

/// Marker redirecting a source to the shared template library
pub const SHARED_MARKER: &str = "_shared:";

/// Name of the shared template library directory, a sibling of the recipe
pub const SHARED_DIR: &str = "_shared";

/// Template file suffixes stripped from destination names
pub const TEMPLATE_SUFFIXES: [&str; 3] = [".tmpl", ".tpl", ".j2"];

/// Glob patterns never generated from directory sources
pub const DEFAULT_IGNORE_PATTERNS: [&str; 2] = ["**/.DS_Store", "**/.git/**"];

/// Prefix of environment variables imported into the variable store
pub const ENV_PREFIX: &str = "RITUAL_VAR_";

pub mod delimiters {
    pub const VARIABLE_START: &str = "[[";
    pub const VARIABLE_END: &str = "]]";
    pub const BLOCK_START: &str = "[%";
    pub const BLOCK_END: &str = "%]";
    pub const COMMENT_START: &str = "[#";
    pub const COMMENT_END: &str = "#]";
}
