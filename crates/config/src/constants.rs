//! Hard limits and default values shared by the config sections
//!
//! Size limits are in bytes, durations in seconds.

pub const MIB: u64 = 1024 * 1024;

pub const MAX_ARCHIVE_BYTES: u64 = 50 * MIB;
pub const MAX_ENTRY_BYTES: u64 = 10 * MIB;
pub const MAX_ICON_BYTES: u64 = 5 * MIB;

pub const BLOCKED_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "scr", "msi", "dll", "sh", "bash", "ps1", "vbs", "vbe", "jse",
    "wsf", "wsh", "jar", "app", "deb", "rpm", "dmg", "pif", "cpl", "reg", "hta", "lnk", "so",
    "dylib",
];

pub const BUILD_TIMEOUT_SECS: u64 = 600;
pub const INSTALL_TIMEOUT_SECS: u64 = 300;
pub const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

pub const RETENTION_INTERVAL_SECS: u64 = 15 * 60;
pub const RETENTION_MAX_AGE_SECS: u64 = 2 * 60 * 60;

pub const MANIFEST_FILE: &str = "package.json";
pub const DEPENDENCY_DIR: &str = "node_modules";
pub const OUTPUT_DIR: &str = "dist";
pub const ARTIFACT_EXTENSION: &str = "exe";
pub const ESTIMATED_BUILD_TIME: &str = "2-5 minutes";

/// Marker written into a cache entry once its install finished
pub const CACHE_COMPLETE_MARKER: &str = ".complete";

pub const WORKSPACES_DIR: &str = "workspaces";
pub const OUTPUT_ROOT_DIR: &str = "output";
pub const CACHE_DIR: &str = "cache";
