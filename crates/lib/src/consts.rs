//! Well-known names and locations.

/// Configuration file looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "fab.config.json";

/// Output directory for `fab build`, relative to the config directory.
pub const DEFAULT_OUTPUT_DIR: &str = ".fab/build";

/// Scratch directory handed to hosting providers during `fab deploy`.
pub const DEFAULT_PACKAGE_DIR: &str = ".fab/deploy";

/// The single file allowed at the root of a compiled FAB.
pub const SERVER_ENTRY: &str = "/server.js";

/// Every other file must live under this prefix.
pub const ASSETS_ROOT: &str = "/_assets/";

/// Manifest written next to the compiled files.
pub const MANIFEST_FILENAME: &str = "fab.manifest.json";

/// Directory searched for bare plugin names, relative to the resolver base.
pub const MODULES_DIR: &str = "fab_modules";

/// Build plugin that moves stray files under the assets root.
pub const REWIRE_ASSETS_PLUGIN: &str = "@fab/rewire-assets";

pub const REWIRE_ASSETS_DOCS: &str = "https://fab.dev/packages/rewire-assets";

pub const DEPLOYING_DOCS: &str = "https://fab.dev/kb/deploying";
