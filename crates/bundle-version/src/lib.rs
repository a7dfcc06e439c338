//! The version of the bundle subsystem crate family.

/// The current version of the bundle format and tooling, as recorded in
/// `Cargo.toml`.
pub const BUNDLE_VERSION: &str = env!("CARGO_PKG_VERSION");
