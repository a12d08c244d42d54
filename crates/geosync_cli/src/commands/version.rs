//! Version command implementation.

/// Runs the version command.
pub fn run() {
    println!("GeoSync CLI v{}", env!("CARGO_PKG_VERSION"));
    println!("GeoSync Sync v{}", geosync_sync::VERSION);
}
