//! Tracing/logging setup shared by storeops binaries.

/// Initialize process-wide observability with the `info` default level.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Tracing configuration (filters, formats).
pub mod tracing;
