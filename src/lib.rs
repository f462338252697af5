// envtenant - multi-tenant resolution for Rust
//
// Resolves the tenant behind an HTTP request or console command and runs the
// work against that tenant's database connection and table prefix.

// Re-export core functionality
pub use envtenant_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use envtenant_config;

#[cfg(feature = "events")]
pub use envtenant_events;

#[cfg(feature = "log")]
pub use envtenant_log;
