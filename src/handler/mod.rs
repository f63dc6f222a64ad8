//! Request handler module
//!
//! Routes requests to the market snapshot and generation endpoints.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
