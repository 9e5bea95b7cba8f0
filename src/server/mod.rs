//! HTTP wiring
//!
//! Assembles an axum router from registered resource descriptors, with the
//! trace and CORS layers applied server-wide.

pub mod builder;
pub mod querystring;
pub mod router;

pub use builder::ServerBuilder;
