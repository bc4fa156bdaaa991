// mash-net/src/lib.rs
pub mod http;
pub mod validation;

// Re-export the public fetching and validation functions
pub use http::fetch_formula_source;
pub use validation::{compute_sha256, validate_url, verify_checksum};
