//! URL handling module for Sumi-Inquiry
//!
//! This module decides which links may enter the crawl frontier: start URL
//! parsing, origin derivation, fragment stripping, and the eligibility policy.

mod normalize;
mod origin;
mod policy;

// Re-export main functions
pub use normalize::{strip_fragment, visit_key};
pub use origin::{base_origin, parse_start_url};
pub use policy::{eligible_link, is_eligible};
