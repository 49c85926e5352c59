//! Utility functions shared by the feed layer and the CLI.
//!
//! - **URL validation**: feed addresses must be absolute http(s) URLs
//! - **Text processing**: control-character stripping, snippets, and
//!   width-aware truncation for terminal output

mod text;
mod url_validator;

pub use text::{display_width, make_snippet, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_url, UrlValidationError};
