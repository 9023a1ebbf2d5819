//! Sources module
//!
//! Token providers the request pipeline can draw bearer tokens from.

pub mod fetch;
pub mod http;

pub use self::fetch::{TokenOptions, TokenProvider};
pub use self::http::HttpTokenProvider;
