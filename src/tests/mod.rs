pub mod common;

mod authenticated_fetch_and_retry;
mod identity_and_version_http;
