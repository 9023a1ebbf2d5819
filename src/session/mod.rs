pub mod mirror;
pub mod token_session;
