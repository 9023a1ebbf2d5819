pub mod attempt;
pub mod executor;
pub mod request;

pub use self::executor::AuthenticatedClient;
pub use self::request::{ApiRequest, FormPart, RequestBody};
