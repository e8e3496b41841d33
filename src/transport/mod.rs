pub mod auth;
pub mod http;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use auth::TokenAuth;
pub use http::HttpTransport;
pub use traits::{AuthProvider, Transport};
pub use types::{SendRequest, SendResponse, TransportError, TransportErrorKind};
