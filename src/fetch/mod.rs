pub mod backoff;
pub mod client;
pub mod transport;

pub use client::FetchClient;
pub use transport::{HttpRequest, ReqwestTransport, Transport};
