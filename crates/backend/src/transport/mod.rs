//! Transport layer for the backend client.

mod http;

pub use http::HttpTransport;
