//! Generation endpoint implementations

pub mod http;

pub use http::HttpGenerateClient;
