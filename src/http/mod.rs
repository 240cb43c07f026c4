//! HTTP client collaborator
//!
//! The trait the executor depends on, plus the reqwest-backed implementation.

pub mod client;
mod reqwest_client;

pub use client::{HttpClient, HttpRequest, HttpResponse, Method};
pub use reqwest_client::ReqwestClient;
