// crates/network/src/lib.rs
//! Network access for lesson assets: HTTP client, URL resolution and the
//! resource validator used to gate playback.

mod client;
mod error;
mod resolver;
mod validator;

pub use client::{Client, ClientConfig, RangedResponse};
pub use error::{NetworkError, NetworkResult};
pub use resolver::AssetResolver;
pub use reqwest::Url;
pub use validator::{HttpResourceValidator, ResourceValidator};
