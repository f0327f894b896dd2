// crates/network/src/validator.rs
//! Audio resource validation
//!
//! A metadata-only existence check run before the player commits to opening
//! a handle on a resource.

use crate::client::Client;
use crate::resolver::AssetResolver;
use async_trait::async_trait;

/// Predicate confirming a resource is reachable.
///
/// Implementations never fail: any transport problem is reported as `false`.
#[async_trait]
pub trait ResourceValidator: Send + Sync {
    async fn validate(&self, resource_url: &str) -> bool;
}

/// Validator issuing an HTTP HEAD for the resolved resource URL
#[derive(Clone)]
pub struct HttpResourceValidator {
    client: Client,
    resolver: AssetResolver,
}

impl HttpResourceValidator {
    pub fn new(client: Client, resolver: AssetResolver) -> Self {
        Self { client, resolver }
    }
}

#[async_trait]
impl ResourceValidator for HttpResourceValidator {
    async fn validate(&self, resource_url: &str) -> bool {
        let url = match self.resolver.resolve(resource_url) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Cannot validate {}: {}", resource_url, e);
                return false;
            }
        };

        match self.client.head(&url).await {
            Ok(response) => {
                log::debug!("Resource {} reachable ({})", url, response.status());
                true
            }
            Err(e) => {
                log::warn!("Resource {} failed validation: {}", url, e);
                false
            }
        }
    }
}
