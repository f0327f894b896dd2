// crates/network/src/resolver.rs
//! Resolution of catalog resource locators to absolute URLs

use crate::error::{NetworkError, NetworkResult};
use reqwest::Url;

/// Resolves root-relative asset paths (e.g. `/audios/1.1.mp3`) against a base URL.
/// Absolute `http(s)` URLs pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct AssetResolver {
    base: Option<Url>,
}

impl AssetResolver {
    /// Resolver that only accepts absolute URLs
    pub fn absolute_only() -> Self {
        Self { base: None }
    }

    pub fn with_base(base: &str) -> NetworkResult<Self> {
        let base = Url::parse(base).map_err(|e| NetworkError::InvalidUrl(format!("{base}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(NetworkError::InvalidUrl(format!("{base} cannot be a base URL")));
        }
        Ok(Self { base: Some(base) })
    }

    /// Builds a resolver from an optional, possibly empty, base URL setting
    pub fn from_setting(base: Option<&str>) -> NetworkResult<Self> {
        match base.map(str::trim).filter(|b| !b.is_empty()) {
            Some(b) => Self::with_base(b),
            None => Ok(Self::absolute_only()),
        }
    }

    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    pub fn resolve(&self, locator: &str) -> NetworkResult<Url> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(NetworkError::InvalidUrl("empty resource locator".to_string()));
        }

        match Url::parse(locator) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            Ok(url) => Err(NetworkError::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                locator
            ))),
            Err(_) => {
                let base = self.base.as_ref().ok_or_else(|| {
                    NetworkError::InvalidUrl(format!("relative locator {locator} without base URL"))
                })?;
                base.join(locator)
                    .map_err(|e| NetworkError::InvalidUrl(format!("{locator}: {e}")))
            }
        }
    }
}
