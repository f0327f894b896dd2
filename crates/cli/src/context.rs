// FILE: crates/cli/src/context.rs
//! Shared setup: configuration, catalog and network collaborators

use anyhow::{Context, Result};
use clap::ArgMatches;
use media_engine::{ControllerConfig, SymphoniaProber};
use securgeek_config::{Config, ConfigManager};
use securgeek_core::Catalog;
use securgeek_network::{AssetResolver, Client, ClientConfig, HttpResourceValidator};
use std::path::PathBuf;

pub struct AppContext {
    pub manager: ConfigManager,
    pub config: Config,
    pub catalog_path: PathBuf,
}

impl AppContext {
    /// Resolves the config directory and catalog path from the global flags
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let manager = match matches.get_one::<PathBuf>("config-dir") {
            Some(dir) => ConfigManager::with_directory(dir.clone()),
            None => ConfigManager::new(),
        }
        .context("Failed to locate the configuration directory")?;

        let config = manager
            .load_with_env_overrides()
            .with_context(|| format!("Failed to load {}", manager.config_path().display()))?;

        let catalog_path = matches
            .get_one::<PathBuf>("catalog")
            .cloned()
            .unwrap_or_else(|| config.app.catalog_path.clone());

        Ok(Self {
            manager,
            config,
            catalog_path,
        })
    }

    pub fn load_catalog(&self) -> Result<Catalog> {
        Catalog::load(&self.catalog_path)
            .with_context(|| format!("Failed to load catalog {}", self.catalog_path.display()))
    }

    /// Streams run as long as the lesson, so only stalls are bounded
    pub fn client(&self) -> Result<Client> {
        Client::with_config(ClientConfig {
            timeout: None,
            connect_timeout: self.config.player.load_timeout(),
            read_timeout: Some(self.config.player.load_timeout()),
            ..Default::default()
        })
        .context("Failed to build HTTP client")
    }

    pub fn resolver(&self) -> Result<AssetResolver> {
        AssetResolver::from_setting(self.config.player.asset_base_url.as_deref())
            .context("Invalid player.asset_base_url")
    }

    pub fn validator(&self) -> Result<HttpResourceValidator> {
        Ok(HttpResourceValidator::new(self.client()?, self.resolver()?))
    }

    pub fn prober(&self) -> Result<SymphoniaProber> {
        Ok(SymphoniaProber::new(
            self.client()?,
            self.resolver()?,
            self.config.player.probe_timeout(),
        ))
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            load_timeout: self.config.player.load_timeout(),
            initial_volume: self.config.player.volume_gain(),
            autoplay: self.config.player.autoplay,
        }
    }
}
