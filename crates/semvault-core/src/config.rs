//! Settings loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `semvault.toml`,
//! `semvault.<env>.toml` and `SEMVAULT_*` env vars (nested keys split on `__`).
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub const ENV_PREFIX: &str = "SEMVAULT_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySettings {
    pub top_k: usize,
}

impl Default for QuerySettings {
    fn default() -> Self { Self { top_k: 5 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self { Self { table: "chunks".to_string() } }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedSettings {
    pub model_dir: Option<String>,
    pub use_fake: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub registry_path: String,
    pub chunking: ChunkingConfig,
    pub query: QuerySettings,
    pub store: StoreSettings,
    pub embed: EmbedSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_path: "~/.semvault/config.json".to_string(),
            chunking: ChunkingConfig::default(),
            query: QuerySettings::default(),
            store: StoreSettings::default(),
            embed: EmbedSettings::default(),
        }
    }
}

impl Settings {
    pub fn figment() -> Figment {
        let env_name = env::var("SEMVAULT_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("semvault.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("semvault.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("semvault.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("semvault.test.toml")),
            _ => {}
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self> {
        Self::from_figment(&Self::figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.step()?;
        if self.query.top_k == 0 {
            return Err(Error::InvalidConfig("query.top_k must be > 0".into()));
        }
        Ok(())
    }

    pub fn registry_path(&self) -> PathBuf { expand_path(&self.registry_path) }

}

/// Expand `~` and `${VAR}` in a configured path. No canonicalization.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    PathBuf::from(shellexpand::tilde(&expanded_env).as_ref())
}
