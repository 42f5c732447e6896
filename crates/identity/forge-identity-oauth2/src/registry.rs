//! Assembling enabled providers from the host configuration.
//!
//! The host hands over one `[provider.<key>]` section per provider it wants
//! on the login screen; a family is enabled exactly when its section exists.
//! Any construction failure aborts startup: configuration errors must not
//! wait for the first login attempt to surface.

use crate::client::OAuth2Client;
use crate::config::ProviderSettings;
use crate::error::{OAuth2Error, OAuth2Result};
use crate::provider::OAuthLoginProvider;
use crate::providers::ProviderFamily;
use forge_identity_core::OAuthServiceProvider;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

fn default_http_timeout() -> u64 {
    crate::client::DEFAULT_HTTP_TIMEOUT_SECONDS
}

fn default_true() -> bool {
    true
}

/// A `domain` key may carry one value or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// Top-level host configuration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AuthConfig {
    pub canonical_web_url: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    #[serde(default)]
    pub provider: BTreeMap<String, ProviderSection>,
}

/// One provider section, with the host's key names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProviderSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub callback: Option<String>,
    pub root_url: Option<String>,
    pub realm: Option<String>,
    pub tenant: Option<String>,
    pub domain: Option<OneOrMany>,
    pub service_name: Option<String>,
    #[serde(default)]
    pub use_email_as_username: bool,
    #[serde(default)]
    pub fix_legacy_user_id: bool,
    #[serde(default = "default_true")]
    pub use_preferred_username: bool,
    #[serde(default)]
    pub link_to_existing_openid_accounts: bool,
}

impl ProviderSection {
    fn to_settings(&self, key: &str, canonical_web_url: &str) -> OAuth2Result<ProviderSettings> {
        let client_id = self.client_id.clone().ok_or_else(|| {
            OAuth2Error::ConfigError(format!("provider.{key}: client-id is required"))
        })?;
        let client_secret = self.client_secret.clone().ok_or_else(|| {
            OAuth2Error::ConfigError(format!("provider.{key}: client-secret is required"))
        })?;

        let mut settings = ProviderSettings::new(client_id, client_secret, canonical_web_url);
        settings.callback = self.callback.clone();
        settings.root_url = self.root_url.clone();
        settings.realm = self.realm.clone();
        settings.tenant = self.tenant.clone();
        settings.domains = self
            .domain
            .clone()
            .map(OneOrMany::into_vec)
            .unwrap_or_default();
        settings.service_name = self.service_name.clone();
        settings.use_email_as_username = self.use_email_as_username;
        settings.fix_legacy_user_id = self.fix_legacy_user_id;
        settings.use_preferred_username = self.use_preferred_username;
        settings.link_to_existing_openid_accounts = self.link_to_existing_openid_accounts;
        Ok(settings)
    }
}

/// The set of providers enabled by the host configuration.
#[derive(Debug)]
pub struct LoginRegistry {
    providers: Vec<(ProviderFamily, Arc<OAuthLoginProvider>)>,
}

impl LoginRegistry {
    pub fn from_toml_str(raw: &str) -> OAuth2Result<Self> {
        let config: AuthConfig =
            toml::from_str(raw).map_err(|e| OAuth2Error::ConfigError(e.to_string()))?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &AuthConfig) -> OAuth2Result<Self> {
        for key in config.provider.keys() {
            if !ProviderFamily::ALL
                .iter()
                .any(|family| family.section_key() == key)
            {
                return Err(OAuth2Error::ConfigError(format!(
                    "unknown provider section: {key}"
                )));
            }
        }

        let client = OAuth2Client::new(config.http_timeout_seconds)?;
        let mut providers = Vec::new();
        for family in ProviderFamily::ALL {
            let Some(section) = config.provider.get(family.section_key()) else {
                continue;
            };
            let settings = section.to_settings(family.section_key(), &config.canonical_web_url)?;
            let provider = OAuthLoginProvider::with_client(family, settings, client.clone())?;
            info!("enabled login provider: {}", provider.name());
            providers.push((family, Arc::new(provider)));
        }

        Ok(Self { providers })
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn get(&self, section_key: &str) -> Option<Arc<OAuthLoginProvider>> {
        self.providers
            .iter()
            .find(|(family, _)| family.section_key() == section_key)
            .map(|(_, provider)| Arc::clone(provider))
    }

    /// Providers in a stable order, as trait objects for the host.
    pub fn providers(&self) -> Vec<Arc<dyn OAuthServiceProvider>> {
        self.providers
            .iter()
            .map(|(_, provider)| Arc::clone(provider) as Arc<dyn OAuthServiceProvider>)
            .collect()
    }
}
