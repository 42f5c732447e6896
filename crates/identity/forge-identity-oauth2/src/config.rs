//! Per-provider configuration sourced from the host.

use crate::error::{OAuth2Error, OAuth2Result};
use url::Url;

/// Values the host's configuration store supplies for one provider.
///
/// Immutable once a provider is constructed from it; lives for the process
/// lifetime of the provider instance.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    /// The host's own base URL; the default redirect URI is derived from it.
    pub canonical_web_url: String,
    /// Explicit redirect URI, overriding the `<canonical-web-url>/oauth`
    /// default.
    pub callback: Option<String>,
    /// Base URL for self-hosted providers (GitHub Enterprise, GitLab,
    /// Keycloak, CAS, Dex, LemonLDAP, Phabricator).
    pub root_url: Option<String>,
    pub realm: Option<String>,
    pub tenant: Option<String>,
    /// Allowed hosted domains; an empty list disables the restriction.
    pub domains: Vec<String>,
    /// Display name override for self-hosted providers.
    pub service_name: Option<String>,
    pub use_email_as_username: bool,
    pub fix_legacy_user_id: bool,
    pub use_preferred_username: bool,
    pub link_to_existing_openid_accounts: bool,
}

impl ProviderSettings {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        canonical_web_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            canonical_web_url: canonical_web_url.into(),
            callback: None,
            root_url: None,
            realm: None,
            tenant: None,
            domains: Vec::new(),
            service_name: None,
            use_email_as_username: false,
            fix_legacy_user_id: false,
            use_preferred_username: true,
            link_to_existing_openid_accounts: false,
        }
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn with_root_url(mut self, root_url: impl Into<String>) -> Self {
        self.root_url = Some(root_url.into());
        self
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn use_email_as_username(mut self, value: bool) -> Self {
        self.use_email_as_username = value;
        self
    }

    pub fn fix_legacy_user_id(mut self, value: bool) -> Self {
        self.fix_legacy_user_id = value;
        self
    }

    pub fn use_preferred_username(mut self, value: bool) -> Self {
        self.use_preferred_username = value;
        self
    }

    pub fn link_to_existing_openid_accounts(mut self, value: bool) -> Self {
        self.link_to_existing_openid_accounts = value;
        self
    }

    /// Redirect URI the provider sends the browser back to.
    pub fn redirect_uri(&self) -> String {
        match &self.callback {
            Some(callback) => callback.clone(),
            None => format!("{}/oauth", self.canonical_web_url.trim_end_matches('/')),
        }
    }

    /// Canonical web URL with exactly one trailing slash.
    pub(crate) fn canonical_with_slash(&self) -> String {
        format!("{}/", self.canonical_web_url.trim_end_matches('/'))
    }

    pub(crate) fn validate(&self) -> OAuth2Result<()> {
        if self.client_id.is_empty() {
            return Err(OAuth2Error::ConfigError("client-id is required".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(OAuth2Error::ConfigError(
                "client-secret is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Root URL with trailing slashes trimmed; must be an absolute URL.
    pub(crate) fn require_root_url(&self) -> OAuth2Result<String> {
        let root = self
            .root_url
            .as_deref()
            .ok_or_else(|| OAuth2Error::ConfigError("root-url is required".to_string()))?;
        let root = root.trim_end_matches('/');
        let parsed = Url::parse(root)
            .map_err(|_| OAuth2Error::ConfigError("Root URL must be absolute URL".to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(OAuth2Error::ConfigError(
                "Root URL must be absolute URL".to_string(),
            ));
        }
        Ok(root.to_string())
    }
}
