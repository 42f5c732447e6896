//! One configured login provider, bound to the host-facing trait.

use crate::client::{DEFAULT_HTTP_TIMEOUT_SECONDS, OAuth2Client};
use crate::config::ProviderSettings;
use crate::descriptor::{ClaimsSource, ProviderDescriptor};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::providers::ProviderFamily;
use crate::{identity, jwt};
use async_trait::async_trait;
use forge_identity_core::{
    AccessToken, IdentityError, IdentityResult, OAuthServiceProvider, UserIdentity,
};
use tracing::debug;

/// A provider family bound to host settings: the unit the host's login
/// controller talks to.
///
/// Construction is where configuration errors surface; the per-login
/// operations only ever report transport or response problems.
#[derive(Debug)]
pub struct OAuthLoginProvider {
    family: ProviderFamily,
    name: String,
    settings: ProviderSettings,
    descriptor: ProviderDescriptor,
    client: OAuth2Client,
    authorization_url: String,
}

impl OAuthLoginProvider {
    pub fn new(family: ProviderFamily, settings: ProviderSettings) -> OAuth2Result<Self> {
        let client = OAuth2Client::new(DEFAULT_HTTP_TIMEOUT_SECONDS)?;
        Self::with_client(family, settings, client)
    }

    pub fn with_client(
        family: ProviderFamily,
        settings: ProviderSettings,
        client: OAuth2Client,
    ) -> OAuth2Result<Self> {
        settings.validate()?;
        let descriptor = family.descriptor(&settings)?;
        let authorization_url = OAuth2Client::authorization_url(&descriptor, &settings)?;
        let name = settings
            .service_name
            .clone()
            .unwrap_or_else(|| family.default_name().to_string());

        debug!(
            "configured {name}: redirect_uri={}, scope={:?}",
            settings.redirect_uri(),
            descriptor.scope()
        );

        Ok(Self {
            family,
            name,
            settings,
            descriptor,
            client,
            authorization_url,
        })
    }

    pub fn family(&self) -> ProviderFamily {
        self.family
    }

    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn claims(&self, token: &AccessToken) -> OAuth2Result<serde_json::Value> {
        match &self.descriptor.claims {
            ClaimsSource::UserInfoEndpoint {
                url,
                bearer,
                extra_query,
            } => {
                self.client
                    .fetch_claims(url, extra_query, *bearer, token)
                    .await
            }
            ClaimsSource::IdToken => jwt::claims_from_raw(&token.raw),
        }
    }
}

fn boundary(error: OAuth2Error) -> IdentityError {
    IdentityError::ProviderError(error.to_string())
}

#[async_trait]
impl OAuthServiceProvider for OAuthLoginProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    async fn access_token(&self, code: &str) -> IdentityResult<AccessToken> {
        self.client
            .exchange_code(&self.descriptor, &self.settings, code)
            .await
            .map_err(boundary)
    }

    async fn user_info(&self, token: &AccessToken) -> IdentityResult<Option<UserIdentity>> {
        let claims = self.claims(token).await.map_err(boundary)?;
        identity::map_claims(self.family, &self.settings, token, &claims).map_err(boundary)
    }
}
