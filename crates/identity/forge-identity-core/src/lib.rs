//! Core login provider traits and types.
//!
//! A host embeds one [`OAuthServiceProvider`] per configured identity
//! provider and drives the three-step login flow: redirect the browser to
//! [`OAuthServiceProvider::authorization_url`], exchange the returned code
//! with [`OAuthServiceProvider::access_token`], then resolve the user with
//! [`OAuthServiceProvider::user_info`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Normalized user record produced by a provider, independent of which
/// provider produced it.
///
/// `external_id` is provider-prefixed (for example `"github-oauth:42"`) so
/// that hosts serving several providers at once never see colliding ids. It
/// must stay stable for the lifetime of the user's account link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub external_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Identity under a superseded scheme: the unprefixed native id for
    /// providers that changed their id format, or a claimed OpenID
    /// identifier. Hosts use it to avoid orphaning existing account links.
    pub legacy_id: Option<String>,
}

/// Access token returned by a provider's token endpoint.
///
/// `raw` keeps the original JSON response body: OpenID-Connect providers
/// embed an `id_token` there that the generic token model does not expose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub token_type: Option<String>,
    pub raw: String,
}

/// One configured identity provider, as the host's login controller sees it.
///
/// Implementations hold only immutable configuration captured at
/// construction and are safe to share across concurrent logins.
#[async_trait]
pub trait OAuthServiceProvider: Send + Sync {
    /// Human-readable provider name shown on the login screen.
    fn name(&self) -> &str;

    /// Authorization URL the user's browser is redirected to. Pure string,
    /// precomputed at construction.
    fn authorization_url(&self) -> &str;

    /// Exchange the authorization code handed back by the provider redirect
    /// for an access token. Codes are single-use; a failed exchange means
    /// the whole flow restarts.
    async fn access_token(&self, code: &str) -> IdentityResult<AccessToken>;

    /// Fetch and normalize the user identity for an access token.
    ///
    /// `Ok(None)` means the user authenticated but is not authorized (for
    /// example a hosted-domain mismatch) and the host should show a clean
    /// "unauthorized" message rather than an error page.
    async fn user_info(&self, token: &AccessToken) -> IdentityResult<Option<UserIdentity>>;
}
