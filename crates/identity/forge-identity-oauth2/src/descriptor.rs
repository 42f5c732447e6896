//! Provider descriptors: the static, per-family protocol data.

use url::Url;

/// HTTP verb used for the token exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenVerb {
    Get,
    #[default]
    Post,
}

/// How `client_id`/`client_secret` are presented to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientAuth {
    /// Form body parameters.
    #[default]
    RequestBody,
    /// HTTP Basic authorization header.
    BasicHeader,
}

/// How the access token is attached to the userinfo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerAuth {
    /// `Authorization: Bearer <token>` header.
    Header,
    /// `access_token=<token>` query parameter.
    QueryParam,
}

/// Where identity claims come from.
#[derive(Debug, Clone)]
pub enum ClaimsSource {
    /// A second, authenticated GET to the provider's profile endpoint.
    UserInfoEndpoint {
        url: Url,
        bearer: BearerAuth,
        /// Extra query parameters some providers require (Facebook `fields`).
        extra_query: Vec<(String, String)>,
    },
    /// The token response already carries an OIDC `id_token`; its payload is
    /// the claim set. No second network call.
    IdToken,
}

/// Everything the generic client needs to know about one provider family,
/// resolved against the host settings (root URL, realm, tenant) at
/// construction time.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    /// Space-joined on the wire; `+` is the percent-encoded form of the
    /// separator.
    pub scopes: Vec<String>,
    pub token_verb: TokenVerb,
    pub client_auth: ClientAuth,
    pub claims: ClaimsSource,
    /// Appended verbatim to the authorization URL (Google `hd` domain hint,
    /// `openid.realm` for legacy OpenID linking).
    pub extra_auth_params: Vec<(String, String)>,
}

impl ProviderDescriptor {
    pub(crate) fn scope(&self) -> Option<String> {
        if self.scopes.is_empty() {
            None
        } else {
            Some(self.scopes.join(" "))
        }
    }
}
