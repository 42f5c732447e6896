//! Generic OAuth2 client: authorization URL construction, code exchange and
//! userinfo retrieval, parameterized by a [`ProviderDescriptor`].

use crate::config::ProviderSettings;
use crate::descriptor::{BearerAuth, ClientAuth, ProviderDescriptor, TokenVerb};
use crate::error::{OAuth2Error, OAuth2Result};
use forge_identity_core::AccessToken;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Thin wrapper over a shared `reqwest::Client`; connection pooling and TLS
/// are delegated to it.
#[derive(Clone, Debug)]
pub struct OAuth2Client {
    http: reqwest::Client,
}

impl OAuth2Client {
    pub fn new(http_timeout_seconds: u64) -> OAuth2Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(http_timeout_seconds))
            .build()?;
        Ok(Self { http })
    }

    /// Build the authorization URL the user is redirected to. Pure string
    /// construction; no network call.
    pub fn authorization_url(
        descriptor: &ProviderDescriptor,
        settings: &ProviderSettings,
    ) -> OAuth2Result<String> {
        let redirect_uri = settings.redirect_uri();
        // Malformed callbacks must fail at construction, not per login.
        Url::parse(&redirect_uri)?;

        let mut url = descriptor.authorization_endpoint.clone();
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &settings.client_id);
            params.append_pair("redirect_uri", &redirect_uri);
            if let Some(scope) = descriptor.scope() {
                params.append_pair("scope", &scope);
            }
            for (key, value) in &descriptor.extra_auth_params {
                params.append_pair(key, value);
            }
        }

        debug!("authorization URL: {url}");
        Ok(url.into())
    }

    /// Exchange an authorization code for an access token: one HTTP round
    /// trip to the token endpoint.
    pub async fn exchange_code(
        &self,
        descriptor: &ProviderDescriptor,
        settings: &ProviderSettings,
        code: &str,
    ) -> OAuth2Result<AccessToken> {
        let redirect_uri = settings.redirect_uri();
        let scope = descriptor.scope();

        let mut params: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        if let Some(scope) = scope.as_deref() {
            params.push(("scope", scope));
        }
        if descriptor.client_auth == ClientAuth::RequestBody {
            params.push(("client_id", settings.client_id.as_str()));
            params.push(("client_secret", settings.client_secret.as_str()));
        }

        let endpoint = descriptor.token_endpoint.clone();
        let mut request = match descriptor.token_verb {
            TokenVerb::Post => self.http.post(endpoint).form(&params),
            TokenVerb::Get => self.http.get(endpoint).query(&params),
        };
        if descriptor.client_auth == ClientAuth::BasicHeader {
            request = request.basic_auth(&settings.client_id, Some(&settings.client_secret));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("token exchange failed: status {status} ({body})");
            return Err(OAuth2Error::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token = extract_access_token(&body)?;
        info!("exchanged authorization code for access token");
        Ok(token)
    }

    /// GET the provider's profile endpoint with the access token attached
    /// and return the parsed claims object.
    pub async fn fetch_claims(
        &self,
        url: &Url,
        extra_query: &[(String, String)],
        bearer: BearerAuth,
        token: &AccessToken,
    ) -> OAuth2Result<serde_json::Value> {
        let mut request = self.http.get(url.clone()).header(ACCEPT, "*/*");
        if !extra_query.is_empty() {
            request = request.query(extra_query);
        }
        request = match bearer {
            BearerAuth::Header => request.bearer_auth(&token.token),
            BearerAuth::QueryParam => request.query(&[("access_token", token.token.as_str())]),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("user info request failed: status {status} ({body})");
            return Err(OAuth2Error::UserInfoFailed {
                status: status.as_u16(),
                body,
            });
        }
        debug!("user info response: {body}");

        let claims: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| OAuth2Error::InvalidUserInfoResponse(e.to_string()))?;
        if !claims.is_object() {
            return Err(OAuth2Error::InvalidUserInfoResponse(format!(
                "invalid JSON '{body}': not a JSON object"
            )));
        }
        Ok(claims)
    }
}

#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
}

/// Parse a token-endpoint response body. Deterministic: the same body always
/// yields the same token.
pub(crate) fn extract_access_token(body: &str) -> OAuth2Result<AccessToken> {
    let parsed: RawTokenResponse = serde_json::from_str(body)
        .map_err(|e| OAuth2Error::InvalidTokenResponse(e.to_string()))?;
    match parsed.access_token {
        Some(token) if !token.is_empty() => Ok(AccessToken {
            token,
            token_type: parsed.token_type,
            raw: body.to_string(),
        }),
        _ => Err(OAuth2Error::InvalidTokenResponse(format!(
            "response doesn't contain access_token field: {body}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ClaimsSource;
    use std::collections::HashMap;

    fn descriptor(extra: Vec<(String, String)>) -> ProviderDescriptor {
        ProviderDescriptor {
            authorization_endpoint: Url::parse("https://sso.example.com/auth").unwrap(),
            token_endpoint: Url::parse("https://sso.example.com/token").unwrap(),
            scopes: vec!["openid".to_string(), "email".to_string()],
            token_verb: TokenVerb::Post,
            client_auth: ClientAuth::RequestBody,
            claims: ClaimsSource::IdToken,
            extra_auth_params: extra,
        }
    }

    #[test]
    fn authorization_url_has_each_parameter_exactly_once() {
        let settings = ProviderSettings::new("my_client", "secret", "https://review.example.com");
        let url = OAuth2Client::authorization_url(&descriptor(Vec::new()), &settings).unwrap();

        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("sso.example.com"));
        assert_eq!(parsed.path(), "/auth");

        let mut counts: HashMap<String, usize> = HashMap::new();
        for (key, _) in parsed.query_pairs() {
            *counts.entry(key.into_owned()).or_default() += 1;
        }
        assert_eq!(counts.get("response_type"), Some(&1));
        assert_eq!(counts.get("client_id"), Some(&1));
        assert_eq!(counts.get("redirect_uri"), Some(&1));

        let params: HashMap<_, _> = parsed.query_pairs().collect();
        assert_eq!(params.get("response_type"), Some(&"code".into()));
        assert_eq!(params.get("client_id"), Some(&"my_client".into()));
        assert_eq!(params.get("scope"), Some(&"openid email".into()));
        assert_eq!(
            params.get("redirect_uri"),
            Some(&"https://review.example.com/oauth".into())
        );
    }

    #[test]
    fn redirect_uri_is_percent_encoded() {
        let settings = ProviderSettings::new("my_client", "secret", "https://review.example.com");
        let url = OAuth2Client::authorization_url(&descriptor(Vec::new()), &settings).unwrap();
        assert!(url.contains("redirect_uri=https%3A%2F%2Freview.example.com%2Foauth"));
    }

    #[test]
    fn extra_params_are_appended() {
        let extras = vec![
            ("hd".to_string(), "example.com".to_string()),
            (
                "openid.realm".to_string(),
                "https://review.example.com/".to_string(),
            ),
        ];
        let settings = ProviderSettings::new("my_client", "secret", "https://review.example.com");
        let url = OAuth2Client::authorization_url(&descriptor(extras), &settings).unwrap();
        assert!(url.contains("hd=example.com"));
        assert!(url.contains("openid.realm=https%3A%2F%2Freview.example.com%2F"));
    }

    #[test]
    fn malformed_callback_fails_url_construction() {
        let settings = ProviderSettings::new("my_client", "secret", "not a url");
        let err = OAuth2Client::authorization_url(&descriptor(Vec::new()), &settings).unwrap_err();
        assert!(matches!(err, OAuth2Error::UrlError(_)));
    }

    #[test]
    fn token_extraction_is_idempotent() {
        let body = r#"{"access_token":"TOK1","token_type":"Bearer","expires_in":3600}"#;
        let first = extract_access_token(body).unwrap();
        let second = extract_access_token(body).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.token, "TOK1");
        assert_eq!(first.token_type.as_deref(), Some("Bearer"));
        assert_eq!(first.raw, body);
    }

    #[test]
    fn token_extraction_tolerates_whitespace() {
        let body = "{ \"access_token\" : \"TOK1\" }";
        assert_eq!(extract_access_token(body).unwrap().token, "TOK1");
    }

    #[test]
    fn missing_access_token_is_an_error() {
        let err = extract_access_token(r#"{"foo":"bar"}"#).unwrap_err();
        assert!(matches!(err, OAuth2Error::InvalidTokenResponse(_)));
    }

    #[test]
    fn blank_access_token_is_an_error() {
        let err = extract_access_token(r#"{"access_token":""}"#).unwrap_err();
        assert!(matches!(err, OAuth2Error::InvalidTokenResponse(_)));
    }

    #[test]
    fn non_json_token_response_is_an_error() {
        let err = extract_access_token("access_token=TOK1").unwrap_err();
        assert!(matches!(err, OAuth2Error::InvalidTokenResponse(_)));
    }
}
