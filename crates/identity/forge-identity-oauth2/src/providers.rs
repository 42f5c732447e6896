//! The supported provider families and their protocol data.
//!
//! Each family is a row of constants resolved against the host settings:
//! endpoint templates, scopes, token-exchange policy and the claims source.
//! Identity mapping for each family lives in [`crate::identity`].

use crate::config::ProviderSettings;
use crate::descriptor::{BearerAuth, ClaimsSource, ClientAuth, ProviderDescriptor, TokenVerb};
use crate::error::OAuth2Result;
use url::Url;

pub(crate) const GITHUB_ROOT_URL: &str = "https://github.com";
pub(crate) const OFFICE365_DEFAULT_TENANT: &str = "organizations";

/// Tenants Microsoft treats as multi-tenant aliases; tokens issued under
/// them carry per-user `tid`s that cannot be matched against configuration.
pub(crate) const OFFICE365_TENANTS_WITHOUT_VALIDATION: [&str; 3] =
    [OFFICE365_DEFAULT_TENANT, "common", "consumers"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    Google,
    GitHub,
    Bitbucket,
    GitLab,
    Facebook,
    Office365,
    Keycloak,
    Cas,
    Dex,
    LemonLdap,
    Phabricator,
    AirVantage,
}

impl ProviderFamily {
    pub const ALL: [ProviderFamily; 12] = [
        ProviderFamily::Google,
        ProviderFamily::GitHub,
        ProviderFamily::Bitbucket,
        ProviderFamily::GitLab,
        ProviderFamily::Facebook,
        ProviderFamily::Office365,
        ProviderFamily::Keycloak,
        ProviderFamily::Cas,
        ProviderFamily::Dex,
        ProviderFamily::LemonLdap,
        ProviderFamily::Phabricator,
        ProviderFamily::AirVantage,
    ];

    /// Key of this family's section in the host configuration.
    pub fn section_key(self) -> &'static str {
        match self {
            ProviderFamily::Google => "google",
            ProviderFamily::GitHub => "github",
            ProviderFamily::Bitbucket => "bitbucket",
            ProviderFamily::GitLab => "gitlab",
            ProviderFamily::Facebook => "facebook",
            ProviderFamily::Office365 => "office365",
            ProviderFamily::Keycloak => "keycloak",
            ProviderFamily::Cas => "cas",
            ProviderFamily::Dex => "dex",
            ProviderFamily::LemonLdap => "lemonldap",
            ProviderFamily::Phabricator => "phabricator",
            ProviderFamily::AirVantage => "airvantage",
        }
    }

    /// Prefix that keeps external ids from colliding across providers.
    pub fn external_id_prefix(self) -> &'static str {
        match self {
            ProviderFamily::Google => "google-oauth:",
            ProviderFamily::GitHub => "github-oauth:",
            ProviderFamily::Bitbucket => "bitbucket-oauth:",
            ProviderFamily::GitLab => "gitlab-oauth:",
            ProviderFamily::Facebook => "facebook-oauth:",
            ProviderFamily::Office365 => "office365-oauth:",
            ProviderFamily::Keycloak => "keycloak-oauth:",
            ProviderFamily::Cas => "cas-oauth:",
            ProviderFamily::Dex => "dex-oauth:",
            ProviderFamily::LemonLdap => "llng-oauth:",
            ProviderFamily::Phabricator => "phabricator-oauth:",
            ProviderFamily::AirVantage => "av-oauth:",
        }
    }

    /// Login-screen name; self-hosted families honor a `service-name`
    /// override.
    pub fn default_name(self) -> &'static str {
        match self {
            ProviderFamily::Google => "Google OAuth2",
            ProviderFamily::GitHub => "GitHub OAuth2",
            ProviderFamily::Bitbucket => "Bitbucket OAuth2",
            ProviderFamily::GitLab => "GitLab OAuth2",
            ProviderFamily::Facebook => "Facebook OAuth2",
            ProviderFamily::Office365 => "Office365 OAuth2",
            ProviderFamily::Keycloak => "Keycloak OAuth2",
            ProviderFamily::Cas => "Generic CAS OAuth2",
            ProviderFamily::Dex => "Dex OAuth2",
            ProviderFamily::LemonLdap => "LemonLDAP OAuth2",
            ProviderFamily::Phabricator => "Phabricator OAuth2",
            ProviderFamily::AirVantage => "AirVantage OAuth2",
        }
    }

    /// Resolve this family's descriptor against the host settings.
    pub fn descriptor(self, settings: &ProviderSettings) -> OAuth2Result<ProviderDescriptor> {
        match self {
            ProviderFamily::Google => {
                let mut scopes = vec!["email".to_string(), "profile".to_string()];
                if settings.link_to_existing_openid_accounts {
                    scopes.insert(0, "openid".to_string());
                }
                let mut extra_auth_params = Vec::new();
                if settings.link_to_existing_openid_accounts {
                    extra_auth_params
                        .push(("openid.realm".to_string(), settings.canonical_with_slash()));
                }
                // The hd hint pre-selects the workspace account; enforcement
                // happens against the id_token claims after login.
                if let [domain] = settings.domains.as_slice() {
                    extra_auth_params.push(("hd".to_string(), domain.clone()));
                }
                Ok(ProviderDescriptor {
                    authorization_endpoint: Url::parse(
                        "https://accounts.google.com/o/oauth2/auth",
                    )?,
                    token_endpoint: Url::parse("https://www.googleapis.com/oauth2/v4/token")?,
                    scopes,
                    token_verb: TokenVerb::Post,
                    client_auth: ClientAuth::RequestBody,
                    claims: ClaimsSource::UserInfoEndpoint {
                        url: Url::parse("https://www.googleapis.com/oauth2/v2/userinfo")?,
                        bearer: BearerAuth::QueryParam,
                        extra_query: Vec::new(),
                    },
                    extra_auth_params,
                })
            }
            ProviderFamily::GitHub => {
                let root = settings
                    .root_url
                    .as_deref()
                    .unwrap_or(GITHUB_ROOT_URL)
                    .trim_end_matches('/')
                    .to_string();
                let userinfo = if root == GITHUB_ROOT_URL {
                    "https://api.github.com/user".to_string()
                } else {
                    format!("{root}/api/v3/user")
                };
                Ok(ProviderDescriptor {
                    authorization_endpoint: Url::parse(&format!("{root}/login/oauth/authorize"))?,
                    token_endpoint: Url::parse(&format!("{root}/login/oauth/access_token"))?,
                    scopes: vec!["user:email".to_string()],
                    token_verb: TokenVerb::Post,
                    client_auth: ClientAuth::RequestBody,
                    claims: ClaimsSource::UserInfoEndpoint {
                        url: Url::parse(&userinfo)?,
                        bearer: BearerAuth::QueryParam,
                        extra_query: Vec::new(),
                    },
                    extra_auth_params: Vec::new(),
                })
            }
            ProviderFamily::Bitbucket => Ok(ProviderDescriptor {
                authorization_endpoint: Url::parse("https://bitbucket.org/site/oauth2/authorize")?,
                token_endpoint: Url::parse("https://bitbucket.org/site/oauth2/access_token")?,
                scopes: Vec::new(),
                token_verb: TokenVerb::Post,
                client_auth: ClientAuth::BasicHeader,
                claims: ClaimsSource::UserInfoEndpoint {
                    url: Url::parse("https://bitbucket.org/api/1.0/user/")?,
                    bearer: BearerAuth::QueryParam,
                    extra_query: Vec::new(),
                },
                extra_auth_params: Vec::new(),
            }),
            ProviderFamily::GitLab => {
                let root = settings.require_root_url()?;
                Ok(ProviderDescriptor {
                    authorization_endpoint: Url::parse(&format!("{root}/oauth/authorize"))?,
                    token_endpoint: Url::parse(&format!("{root}/oauth/token"))?,
                    scopes: Vec::new(),
                    token_verb: TokenVerb::Post,
                    client_auth: ClientAuth::RequestBody,
                    claims: ClaimsSource::UserInfoEndpoint {
                        url: Url::parse(&format!("{root}/api/v3/user"))?,
                        bearer: BearerAuth::QueryParam,
                        extra_query: Vec::new(),
                    },
                    extra_auth_params: Vec::new(),
                })
            }
            ProviderFamily::Facebook => Ok(ProviderDescriptor {
                authorization_endpoint: Url::parse("https://www.facebook.com/dialog/oauth")?,
                token_endpoint: Url::parse("https://graph.facebook.com/oauth/access_token")?,
                scopes: vec!["email".to_string()],
                token_verb: TokenVerb::Post,
                client_auth: ClientAuth::RequestBody,
                claims: ClaimsSource::UserInfoEndpoint {
                    url: Url::parse("https://graph.facebook.com/me")?,
                    bearer: BearerAuth::QueryParam,
                    extra_query: vec![("fields".to_string(), "email,name".to_string())],
                },
                extra_auth_params: Vec::new(),
            }),
            ProviderFamily::Office365 => {
                let tenant = settings
                    .tenant
                    .as_deref()
                    .unwrap_or(OFFICE365_DEFAULT_TENANT);
                Ok(ProviderDescriptor {
                    authorization_endpoint: Url::parse(&format!(
                        "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize"
                    ))?,
                    token_endpoint: Url::parse(&format!(
                        "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token"
                    ))?,
                    scopes: vec![
                        "openid".to_string(),
                        "offline_access".to_string(),
                        "https://graph.microsoft.com/user.readbasic.all".to_string(),
                    ],
                    token_verb: TokenVerb::Post,
                    client_auth: ClientAuth::RequestBody,
                    claims: ClaimsSource::UserInfoEndpoint {
                        url: Url::parse("https://graph.microsoft.com/v1.0/me")?,
                        bearer: BearerAuth::Header,
                        extra_query: Vec::new(),
                    },
                    extra_auth_params: Vec::new(),
                })
            }
            ProviderFamily::Keycloak => {
                let root = settings.require_root_url()?;
                let realm = settings.realm.as_deref().ok_or_else(|| {
                    crate::error::OAuth2Error::ConfigError("realm is required".to_string())
                })?;
                Ok(ProviderDescriptor {
                    authorization_endpoint: Url::parse(&format!(
                        "{root}/auth/realms/{realm}/protocol/openid-connect/auth"
                    ))?,
                    token_endpoint: Url::parse(&format!(
                        "{root}/auth/realms/{realm}/protocol/openid-connect/token"
                    ))?,
                    scopes: vec!["openid".to_string()],
                    token_verb: TokenVerb::Post,
                    client_auth: ClientAuth::RequestBody,
                    claims: ClaimsSource::IdToken,
                    extra_auth_params: Vec::new(),
                })
            }
            ProviderFamily::Cas => {
                let root = settings.require_root_url()?;
                Ok(ProviderDescriptor {
                    authorization_endpoint: Url::parse(&format!("{root}/oauth2.0/authorize"))?,
                    token_endpoint: Url::parse(&format!("{root}/oauth2.0/accessToken"))?,
                    scopes: Vec::new(),
                    token_verb: TokenVerb::Post,
                    client_auth: ClientAuth::RequestBody,
                    claims: ClaimsSource::UserInfoEndpoint {
                        url: Url::parse(&format!("{root}/oauth2.0/profile"))?,
                        bearer: BearerAuth::QueryParam,
                        extra_query: Vec::new(),
                    },
                    extra_auth_params: Vec::new(),
                })
            }
            ProviderFamily::Dex => {
                let root = settings.require_root_url()?;
                Ok(ProviderDescriptor {
                    authorization_endpoint: Url::parse(&format!("{root}/dex/auth"))?,
                    token_endpoint: Url::parse(&format!("{root}/dex/token"))?,
                    scopes: vec![
                        "openid".to_string(),
                        "profile".to_string(),
                        "email".to_string(),
                        "offline_access".to_string(),
                    ],
                    token_verb: TokenVerb::Post,
                    client_auth: ClientAuth::RequestBody,
                    claims: ClaimsSource::IdToken,
                    extra_auth_params: Vec::new(),
                })
            }
            ProviderFamily::LemonLdap => {
                let root = settings.require_root_url()?;
                Ok(ProviderDescriptor {
                    authorization_endpoint: Url::parse(&format!("{root}/oauth2/authorize"))?,
                    token_endpoint: Url::parse(&format!("{root}/oauth2/token"))?,
                    scopes: vec![
                        "openid".to_string(),
                        "email".to_string(),
                        "profile".to_string(),
                    ],
                    token_verb: TokenVerb::Post,
                    client_auth: ClientAuth::RequestBody,
                    claims: ClaimsSource::UserInfoEndpoint {
                        url: Url::parse(&format!("{root}/oauth2/userinfo"))?,
                        bearer: BearerAuth::Header,
                        extra_query: Vec::new(),
                    },
                    extra_auth_params: Vec::new(),
                })
            }
            ProviderFamily::Phabricator => {
                let root = settings.require_root_url()?;
                Ok(ProviderDescriptor {
                    authorization_endpoint: Url::parse(&format!("{root}/oauthserver/auth/"))?,
                    token_endpoint: Url::parse(&format!("{root}/oauthserver/token/"))?,
                    scopes: Vec::new(),
                    token_verb: TokenVerb::Post,
                    client_auth: ClientAuth::RequestBody,
                    claims: ClaimsSource::UserInfoEndpoint {
                        url: Url::parse(&format!("{root}/api/user.whoami"))?,
                        bearer: BearerAuth::Header,
                        extra_query: Vec::new(),
                    },
                    extra_auth_params: Vec::new(),
                })
            }
            ProviderFamily::AirVantage => Ok(ProviderDescriptor {
                authorization_endpoint: Url::parse("https://eu.airvantage.net/api/oauth/authorize")?,
                token_endpoint: Url::parse("https://eu.airvantage.net/api/oauth/token")?,
                scopes: Vec::new(),
                token_verb: TokenVerb::Post,
                client_auth: ClientAuth::RequestBody,
                claims: ClaimsSource::UserInfoEndpoint {
                    url: Url::parse("https://eu.airvantage.net/api/v1/users/current")?,
                    bearer: BearerAuth::QueryParam,
                    extra_query: Vec::new(),
                },
                extra_auth_params: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::OAuth2Client;

    fn settings() -> ProviderSettings {
        ProviderSettings::new("test_client_id", "secret", "https://localhost")
    }

    fn authorization_url(family: ProviderFamily, settings: &ProviderSettings) -> String {
        let descriptor = family.descriptor(settings).unwrap();
        OAuth2Client::authorization_url(&descriptor, settings).unwrap()
    }

    #[test]
    fn github_defaults_to_github_com() {
        let url = authorization_url(ProviderFamily::GitHub, &settings());
        assert_eq!(
            url,
            "https://github.com/login/oauth/authorize?response_type=code&client_id=test_client_id\
             &redirect_uri=https%3A%2F%2Flocalhost%2Foauth&scope=user%3Aemail"
        );
    }

    #[test]
    fn github_enterprise_root_is_honored() {
        for root in [
            "https://git.yourcompany.com",
            "https://git.yourcompany.com/",
        ] {
            let settings = settings().with_root_url(root);
            let descriptor = ProviderFamily::GitHub.descriptor(&settings).unwrap();
            assert_eq!(
                descriptor.authorization_endpoint.as_str(),
                "https://git.yourcompany.com/login/oauth/authorize"
            );
            match &descriptor.claims {
                ClaimsSource::UserInfoEndpoint { url, .. } => {
                    assert_eq!(url.as_str(), "https://git.yourcompany.com/api/v3/user");
                }
                other => panic!("unexpected claims source: {other:?}"),
            }
        }
    }

    #[test]
    fn github_com_userinfo_lives_on_api_host() {
        let descriptor = ProviderFamily::GitHub.descriptor(&settings()).unwrap();
        match &descriptor.claims {
            ClaimsSource::UserInfoEndpoint { url, .. } => {
                assert_eq!(url.as_str(), "https://api.github.com/user");
            }
            other => panic!("unexpected claims source: {other:?}"),
        }
    }

    #[test]
    fn google_scope_and_extras_follow_flags() {
        let plain = ProviderFamily::Google.descriptor(&settings()).unwrap();
        assert_eq!(plain.scopes, ["email", "profile"]);
        assert!(plain.extra_auth_params.is_empty());

        let linked = settings()
            .link_to_existing_openid_accounts(true)
            .with_domains(vec!["example.com".to_string()]);
        let descriptor = ProviderFamily::Google.descriptor(&linked).unwrap();
        assert_eq!(descriptor.scopes, ["openid", "email", "profile"]);
        assert!(
            descriptor
                .extra_auth_params
                .contains(&("hd".to_string(), "example.com".to_string()))
        );
        assert!(descriptor.extra_auth_params.contains(&(
            "openid.realm".to_string(),
            "https://localhost/".to_string()
        )));
    }

    #[test]
    fn dex_scopes_are_plus_encoded_on_the_wire() {
        let settings = settings().with_root_url("https://dex.example.com");
        let url = authorization_url(ProviderFamily::Dex, &settings);
        assert!(url.contains("scope=openid+profile+email+offline_access"));
    }

    #[test]
    fn keycloak_endpoints_are_templated_by_root_and_realm() {
        let settings = settings()
            .with_root_url("https://sso.example.com")
            .with_realm("master");
        let descriptor = ProviderFamily::Keycloak.descriptor(&settings).unwrap();
        assert_eq!(
            descriptor.authorization_endpoint.as_str(),
            "https://sso.example.com/auth/realms/master/protocol/openid-connect/auth"
        );
        assert_eq!(
            descriptor.token_endpoint.as_str(),
            "https://sso.example.com/auth/realms/master/protocol/openid-connect/token"
        );
    }

    #[test]
    fn keycloak_without_realm_is_rejected() {
        let settings = settings().with_root_url("https://sso.example.com");
        assert!(ProviderFamily::Keycloak.descriptor(&settings).is_err());
    }

    #[test]
    fn self_hosted_families_require_a_root_url() {
        for family in [
            ProviderFamily::GitLab,
            ProviderFamily::Cas,
            ProviderFamily::Dex,
            ProviderFamily::LemonLdap,
            ProviderFamily::Phabricator,
        ] {
            assert!(family.descriptor(&settings()).is_err(), "{family:?}");
        }
    }

    #[test]
    fn office365_tenant_defaults_to_organizations() {
        let descriptor = ProviderFamily::Office365.descriptor(&settings()).unwrap();
        assert_eq!(
            descriptor.token_endpoint.as_str(),
            "https://login.microsoftonline.com/organizations/oauth2/v2.0/token"
        );

        let tenanted = settings().with_tenant("3a884633-3301-4504-bc68-a65071ee91a0");
        let descriptor = ProviderFamily::Office365.descriptor(&tenanted).unwrap();
        assert_eq!(
            descriptor.authorization_endpoint.as_str(),
            "https://login.microsoftonline.com/3a884633-3301-4504-bc68-a65071ee91a0/oauth2/v2.0/authorize"
        );
    }

    #[test]
    fn bitbucket_authenticates_with_basic_header() {
        let descriptor = ProviderFamily::Bitbucket.descriptor(&settings()).unwrap();
        assert_eq!(descriptor.client_auth, ClientAuth::BasicHeader);
    }
}
