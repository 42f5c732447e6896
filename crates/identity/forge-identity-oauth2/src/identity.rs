//! Mapping provider claims onto the normalized identity record.
//!
//! One function per family, all following the same rules: external ids are
//! provider-prefixed, missing optional fields stay absent, and domain or
//! tenant restrictions reject with `Ok(None)` rather than an error.

use crate::config::ProviderSettings;
use crate::error::{OAuth2Error, OAuth2Result};
use crate::jwt;
use crate::providers::{
    OFFICE365_DEFAULT_TENANT, OFFICE365_TENANTS_WITHOUT_VALIDATION, ProviderFamily,
};
use forge_identity_core::{AccessToken, UserIdentity};
use serde_json::Value;
use tracing::warn;

pub(crate) fn map_claims(
    family: ProviderFamily,
    settings: &ProviderSettings,
    token: &AccessToken,
    claims: &Value,
) -> OAuth2Result<Option<UserIdentity>> {
    match family {
        ProviderFamily::Google => google(settings, token, claims),
        ProviderFamily::GitHub => github(settings, claims),
        ProviderFamily::Bitbucket => bitbucket(settings, claims),
        ProviderFamily::GitLab => gitlab(settings, claims),
        ProviderFamily::Facebook => facebook(claims),
        ProviderFamily::Office365 => office365(settings, token, claims),
        ProviderFamily::Keycloak => keycloak(settings, claims),
        ProviderFamily::Cas => cas(settings, claims),
        ProviderFamily::Dex => dex(settings, claims),
        ProviderFamily::LemonLdap => lemonldap(claims),
        ProviderFamily::Phabricator => phabricator(claims),
        ProviderFamily::AirVantage => airvantage(claims),
    }
}

fn google(
    settings: &ProviderSettings,
    token: &AccessToken,
    claims: &Value,
) -> OAuth2Result<Option<UserIdentity>> {
    let id = required_field(claims, "id")?;
    let email = field(claims, "email");
    let name = field(claims, "name");

    let mut legacy_id = None;
    if settings.link_to_existing_openid_accounts || !settings.domains.is_empty() {
        let jwt_claims = jwt::claims_from_raw(&token.raw)?;
        if !settings.domains.is_empty() {
            let hd = jwt_claims.get("hd").and_then(Value::as_str);
            if !domain_allowed(&settings.domains, hd) {
                warn!(
                    "hosted domain validation failed: {}",
                    hd.unwrap_or_default()
                );
                return Ok(None);
            }
        }
        if settings.link_to_existing_openid_accounts {
            legacy_id = jwt_claims
                .get("openid_id")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
    }
    if legacy_id.is_none() && settings.fix_legacy_user_id {
        legacy_id = Some(id.clone());
    }

    let username = email_local_part(settings, email.as_deref());

    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::Google, &id),
        username,
        email,
        display_name: name,
        legacy_id,
    }))
}

fn github(settings: &ProviderSettings, claims: &Value) -> OAuth2Result<Option<UserIdentity>> {
    let id = required_field(claims, "id")?;
    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::GitHub, &id),
        username: field(claims, "login"),
        email: field(claims, "email"),
        display_name: field(claims, "name"),
        legacy_id: settings.fix_legacy_user_id.then(|| id.clone()),
    }))
}

fn bitbucket(settings: &ProviderSettings, claims: &Value) -> OAuth2Result<Option<UserIdentity>> {
    let user = claims.get("user").filter(|v| v.is_object()).ok_or_else(|| {
        OAuth2Error::InvalidUserInfoResponse("response doesn't contain user field".to_string())
    })?;
    let username = required_field(user, "username")?;
    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::Bitbucket, &username),
        username: Some(username.clone()),
        email: None,
        display_name: field(claims, "display_name"),
        legacy_id: settings.fix_legacy_user_id.then(|| username.clone()),
    }))
}

fn gitlab(settings: &ProviderSettings, claims: &Value) -> OAuth2Result<Option<UserIdentity>> {
    let id = required_field(claims, "id")?;
    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::GitLab, &id),
        username: field(claims, "username"),
        email: field(claims, "email"),
        display_name: field(claims, "name"),
        legacy_id: settings.fix_legacy_user_id.then(|| id.clone()),
    }))
}

// The username field is deprecated in Graph API v2.0+; email stands in for
// the login.
fn facebook(claims: &Value) -> OAuth2Result<Option<UserIdentity>> {
    let id = required_field(claims, "id")?;
    let email = field(claims, "email");
    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::Facebook, &id),
        username: email.clone(),
        email,
        display_name: field(claims, "name"),
        legacy_id: None,
    }))
}

fn office365(
    settings: &ProviderSettings,
    token: &AccessToken,
    claims: &Value,
) -> OAuth2Result<Option<UserIdentity>> {
    let tenant = settings
        .tenant
        .as_deref()
        .unwrap_or(OFFICE365_DEFAULT_TENANT);
    if !OFFICE365_TENANTS_WITHOUT_VALIDATION.contains(&tenant) {
        // The access token itself is an Azure AD JWT; its tid claim names
        // the issuing tenant.
        let access_claims = jwt::decode_payload(&token.token)?;
        let tid = access_claims.get("tid").and_then(Value::as_str);
        if tid != Some(tenant) {
            warn!(
                "token was issued by tenant [{}] while we are set to use [{tenant}]",
                tid.unwrap_or_default()
            );
            return Ok(None);
        }
    }

    let id_claims = jwt::claims_from_raw(&token.raw)?;
    let aud = id_claims.get("aud").and_then(Value::as_str);
    if aud != Some(settings.client_id.as_str()) {
        warn!(
            "id_token had aud [{}] while we expected the client id [{}]",
            aud.unwrap_or_default(),
            settings.client_id
        );
        return Ok(None);
    }

    let id = required_field(claims, "id")?;
    let email = field(claims, "mail");
    let username = email_local_part(settings, email.as_deref());
    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::Office365, &id),
        username,
        email,
        display_name: field(claims, "displayName"),
        legacy_id: None,
    }))
}

fn keycloak(settings: &ProviderSettings, claims: &Value) -> OAuth2Result<Option<UserIdentity>> {
    let preferred_username = required_field(claims, "preferred_username")?;
    let email = required_field(claims, "email")?;
    let name = required_field(claims, "name")?;
    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::Keycloak, &preferred_username),
        username: settings
            .use_preferred_username
            .then(|| preferred_username.clone()),
        email: Some(email),
        display_name: Some(name),
        legacy_id: None,
    }))
}

fn cas(settings: &ProviderSettings, claims: &Value) -> OAuth2Result<Option<UserIdentity>> {
    let id = required_field(claims, "id")?;
    let attributes = claims.get("attributes").ok_or_else(|| {
        OAuth2Error::InvalidUserInfoResponse(
            "response doesn't contain attributes field".to_string(),
        )
    })?;

    let mut email = None;
    let mut name = None;
    let mut login = None;
    // A server configured to release no attributes answers with an empty
    // object instead of an array; only an array carries values.
    if let Some(entries) = attributes.as_array() {
        for entry in entries {
            if !entry.is_object() {
                return Err(OAuth2Error::InvalidUserInfoResponse(format!(
                    "invalid JSON '{entry}': not a JSON object"
                )));
            }
            email = field(entry, "email").or(email);
            name = field(entry, "name").or(name);
            login = field(entry, "login").or(login);
        }
    }

    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::Cas, &id),
        username: login,
        email,
        display_name: name,
        legacy_id: settings.fix_legacy_user_id.then(|| id.clone()),
    }))
}

fn dex(settings: &ProviderSettings, claims: &Value) -> OAuth2Result<Option<UserIdentity>> {
    let email = required_field(claims, "email")?;
    let name = required_field(claims, "name")?;
    let username = match settings.domains.first() {
        Some(domain) if !domain.is_empty() => email.replace(&format!("@{domain}"), ""),
        _ => email.clone(),
    };
    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::Dex, &email),
        username: Some(username),
        email: Some(email),
        display_name: Some(name),
        legacy_id: None,
    }))
}

fn lemonldap(claims: &Value) -> OAuth2Result<Option<UserIdentity>> {
    let sub = required_field(claims, "sub")?;
    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::LemonLdap, &sub),
        username: field(claims, "username"),
        email: field(claims, "email"),
        display_name: field(claims, "name"),
        legacy_id: None,
    }))
}

fn phabricator(claims: &Value) -> OAuth2Result<Option<UserIdentity>> {
    let result = claims.get("result").filter(|v| v.is_object()).ok_or_else(|| {
        OAuth2Error::InvalidUserInfoResponse("response doesn't contain result field".to_string())
    })?;
    let phid = required_field(result, "phid")?;
    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::Phabricator, &phid),
        username: field(result, "userName"),
        email: field(result, "primaryEmail"),
        display_name: field(result, "realName"),
        legacy_id: None,
    }))
}

// AirVantage ids predate prefixing; the raw uid always rides along so
// existing account links keep resolving.
fn airvantage(claims: &Value) -> OAuth2Result<Option<UserIdentity>> {
    let uid = required_field(claims, "uid")?;
    Ok(Some(UserIdentity {
        external_id: prefixed(ProviderFamily::AirVantage, &uid),
        username: None,
        email: field(claims, "email"),
        display_name: field(claims, "name"),
        legacy_id: Some(uid.clone()),
    }))
}

fn prefixed(family: ProviderFamily, native_id: &str) -> String {
    format!("{}{native_id}", family.external_id_prefix())
}

fn email_local_part(settings: &ProviderSettings, email: Option<&str>) -> Option<String> {
    if !settings.use_email_as_username {
        return None;
    }
    email.map(|e| e.split('@').next().unwrap_or(e).to_string())
}

fn domain_allowed(domains: &[String], hd: Option<&str>) -> bool {
    match hd {
        Some(hd) => domains.iter().any(|domain| domain.eq_ignore_ascii_case(hd)),
        // Fail closed: no hosted-domain claim means no restriction match.
        None => false,
    }
}

// Provider ids arrive as JSON strings or numbers depending on the API.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field(claims: &Value, key: &str) -> Option<String> {
    claims.get(key).and_then(scalar)
}

fn required_field(claims: &Value, key: &str) -> OAuth2Result<String> {
    field(claims, key).ok_or_else(|| {
        OAuth2Error::InvalidUserInfoResponse(format!("response doesn't contain {key} field"))
    })
}
