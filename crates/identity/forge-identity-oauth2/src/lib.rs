//! OAuth2 "login with X" for forge hosts.
//!
//! One generic Authorization Code client parameterized by per-family
//! protocol data, covering Google, GitHub, Bitbucket, GitLab, Facebook,
//! Office365, Keycloak, CAS, Dex, LemonLDAP, Phabricator and AirVantage.
//! The host drives three calls per login (authorization URL, code
//! exchange, identity fetch) and receives a normalized, provider-prefixed
//! identity record, or `None` when a domain/tenant restriction rejects the
//! user.

mod client;
mod config;
mod descriptor;
mod error;
mod identity;
mod jwt;
mod provider;
mod providers;
mod registry;


pub use client::{DEFAULT_HTTP_TIMEOUT_SECONDS, OAuth2Client};
pub use config::ProviderSettings;
pub use descriptor::{BearerAuth, ClaimsSource, ClientAuth, ProviderDescriptor, TokenVerb};
pub use error::{OAuth2Error, OAuth2Result};
pub use jwt::{claims_from_raw, decode_payload};
pub use provider::OAuthLoginProvider;
pub use providers::ProviderFamily;
pub use registry::{AuthConfig, LoginRegistry, OneOrMany, ProviderSection};

// Re-export the host-boundary types for convenience
pub use forge_identity_core::{
    AccessToken, IdentityError, IdentityResult, OAuthServiceProvider, UserIdentity,
};
