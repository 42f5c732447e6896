//! Console walkthrough of the three-step login flow against GitHub.
//!
//! 1. Print the authorization URL to open in a browser
//! 2. Exchange the code from the redirect for an access token
//! 3. Fetch and print the normalized identity
//!
//! Set GITHUB_CLIENT_ID / GITHUB_CLIENT_SECRET for a real round trip; the
//! redirect lands on <canonical-web-url>/oauth, so register that as the
//! app's callback.

use forge_identity_oauth2::{
    OAuthLoginProvider, OAuthServiceProvider, ProviderFamily, ProviderSettings,
};
use std::io::{self, BufRead, Write};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let settings = ProviderSettings::new(
        std::env::var("GITHUB_CLIENT_ID").unwrap_or_else(|_| "your-client-id".to_string()),
        std::env::var("GITHUB_CLIENT_SECRET")
            .unwrap_or_else(|_| "your-client-secret".to_string()),
        "http://localhost:3000",
    );
    let provider = OAuthLoginProvider::new(ProviderFamily::GitHub, settings)?;

    println!("Login with {}", provider.name());
    println!("=========================");
    println!("\n1. Open this URL and authorize:");
    println!("   {}", provider.authorization_url());

    print!("\n2. Paste the code from the redirect: ");
    io::stdout().flush()?;
    let mut code = String::new();
    io::stdin().lock().read_line(&mut code)?;

    let token = provider.access_token(code.trim()).await?;
    println!("\n3. Access token received ({} chars)", token.token.len());

    match provider.user_info(&token).await? {
        Some(identity) => {
            println!("\nLogged in:");
            println!("   external id: {}", identity.external_id);
            println!("   username:    {:?}", identity.username);
            println!("   email:       {:?}", identity.email);
            println!("   name:        {:?}", identity.display_name);
        }
        None => println!("\nAuthenticated, but not authorized for this host"),
    }

    Ok(())
}
