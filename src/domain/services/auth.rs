#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use anyhow::Result;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendBox;
use crate::domain::models::Identity;

/// Resolves who is signed in. With an access token the backend's user info
/// endpoint decides, otherwise the configured username and roles are used.
pub async fn resolve_identity(backend: &BackendBox, access_token: &str) -> Result<Identity> {
    if !access_token.is_empty() {
        let identity = backend.user_info(access_token).await?;
        tracing::debug!(
            display_name = identity.display_name,
            role = identity.role().to_string(),
            "Resolved identity from access token"
        );
        return Ok(identity);
    }

    return Ok(Identity {
        display_name: Config::get(ConfigKey::Username),
        roles: Config::get(ConfigKey::Roles),
    });
}
