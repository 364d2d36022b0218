use log::{error, info};
use reqwest::Url;

use super::{
    api_client::ApiClient,
    error::LockupError,
    models::{identity_model::Identity, Config, Role},
};

/// A trait, necessary for every entity that exchanges an access token for a profile.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    /// `None` when the provider answered with an error or could not be reached.
    async fn get_userinfo(&self, access_token: &str) -> Option<Identity>;
}

impl IdentityProvider for ApiClient {
    async fn get_userinfo(&self, access_token: &str) -> Option<Identity> {
        info!("Getting user info from {}", self.userinfo_endpoint);
        let response = match self
            .http
            .get(&self.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!("Error fetching user info: {}", err);
                return None;
            }
        };
        if !response.status().is_success() {
            error!(
                "Error fetching user info: provider answered {}",
                response.status()
            );
            return None;
        }
        match response.json::<Identity>().await {
            Ok(identity) => Some(identity),
            Err(err) => {
                error!("Error decoding user info: {}", err);
                None
            }
        }
    }
}

/// Implicit-grant authorization request; the role travels in `state`.
pub fn authorization_url(config: &Config, role: Role) -> Result<Url, LockupError> {
    let state = role.to_string();
    Url::parse_with_params(
        &config.authorization_endpoint,
        &[
            ("client_id", config.oauth_client_id.as_str()),
            ("redirect_uri", config.oauth_redirect_uri.as_str()),
            ("response_type", "token"),
            ("scope", "openid email profile"),
            ("state", state.as_str()),
        ],
    )
    .map_err(|err| LockupError::Url {
        message: err.to_string(),
    })
}
