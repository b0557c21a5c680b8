use crate::domain_port::{
    IdentityProvider, IdentityProviderError, ProviderProfile, ProviderTokens,
};
use serde::Deserialize;
use tracing::debug;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const SCOPE: &str = "openid email profile";

/// Google OAuth2 + userinfo client. `access_type=offline` asks for a
/// refresh token so cached profile fields can be renewed out of band.
pub struct GoogleIdentityProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    email: String,
    #[serde(default)]
    verified_email: bool,
    #[serde(default)]
    name: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default)]
    picture: String,
}

impl GoogleIdentityProvider {
    pub fn new(client_id: String, client_secret: String, redirect_url: String) -> Self {
        GoogleIdentityProvider {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_url,
        }
    }

    async fn request_tokens(
        &self,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, IdentityProviderError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| IdentityProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            debug!(%status, "token endpoint rejected the grant");
            return Err(IdentityProviderError::Rejected);
        }
        if !status.is_success() {
            return Err(IdentityProviderError::Unavailable(format!(
                "token endpoint returned {status}"
            )));
        }
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| IdentityProviderError::Unavailable(e.to_string()))
    }
}

#[async_trait::async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorize_url(&self, state: &str) -> String {
        let url = reqwest::Url::parse_with_params(
            AUTH_URL,
            [
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPE),
                ("access_type", "offline"),
                ("prompt", "select_account"),
                ("state", state),
            ],
        )
        .expect("static authorization url");
        url.into()
    }

    async fn exchange(&self, code: &str) -> Result<ProviderTokens, IdentityProviderError> {
        let tokens = self
            .request_tokens(&[
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.redirect_url),
                ("grant_type", "authorization_code"),
                ("code", code),
            ])
            .await?;

        Ok(ProviderTokens {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    async fn fetch_profile(
        &self,
        access_token: &str,
    ) -> Result<ProviderProfile, IdentityProviderError> {
        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(IdentityProviderError::Rejected);
        }
        if !status.is_success() {
            return Err(IdentityProviderError::Unavailable(format!(
                "userinfo endpoint returned {status}"
            )));
        }
        let info = response
            .json::<UserInfoResponse>()
            .await
            .map_err(|e| IdentityProviderError::Unavailable(e.to_string()))?;

        Ok(ProviderProfile {
            email: info.email,
            email_verified: info.verified_email,
            name: info.name,
            given_name: info.given_name,
            family_name: info.family_name,
            picture_url: info.picture,
        })
    }

    async fn refresh_profile(
        &self,
        refresh_token: &str,
    ) -> Result<ProviderProfile, IdentityProviderError> {
        let tokens = self
            .request_tokens(&[
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        self.fetch_profile(&tokens.access_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_state_and_offline_access() {
        let provider = GoogleIdentityProvider::new(
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/v1/auth/google/callback".to_string(),
        );

        let url = provider.authorize_url("st4te");
        let parsed = reqwest::Url::parse(&url).unwrap();
        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().collect();

        assert_eq!("code", pairs["response_type"]);
        assert_eq!("st4te", pairs["state"]);
        assert_eq!("offline", pairs["access_type"]);
        assert_eq!("openid email profile", pairs["scope"]);
        assert!(!url.contains("client-secret"));
    }
}
