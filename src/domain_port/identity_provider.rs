#[derive(Debug, thiserror::Error)]
pub enum IdentityProviderError {
    /// The provider rejected the grant (bad or expired code/credential).
    #[error("provider rejected the grant")]
    Rejected,
    /// Transient transport or provider-side failure.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Token pair returned by the provider's code exchange. The refresh
/// credential is stored opaquely inside a Session and later replayed to
/// `refresh_profile`; this subsystem never parses it.
#[derive(Debug, Clone)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub email: String,
    pub email_verified: bool,
    pub name: String,
    pub given_name: String,
    pub family_name: String,
    pub picture_url: String,
}

/// Third-party OAuth identity provider, consumed as an opaque capability.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization redirect target carrying the anti-CSRF `state` nonce.
    fn authorize_url(&self, state: &str) -> String;

    async fn exchange(&self, code: &str) -> Result<ProviderTokens, IdentityProviderError>;

    async fn fetch_profile(
        &self,
        access_token: &str,
    ) -> Result<ProviderProfile, IdentityProviderError>;

    /// Re-fetch the profile using a stored refresh credential. Used by the
    /// detached post-rotation profile refresh.
    async fn refresh_profile(
        &self,
        refresh_token: &str,
    ) -> Result<ProviderProfile, IdentityProviderError>;
}
