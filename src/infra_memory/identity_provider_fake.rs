use crate::domain_port::{
    IdentityProvider, IdentityProviderError, ProviderProfile, ProviderTokens,
};
use std::sync::Mutex;

/// Minimal fake provider for tests and local development. Hands out the
/// configured profile for any grant and records refresh calls so tests can
/// observe the detached profile-refresh task.
pub struct FakeIdentityProvider {
    profile: Mutex<ProviderProfile>,
    refresh_calls: Mutex<Vec<String>>,
}

impl FakeIdentityProvider {
    pub fn new(profile: ProviderProfile) -> Self {
        FakeIdentityProvider {
            profile: Mutex::new(profile),
            refresh_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_profile(&self, profile: ProviderProfile) {
        *self.profile.lock().unwrap() = profile;
    }

    pub fn refresh_calls(&self) -> Vec<String> {
        self.refresh_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://provider.invalid/authorize?state={state}")
    }

    async fn exchange(&self, code: &str) -> Result<ProviderTokens, IdentityProviderError> {
        if code.is_empty() || code == "denied" {
            return Err(IdentityProviderError::Rejected);
        }
        Ok(ProviderTokens {
            access_token: format!("fake-provider-access:{code}"),
            refresh_token: format!("fake-provider-refresh:{code}"),
        })
    }

    async fn fetch_profile(
        &self,
        _access_token: &str,
    ) -> Result<ProviderProfile, IdentityProviderError> {
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn refresh_profile(
        &self,
        refresh_token: &str,
    ) -> Result<ProviderProfile, IdentityProviderError> {
        self.refresh_calls
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        Ok(self.profile.lock().unwrap().clone())
    }
}
