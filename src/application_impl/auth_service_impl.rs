use crate::application_port::{
    AuthContext, AuthError, AuthService, AuthTokens, CredentialHasher, LoginInput, LoginResult,
    RegisterInput, SessionTokens, TokenMinter,
};
use crate::domain_model::{Session, SessionId, User, UserId, UserPatch};
use crate::domain_port::{
    IdentityProvider, IdentityProviderError, SessionStore, SessionStoreError, UserRepo,
    UserRepoError,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    session_store: Arc<dyn SessionStore>,
    token_minter: Arc<dyn TokenMinter>,
    identity_provider: Arc<dyn IdentityProvider>,
    credential_hasher: Arc<dyn CredentialHasher>,
    background: TaskTracker,
    cancel: CancellationToken,
    config: AuthConfig,
}

impl RealAuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        session_store: Arc<dyn SessionStore>,
        token_minter: Arc<dyn TokenMinter>,
        identity_provider: Arc<dyn IdentityProvider>,
        credential_hasher: Arc<dyn CredentialHasher>,
        background: TaskTracker,
        cancel: CancellationToken,
        config: AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            session_store,
            token_minter,
            identity_provider,
            credential_hasher,
            background,
            cancel,
            config,
        }
    }

    fn validate_register(&self, input: &RegisterInput) -> Result<(), AuthError> {
        if !input.email.contains('@') {
            return Err(AuthError::InvalidData("invalid email".to_string()));
        }
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidData("password too short".to_string()));
        }
        Ok(())
    }

    /// Mint a fresh access+refresh pair and persist the Session keyed by the
    /// refresh token's jti. `created_at` is inherited across rotations.
    async fn issue_session(
        &self,
        user_id: UserId,
        provider_refresh_token: String,
        created_at: DateTime<Utc>,
    ) -> Result<AuthTokens, AuthError> {
        let (access_token, access_claims) = self
            .token_minter
            .create_token(user_id, self.config.access_ttl)
            .await?;
        let (refresh_token, refresh_claims) = self
            .token_minter
            .create_token(user_id, self.config.refresh_ttl)
            .await?;

        let session = Session {
            id: SessionId(refresh_claims.jti.clone()),
            user_id,
            provider_refresh_token,
            is_revoked: false,
            created_at,
            expires_at: refresh_claims.expires_at,
        };
        self.session_store
            .create(&session)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            access_token_expires_at: access_claims.expires_at,
            refresh_token_expires_at: refresh_claims.expires_at,
        })
    }

    /// Detached best-effort refresh of cached profile fields from the
    /// identity provider. Never blocks or fails the request that spawned
    /// it; failures are logged only. At shutdown the task gets a bounded
    /// drain window before cancellation.
    fn spawn_profile_refresh(&self, user_id: UserId, refresh_credential: String) {
        if refresh_credential.is_empty() {
            return;
        }
        let provider = self.identity_provider.clone();
        let user_repo = self.user_repo.clone();
        let cancel = self.cancel.clone();

        self.background.spawn(async move {
            let work = async {
                let profile = provider
                    .refresh_profile(&refresh_credential)
                    .await
                    .map_err(|e| e.to_string())?;
                let patch = UserPatch {
                    name: Some(profile.name),
                    given_name: Some(profile.given_name),
                    family_name: Some(profile.family_name),
                    picture_url: Some(profile.picture_url),
                };
                user_repo
                    .update(user_id, &patch)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok::<(), String>(())
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(%user_id, "profile refresh cancelled at shutdown");
                }
                result = work => {
                    if let Err(e) = result {
                        warn!(%user_id, "profile refresh failed: {e}");
                    }
                }
            }
        });
    }

    fn profile_patch(profile: &crate::domain_port::ProviderProfile) -> UserPatch {
        UserPatch {
            name: Some(profile.name.clone()),
            given_name: Some(profile.given_name.clone()),
            family_name: Some(profile.family_name.clone()),
            picture_url: Some(profile.picture_url.clone()),
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, input: RegisterInput) -> Result<LoginResult, AuthError> {
        self.validate_register(&input)?;

        match self.user_repo.find_by_email(&input.email).await {
            Ok(_) => return Err(AuthError::EmailTaken),
            Err(UserRepoError::NotFound) => {}
            Err(e) => return Err(AuthError::Store(e.to_string())),
        }

        let password_hash = self.credential_hasher.hash_password(&input.password).await?;
        let now = Utc::now();
        let user = User {
            id: UserId(Uuid::new_v4()),
            email: input.email,
            password_hash,
            name: input.name,
            given_name: input.given_name,
            family_name: input.family_name,
            picture_url: input.picture_url,
            created_at: now,
        };
        match self.user_repo.create(&user).await {
            Ok(()) => {}
            Err(UserRepoError::AlreadyExists) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(AuthError::Store(e.to_string())),
        }

        let tokens = self.issue_session(user.id, String::new(), now).await?;
        Ok(LoginResult {
            user_id: user.id,
            tokens,
        })
    }

    async fn login(&self, input: LoginInput) -> Result<LoginResult, AuthError> {
        let user = match self.user_repo.find_by_email(&input.email).await {
            Ok(user) => user,
            Err(UserRepoError::NotFound) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(AuthError::Store(e.to_string())),
        };

        // Provider-created accounts have no local password.
        if user.password_hash.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        let ok = self
            .credential_hasher
            .verify_password(&input.password, &user.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_session(user.id, String::new(), Utc::now()).await?;
        Ok(LoginResult {
            user_id: user.id,
            tokens,
        })
    }

    async fn login_with_provider(&self, code: &str) -> Result<LoginResult, AuthError> {
        let provider_tokens = match self.identity_provider.exchange(code).await {
            Ok(tokens) => tokens,
            Err(IdentityProviderError::Rejected) => {
                debug!("provider rejected authorization code");
                return Err(AuthError::Unauthorized);
            }
            Err(IdentityProviderError::Unavailable(e)) => return Err(AuthError::Provider(e)),
        };
        let profile = match self
            .identity_provider
            .fetch_profile(&provider_tokens.access_token)
            .await
        {
            Ok(profile) => profile,
            Err(IdentityProviderError::Rejected) => return Err(AuthError::Unauthorized),
            Err(IdentityProviderError::Unavailable(e)) => return Err(AuthError::Provider(e)),
        };
        if !profile.email_verified {
            debug!("provider profile email not verified");
            return Err(AuthError::Unauthorized);
        }

        let user = match self.user_repo.find_by_email(&profile.email).await {
            Ok(user) => {
                self.user_repo
                    .update(user.id, &Self::profile_patch(&profile))
                    .await
                    .map_err(|e| AuthError::Store(e.to_string()))?
            }
            Err(UserRepoError::NotFound) => {
                let user = User {
                    id: UserId(Uuid::new_v4()),
                    email: profile.email.clone(),
                    password_hash: String::new(),
                    name: profile.name.clone(),
                    given_name: profile.given_name.clone(),
                    family_name: profile.family_name.clone(),
                    picture_url: profile.picture_url.clone(),
                    created_at: Utc::now(),
                };
                match self.user_repo.create(&user).await {
                    Ok(()) => user,
                    Err(UserRepoError::AlreadyExists) => return Err(AuthError::EmailTaken),
                    Err(e) => return Err(AuthError::Store(e.to_string())),
                }
            }
            Err(e) => return Err(AuthError::Store(e.to_string())),
        };

        let tokens = self
            .issue_session(user.id, provider_tokens.refresh_token, Utc::now())
            .await?;
        Ok(LoginResult {
            user_id: user.id,
            tokens,
        })
    }

    async fn authenticate(&self, tokens: &SessionTokens) -> Result<AuthContext, AuthError> {
        // Fast path: a valid access token authorizes with no store I/O. A
        // deleted user keeps riding an already-issued access token for at
        // most one access ttl; accepted trade-off of the stateless design.
        if let Ok(claims) = self.token_minter.verify_token(&tokens.access_token).await {
            return Ok(AuthContext {
                user_id: claims.subject,
                renewed: None,
            });
        }

        let refresh_claims = match self.token_minter.verify_token(&tokens.refresh_token).await {
            Ok(claims) => claims,
            Err(_) => {
                debug!("refresh token failed verification");
                return Err(AuthError::Unauthorized);
            }
        };
        let user_id = refresh_claims.subject;

        match self.user_repo.find_by_id(user_id).await {
            Ok(_) => {}
            Err(UserRepoError::NotFound) => {
                debug!(%user_id, "refresh token for unknown user");
                return Err(AuthError::Unauthorized);
            }
            Err(e) => return Err(AuthError::Store(e.to_string())),
        }

        let session_id = SessionId(refresh_claims.jti.clone());
        let session = match self.session_store.find_by_id(&session_id).await {
            Ok(session) => session,
            Err(SessionStoreError::NotFound) => {
                debug!(%user_id, session = %session_id, "refresh session missing or expired");
                return Err(AuthError::Unauthorized);
            }
            Err(e) => return Err(AuthError::Store(e.to_string())),
        };
        if session.is_revoked || session.user_id != user_id {
            debug!(%user_id, session = %session_id, "refresh session revoked or mismatched");
            return Err(AuthError::Unauthorized);
        }

        // Revoke the parent before minting replacements: no new pair is
        // issued unless the predecessor is confirmed revoked, and the
        // conditional transition lets only one concurrent presenter through.
        match self.session_store.revoke(&session_id).await {
            Ok(()) => {}
            Err(SessionStoreError::NotFound) | Err(SessionStoreError::AlreadyRevoked) => {
                debug!(%user_id, session = %session_id, "lost rotation race");
                return Err(AuthError::Unauthorized);
            }
            Err(SessionStoreError::Store(e)) => return Err(AuthError::Store(e)),
        }

        let renewed = self
            .issue_session(
                user_id,
                session.provider_refresh_token.clone(),
                session.created_at,
            )
            .await?;

        self.spawn_profile_refresh(user_id, session.provider_refresh_token);

        Ok(AuthContext {
            user_id,
            renewed: Some(renewed),
        })
    }

    async fn logout(&self, tokens: &SessionTokens) -> Result<(), AuthError> {
        let claims = self
            .token_minter
            .verify_token(&tokens.refresh_token)
            .await
            .map_err(|_| AuthError::Unauthorized)?;

        match self
            .session_store
            .delete(&SessionId(claims.jti.clone()))
            .await
        {
            Ok(()) | Err(SessionStoreError::NotFound) => Ok(()),
            Err(e) => Err(AuthError::Store(e.to_string())),
        }
    }

    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<Session>, AuthError> {
        self.session_store
            .find_by_user_id(user_id)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    async fn revoke_session(&self, user_id: UserId, id: &SessionId) -> Result<(), AuthError> {
        let session = match self.session_store.find_by_id(id).await {
            Ok(session) => session,
            Err(SessionStoreError::NotFound) => return Err(AuthError::SessionNotFound),
            Err(e) => return Err(AuthError::Store(e.to_string())),
        };
        // Existence of other users' sessions is not disclosed.
        if session.user_id != user_id {
            return Err(AuthError::SessionNotFound);
        }

        match self.session_store.revoke(id).await {
            Ok(()) | Err(SessionStoreError::AlreadyRevoked) => Ok(()),
            Err(SessionStoreError::NotFound) => Err(AuthError::SessionNotFound),
            Err(SessionStoreError::Store(e)) => Err(AuthError::Store(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2PasswordHasher, JwtHs256Minter};
    use crate::domain_port::ProviderProfile;
    use crate::infra_memory::{FakeIdentityProvider, MemorySessionStore, MemoryUserRepo};

    struct Harness {
        service: Arc<RealAuthService>,
        store: Arc<MemorySessionStore>,
        user_repo: Arc<MemoryUserRepo>,
        provider: Arc<FakeIdentityProvider>,
        minter: Arc<JwtHs256Minter>,
        tracker: TaskTracker,
    }

    fn profile(email: &str, name: &str) -> ProviderProfile {
        ProviderProfile {
            email: email.to_string(),
            email_verified: true,
            name: name.to_string(),
            given_name: name.to_string(),
            family_name: "Example".to_string(),
            picture_url: "https://pictures.invalid/p.png".to_string(),
        }
    }

    fn harness() -> Harness {
        let store = Arc::new(MemorySessionStore::new());
        let user_repo = Arc::new(MemoryUserRepo::new());
        let provider = Arc::new(FakeIdentityProvider::new(profile("ada@example.com", "Ada")));
        let minter = Arc::new(JwtHs256Minter::new(b"test-signing-key"));
        let tracker = TaskTracker::new();
        let service = Arc::new(RealAuthService::new(
            user_repo.clone(),
            store.clone(),
            minter.clone(),
            provider.clone(),
            Arc::new(Argon2PasswordHasher),
            tracker.clone(),
            CancellationToken::new(),
            AuthConfig {
                access_ttl: Duration::from_secs(3600),
                refresh_ttl: Duration::from_secs(7 * 24 * 3600),
            },
        ));
        Harness {
            service,
            store,
            user_repo,
            provider,
            minter,
            tracker,
        }
    }

    async fn register(h: &Harness) -> LoginResult {
        h.service
            .register(RegisterInput {
                email: "ada@example.com".to_string(),
                password: "correct horse".to_string(),
                name: "Ada".to_string(),
                given_name: "Ada".to_string(),
                family_name: "Lovelace".to_string(),
                picture_url: String::new(),
            })
            .await
            .unwrap()
    }

    fn broken_access(tokens: &AuthTokens) -> SessionTokens {
        SessionTokens {
            access_token: "garbage".to_string(),
            refresh_token: tokens.refresh_token.clone(),
        }
    }

    #[tokio::test]
    async fn login_creates_session_bound_to_refresh_jti() {
        let h = harness();
        let registered = register(&h).await;

        let result = h
            .service
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(registered.user_id, result.user_id);

        let claims = h.minter.verify_token(&result.tokens.refresh_token).await.unwrap();
        let session = h
            .store
            .find_by_id(&SessionId(claims.jti))
            .await
            .unwrap();
        assert_eq!(result.user_id, session.user_id);
        assert_eq!(claims.expires_at, session.expires_at);
        assert!(session.provider_refresh_token.is_empty());
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let h = harness();
        register(&h).await;

        let err = h
            .service
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "wrong horse".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn valid_access_token_takes_the_fast_path() {
        let h = harness();
        let result = register(&h).await;

        let ctx = h
            .service
            .authenticate(&SessionTokens::from(&result.tokens))
            .await
            .unwrap();
        assert_eq!(result.user_id, ctx.user_id);
        assert!(ctx.renewed.is_none());
    }

    #[tokio::test]
    async fn rotation_revokes_parent_and_inherits_created_at() {
        let h = harness();
        let result = register(&h).await;
        let parent_claims = h.minter.verify_token(&result.tokens.refresh_token).await.unwrap();
        let parent = h
            .store
            .find_by_id(&SessionId(parent_claims.jti.clone()))
            .await
            .unwrap();

        let ctx = h
            .service
            .authenticate(&broken_access(&result.tokens))
            .await
            .unwrap();
        assert_eq!(result.user_id, ctx.user_id);
        let renewed = ctx.renewed.expect("rotation must mint a new pair");

        let revoked = h
            .store
            .find_by_id(&SessionId(parent_claims.jti))
            .await
            .unwrap();
        assert!(revoked.is_revoked);

        let child_claims = h.minter.verify_token(&renewed.refresh_token).await.unwrap();
        let child = h
            .store
            .find_by_id(&SessionId(child_claims.jti))
            .await
            .unwrap();
        assert_eq!(parent.created_at, child.created_at);
        assert!(!child.is_revoked);
    }

    #[tokio::test]
    async fn replayed_refresh_token_is_rejected() {
        let h = harness();
        let result = register(&h).await;
        let stale = broken_access(&result.tokens);

        h.service.authenticate(&stale).await.unwrap();
        let err = h.service.authenticate(&stale).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn concurrent_replay_has_one_winner() {
        let h = harness();
        let result = register(&h).await;
        let stale = broken_access(&result.tokens);

        let a = {
            let service = h.service.clone();
            let tokens = stale.clone();
            tokio::spawn(async move { service.authenticate(&tokens).await })
        };
        let b = {
            let service = h.service.clone();
            let tokens = stale.clone();
            tokio::spawn(async move { service.authenticate(&tokens).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_eq!(1, [&a, &b].iter().filter(|r| r.is_ok()).count());
        for r in [a, b] {
            if let Err(e) = r {
                assert!(matches!(e, AuthError::Unauthorized));
            }
        }
    }

    #[tokio::test]
    async fn revoked_session_is_rejected() {
        let h = harness();
        let result = register(&h).await;
        let claims = h.minter.verify_token(&result.tokens.refresh_token).await.unwrap();
        h.store.revoke(&SessionId(claims.jti)).await.unwrap();

        let err = h
            .service
            .authenticate(&broken_access(&result.tokens))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn deleted_user_with_live_refresh_token_is_rejected() {
        let h = harness();
        let result = register(&h).await;
        h.user_repo.delete(result.user_id).await.unwrap();

        let err = h
            .service
            .authenticate(&broken_access(&result.tokens))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn bad_refresh_token_is_rejected() {
        let h = harness();
        register(&h).await;

        let err = h
            .service
            .authenticate(&SessionTokens {
                access_token: "garbage".to_string(),
                refresh_token: "also garbage".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    /// Delegates everything to a real memory store but fails `revoke`,
    /// simulating an unreachable store mid-rotation.
    struct RevokeFailsStore {
        inner: MemorySessionStore,
    }

    #[async_trait::async_trait]
    impl SessionStore for RevokeFailsStore {
        async fn create(&self, session: &Session) -> Result<(), SessionStoreError> {
            self.inner.create(session).await
        }
        async fn find_by_id(&self, id: &SessionId) -> Result<Session, SessionStoreError> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_user_id(
            &self,
            user_id: UserId,
        ) -> Result<Vec<Session>, SessionStoreError> {
            self.inner.find_by_user_id(user_id).await
        }
        async fn revoke(&self, _id: &SessionId) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::Store("connection refused".to_string()))
        }
        async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn store_failure_during_rotation_fails_closed_as_server_error() {
        let store = Arc::new(RevokeFailsStore {
            inner: MemorySessionStore::new(),
        });
        let user_repo = Arc::new(MemoryUserRepo::new());
        let minter = Arc::new(JwtHs256Minter::new(b"test-signing-key"));
        let service = RealAuthService::new(
            user_repo.clone(),
            store.clone(),
            minter.clone(),
            Arc::new(FakeIdentityProvider::new(profile("ada@example.com", "Ada"))),
            Arc::new(Argon2PasswordHasher),
            TaskTracker::new(),
            CancellationToken::new(),
            AuthConfig {
                access_ttl: Duration::from_secs(3600),
                refresh_ttl: Duration::from_secs(7 * 24 * 3600),
            },
        );

        let result = service
            .register(RegisterInput {
                email: "ada@example.com".to_string(),
                password: "correct horse".to_string(),
                name: "Ada".to_string(),
                given_name: String::new(),
                family_name: String::new(),
                picture_url: String::new(),
            })
            .await
            .unwrap();

        // The credential may well be valid; an unreachable store must never
        // map to "unauthorized, log in again".
        let err = service
            .authenticate(&broken_access(&result.tokens))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[tokio::test]
    async fn logout_deletes_the_session() {
        let h = harness();
        let result = register(&h).await;
        let claims = h.minter.verify_token(&result.tokens.refresh_token).await.unwrap();

        h.service
            .logout(&SessionTokens::from(&result.tokens))
            .await
            .unwrap();

        assert!(matches!(
            h.store.find_by_id(&SessionId(claims.jti)).await,
            Err(SessionStoreError::NotFound)
        ));
        let err = h
            .service
            .authenticate(&broken_access(&result.tokens))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn provider_login_registers_once_then_updates() {
        let h = harness();

        let first = h.service.login_with_provider("code-1").await.unwrap();
        h.provider.set_profile(profile("ada@example.com", "Ada L."));
        let second = h.service.login_with_provider("code-2").await.unwrap();

        assert_eq!(first.user_id, second.user_id);
        let users = h.user_repo.find_all().await.unwrap();
        assert_eq!(1, users.len());
        assert_eq!("Ada L.", users[0].name);
        assert!(users[0].password_hash.is_empty());

        let claims = h.minter.verify_token(&second.tokens.refresh_token).await.unwrap();
        let session = h.store.find_by_id(&SessionId(claims.jti)).await.unwrap();
        assert_eq!("fake-provider-refresh:code-2", session.provider_refresh_token);
    }

    #[tokio::test]
    async fn unverified_provider_email_is_rejected() {
        let h = harness();
        h.provider.set_profile(ProviderProfile {
            email_verified: false,
            ..profile("mallory@example.com", "Mallory")
        });

        let err = h.service.login_with_provider("code-1").await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn rotation_refreshes_profile_in_the_background() {
        let h = harness();
        let result = h.service.login_with_provider("code-1").await.unwrap();

        h.provider.set_profile(profile("ada@example.com", "Ada Renamed"));
        h.service
            .authenticate(&broken_access(&result.tokens))
            .await
            .unwrap();

        h.tracker.close();
        h.tracker.wait().await;

        assert_eq!(
            vec!["fake-provider-refresh:code-1".to_string()],
            h.provider.refresh_calls()
        );
        let user = h.user_repo.find_by_id(result.user_id).await.unwrap();
        assert_eq!("Ada Renamed", user.name);
    }

    #[tokio::test]
    async fn password_login_does_not_touch_the_provider() {
        let h = harness();
        let result = register(&h).await;

        h.service
            .authenticate(&broken_access(&result.tokens))
            .await
            .unwrap();
        h.tracker.close();
        h.tracker.wait().await;

        assert!(h.provider.refresh_calls().is_empty());
    }

    #[tokio::test]
    async fn revoke_session_checks_ownership() {
        let h = harness();
        let ada = register(&h).await;
        let bob = h
            .service
            .register(RegisterInput {
                email: "bob@example.com".to_string(),
                password: "correct horse".to_string(),
                name: "Bob".to_string(),
                given_name: String::new(),
                family_name: String::new(),
                picture_url: String::new(),
            })
            .await
            .unwrap();

        let ada_claims = h.minter.verify_token(&ada.tokens.refresh_token).await.unwrap();
        let ada_session = SessionId(ada_claims.jti);

        let err = h
            .service
            .revoke_session(bob.user_id, &ada_session)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));

        h.service
            .revoke_session(ada.user_id, &ada_session)
            .await
            .unwrap();
        assert!(h.store.find_by_id(&ada_session).await.unwrap().is_revoked);
        // Idempotent from the owner's side.
        h.service
            .revoke_session(ada.user_id, &ada_session)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_sessions_returns_only_live_records() {
        let h = harness();
        let result = register(&h).await;
        h.service
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        let sessions = h.service.list_sessions(result.user_id).await.unwrap();
        assert_eq!(2, sessions.len());

        let claims = h.minter.verify_token(&result.tokens.refresh_token).await.unwrap();
        h.store.delete(&SessionId(claims.jti)).await.unwrap();

        let sessions = h.service.list_sessions(result.user_id).await.unwrap();
        assert_eq!(1, sessions.len());
    }
}
