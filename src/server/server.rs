use crate::api::v1::SessionCookieCodec;
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_google::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(5);

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub cookie_codec: Arc<SessionCookieCodec>,
    background: TaskTracker,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

fn env_secret(name: &str, dev_fallback: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| dev_fallback.to_string())
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});

        let jwt_key = env_secret("JWT_SIGNING_KEY", "my-dev-secret-key").into_bytes();
        let token_minter: Arc<dyn TokenMinter> = Arc::new(JwtHs256Minter::new(&jwt_key));

        let cookie_key = env_secret("COOKIE_SIGNING_KEY", "my-dev-cookie-key").into_bytes();
        let cookie_codec = Arc::new(SessionCookieCodec::new(cookie_key));

        let (user_repo, session_store, pool): (
            Arc<dyn UserRepo>,
            Arc<dyn SessionStore>,
            Option<Pool<MySql>>,
        ) = match settings.store.backend.as_str() {
            "memory" => (
                Arc::new(MemoryUserRepo::new()),
                Arc::new(MemorySessionStore::new()),
                None,
            ),
            "real" => {
                let redis_client = redis::Client::open(settings.redis.dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                let pool = Pool::<MySql>::connect(&settings.database.dsn).await?;
                (
                    Arc::new(MySqlUserRepo::new(pool.clone())),
                    Arc::new(RedisSessionStore::new(redis_manager, "auth")),
                    Some(pool),
                )
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let identity_provider: Arc<dyn IdentityProvider> = match settings.google.backend.as_str() {
            "fake" => Arc::new(FakeIdentityProvider::new(ProviderProfile {
                email: "dev@localhost".to_string(),
                email_verified: true,
                name: "Dev User".to_string(),
                given_name: "Dev".to_string(),
                family_name: "User".to_string(),
                picture_url: String::new(),
            })),
            "real" => Arc::new(GoogleIdentityProvider::new(
                settings.google.client_id.clone(),
                env_secret("GOOGLE_CLIENT_SECRET", ""),
                settings.google.redirect_url.clone(),
            )),
            other => return Err(anyhow::anyhow!("Unknown google backend: {}", other)),
        };

        let background = TaskTracker::new();
        let cancel = CancellationToken::new();

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo.clone(),
            session_store,
            token_minter,
            identity_provider.clone(),
            credential_hasher,
            background.clone(),
            cancel.clone(),
            AuthConfig {
                access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
                refresh_ttl: Duration::from_secs(settings.auth.refresh_ttl_secs),
            },
        ));

        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(user_repo));

        info!("server started");

        Ok(Self {
            auth_service,
            user_service,
            identity_provider,
            cookie_codec,
            background,
            cancel,
            pool,
        })
    }

    /// Gives in-flight profile-refresh tasks a bounded drain window, then
    /// cancels whatever is left. Redis index pruning is fire-and-forget and
    /// not covered by the drain.
    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.background.close();
        if tokio::time::timeout(SHUTDOWN_DRAIN, self.background.wait())
            .await
            .is_err()
        {
            warn!("background tasks did not drain in time, cancelling");
            self.cancel.cancel();
            self.background.wait().await;
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
