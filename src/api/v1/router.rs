use super::cookie::{OAUTH_STATE_COOKIE, SESSION_COOKIE, SessionCookieCodec};
use super::error::*;
use super::handler;
use crate::application_port::{AuthContext, AuthService};
use crate::domain_model::UserId;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let register = warp::post()
        .and(warp::path!("auth" / "register"))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_codec.clone()))
        .and_then(handler::register);

    let login = warp::post()
        .and(warp::path!("auth" / "login"))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_codec.clone()))
        .and_then(handler::login);

    let google_login = warp::get()
        .and(warp::path!("auth" / "google" / "login"))
        .and(with(server.identity_provider.clone()))
        .and_then(handler::google_login);

    let google_callback = warp::get()
        .and(warp::path!("auth" / "google" / "callback"))
        .and(warp::query::<handler::OAuthCallbackQuery>())
        .and(warp::cookie::optional(OAUTH_STATE_COOKIE))
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_codec.clone()))
        .and_then(handler::google_callback);

    let logout = warp::post()
        .and(warp::path!("auth" / "logout"))
        .and(warp::cookie::optional(SESSION_COOKIE))
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_codec.clone()))
        .and_then(handler::logout);

    let get_me = warp::get()
        .and(warp::path!("me"))
        .and(with_session_auth(
            server.auth_service.clone(),
            server.cookie_codec.clone(),
        ))
        .and(with(server.user_service.clone()))
        .and(with(server.cookie_codec.clone()))
        .and_then(handler::get_me);

    let update_me = warp::patch()
        .and(warp::path!("me"))
        .and(warp::body::json())
        .and(with_session_auth(
            server.auth_service.clone(),
            server.cookie_codec.clone(),
        ))
        .and(with(server.user_service.clone()))
        .and(with(server.cookie_codec.clone()))
        .and_then(handler::update_me);

    let delete_me = warp::delete()
        .and(warp::path!("me"))
        .and(with_session_auth(
            server.auth_service.clone(),
            server.cookie_codec.clone(),
        ))
        .and(with(server.user_service.clone()))
        .and_then(handler::delete_me);

    let list_sessions = warp::get()
        .and(warp::path!("me" / "sessions"))
        .and(with_session_auth(
            server.auth_service.clone(),
            server.cookie_codec.clone(),
        ))
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_codec.clone()))
        .and_then(handler::list_my_sessions);

    let revoke_session = warp::delete()
        .and(warp::path!("me" / "sessions" / String))
        .and(with_session_auth(
            server.auth_service.clone(),
            server.cookie_codec.clone(),
        ))
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_codec.clone()))
        .and_then(handler::revoke_my_session);

    // User reads are public; only the /me surface requires a session.
    let find_user = warp::get()
        .and(warp::path!("users" / UserId))
        .and(with(server.user_service.clone()))
        .and_then(handler::find_user);

    let find_all_users = warp::get()
        .and(warp::path!("users"))
        .and(with(server.user_service.clone()))
        .and_then(handler::find_all_users);

    register
        .or(login)
        .or(google_login)
        .or(google_callback)
        .or(logout)
        .or(get_me)
        .or(update_me)
        .or(delete_me)
        .or(list_sessions)
        .or(revoke_session)
        .or(find_user)
        .or(find_all_users)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Extracts the `session` cookie, checks its signature, and runs it through
/// the authentication guard. Handlers receive the resolved `AuthContext`;
/// a renewed token pair (if the guard rotated) is attached to the reply by
/// the handler.
fn with_session_auth(
    auth_service: Arc<dyn AuthService>,
    codec: Arc<SessionCookieCodec>,
) -> impl Filter<Extract = (AuthContext,), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).and_then(move |raw: Option<String>| {
        let auth_service = auth_service.clone();
        let codec = codec.clone();
        async move {
            let raw = raw.ok_or_else(|| reject::custom(ApiErrorCode::Unauthorized))?;
            let tokens = codec
                .decode(&raw)
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)?;
            auth_service
                .authenticate(&tokens)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Auth, Database, Google, Http, Log, Redis, Settings, Store};

    fn settings() -> Settings {
        Settings {
            auth: Auth {
                access_ttl_secs: 3600,
                refresh_ttl_secs: 604800,
            },
            database: Database { dsn: String::new() },
            google: Google {
                backend: "fake".to_string(),
                client_id: String::new(),
                redirect_url: "https://localhost/api/v1/auth/google/callback".to_string(),
            },
            http: Http {
                cert_path: String::new(),
                key_path: String::new(),
                address: "127.0.0.1:0".to_string(),
            },
            log: Log {
                filter: "info".to_string(),
            },
            redis: Redis { dsn: String::new() },
            store: Store {
                backend: "memory".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn user_reads_need_no_session_cookie() {
        let server = Arc::new(Server::try_new(&settings()).await.unwrap());
        let api = routes(server).recover(recover_error);

        let response = warp::test::request()
            .method("GET")
            .path("/users")
            .reply(&api)
            .await;
        assert_eq!(200, response.status());

        // An unknown id reaches the handler and reports 404, not 401.
        let response = warp::test::request()
            .method("GET")
            .path(&format!("/users/{}", uuid::Uuid::new_v4()))
            .reply(&api)
            .await;
        assert_eq!(404, response.status());
    }

    #[tokio::test]
    async fn me_requires_a_session_cookie() {
        let server = Arc::new(Server::try_new(&settings()).await.unwrap());
        let api = routes(server).recover(recover_error);

        let response = warp::test::request()
            .method("GET")
            .path("/me")
            .reply(&api)
            .await;
        assert_eq!(401, response.status());
    }
}
