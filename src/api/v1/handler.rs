use super::cookie::*;
use super::error::*;
use crate::application_port::{
    AuthContext, AuthError, AuthService, LoginInput, RegisterInput, SessionTokens, UserService,
};
use crate::domain_model::{Session, SessionId, User, UserId, UserPatch};
use crate::domain_port::IdentityProvider;
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::{StatusCode, header};
use warp::{self, Reply, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub given_name: String,
    pub family_name: String,
    pub picture_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            given_name: user.given_name.clone(),
            family_name: user.family_name.clone(),
            picture_url: user.picture_url.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        SessionResponse {
            id: session.id.to_string(),
            is_revoked: session.is_revoked,
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// JSON body plus a freshly minted `session` cookie.
fn reply_logged_in(
    codec: &SessionCookieCodec,
    result: &crate::application_port::LoginResult,
) -> Result<warp::reply::Response, warp::Rejection> {
    let cookie_value = codec
        .encode(&SessionTokens::from(&result.tokens))
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    let response = ApiResponse::ok(LoginResponse {
        user_id: result.user_id,
        access_token_expires_at: result.tokens.access_token_expires_at,
        refresh_token_expires_at: result.tokens.refresh_token_expires_at,
    });

    Ok(warp::reply::with_header(
        warp::reply::json(&response),
        header::SET_COOKIE,
        session_cookie_header(&cookie_value, result.tokens.refresh_token_expires_at),
    )
    .into_response())
}

/// Wraps an authenticated reply; when the guard rotated the session, the
/// replacement cookie rides out on this response.
fn reply_with_session(
    codec: &SessionCookieCodec,
    ctx: &AuthContext,
    reply: impl warp::Reply,
) -> Result<warp::reply::Response, warp::Rejection> {
    let mut response = reply.into_response();
    if let Some(renewed) = &ctx.renewed {
        let cookie_value = codec
            .encode(&SessionTokens::from(renewed))
            .map_err(ApiErrorCode::from)
            .map_err(reject::custom)?;
        let cookie = session_cookie_header(&cookie_value, renewed.refresh_token_expires_at);
        let value = cookie
            .parse()
            .map_err(ApiErrorCode::internal)
            .map_err(reject::custom)?;
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

pub async fn register(
    body: RegisterInput,
    auth_service: Arc<dyn AuthService>,
    codec: Arc<SessionCookieCodec>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = auth_service
        .register(body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    reply_logged_in(&codec, &result)
}

pub async fn login(
    body: LoginInput,
    auth_service: Arc<dyn AuthService>,
    codec: Arc<SessionCookieCodec>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = auth_service
        .login(body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    reply_logged_in(&codec, &result)
}

pub async fn google_login(
    identity_provider: Arc<dyn IdentityProvider>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let state = nanoid!();
    let url = identity_provider.authorize_url(&state);

    let reply = warp::reply::with_status(warp::reply(), StatusCode::FOUND);
    let reply = warp::reply::with_header(reply, header::LOCATION, url);
    Ok(warp::reply::with_header(
        reply,
        header::SET_COOKIE,
        oauth_state_cookie_header(&state),
    ))
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub state: String,
    pub code: Option<String>,
}

pub async fn google_callback(
    query: OAuthCallbackQuery,
    state_cookie: Option<String>,
    auth_service: Arc<dyn AuthService>,
    codec: Arc<SessionCookieCodec>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // The state must round-trip through the cookie set at /google/login,
    // otherwise the callback was not initiated by us.
    if state_cookie.as_deref() != Some(query.state.as_str()) {
        return Err(reject::custom(ApiErrorCode::Unauthorized));
    }
    let code = query
        .code
        .ok_or_else(|| reject::custom(ApiErrorCode::InvalidData))?;

    let result = auth_service
        .login_with_provider(&code)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let mut response = reply_logged_in(&codec, &result)?;
    let clear = clear_oauth_state_cookie_header()
        .parse()
        .map_err(ApiErrorCode::internal)
        .map_err(reject::custom)?;
    response.headers_mut().append(header::SET_COOKIE, clear);
    Ok(response)
}

pub async fn logout(
    cookie: Option<String>,
    auth_service: Arc<dyn AuthService>,
    codec: Arc<SessionCookieCodec>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // An absent or unreadable cookie still logs out: the reply clears it
    // either way. Store failures do surface, so the client knows the
    // server-side session may have survived.
    if let Some(raw) = cookie {
        if let Ok(tokens) = codec.decode(&raw) {
            match auth_service.logout(&tokens).await {
                Ok(()) | Err(AuthError::Unauthorized) => {}
                Err(e) => {
                    return Err(reject::custom(ApiErrorCode::from(e)));
                }
            }
        }
    }

    Ok(warp::reply::with_header(
        warp::reply::json(&ApiResponse::ok(())),
        header::SET_COOKIE,
        clear_session_cookie_header(),
    ))
}

pub async fn get_me(
    ctx: AuthContext,
    user_service: Arc<dyn UserService>,
    codec: Arc<SessionCookieCodec>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .find_by_id(ctx.user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let json = warp::reply::json(&ApiResponse::ok(UserResponse::from(&user)));
    reply_with_session(&codec, &ctx, json)
}

pub async fn update_me(
    body: UserPatch,
    ctx: AuthContext,
    user_service: Arc<dyn UserService>,
    codec: Arc<SessionCookieCodec>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .update(ctx.user_id, &body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let json = warp::reply::json(&ApiResponse::ok(UserResponse::from(&user)));
    reply_with_session(&codec, &ctx, json)
}

pub async fn delete_me(
    ctx: AuthContext,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    user_service
        .delete(ctx.user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    // The account is gone; no point renewing the cookie.
    Ok(warp::reply::with_header(
        warp::reply::json(&ApiResponse::ok(())),
        header::SET_COOKIE,
        clear_session_cookie_header(),
    ))
}

pub async fn list_my_sessions(
    ctx: AuthContext,
    auth_service: Arc<dyn AuthService>,
    codec: Arc<SessionCookieCodec>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let sessions = auth_service
        .list_sessions(ctx.user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response: Vec<SessionResponse> = sessions.iter().map(SessionResponse::from).collect();
    let json = warp::reply::json(&ApiResponse::ok(response));
    reply_with_session(&codec, &ctx, json)
}

pub async fn revoke_my_session(
    id: String,
    ctx: AuthContext,
    auth_service: Arc<dyn AuthService>,
    codec: Arc<SessionCookieCodec>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .revoke_session(ctx.user_id, &SessionId(id))
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let json = warp::reply::json(&ApiResponse::ok(()));
    reply_with_session(&codec, &ctx, json)
}

pub async fn find_user(
    id: UserId,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .find_by_id(id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(UserResponse::from(
        &user,
    ))))
}

pub async fn find_all_users(
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let users = user_service
        .find_all()
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response: Vec<UserResponse> = users.iter().map(UserResponse::from).collect();
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}
