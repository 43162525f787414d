//! Session cookie transport and the middleware that resolves it to a user.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_sessions::cookie::{Cookie, SameSite};

use super::{AppState, WebError};
use crate::db::User;

pub const SESSION_COOKIE: &str = "auth_session";

/// The authenticated account, inserted into request extensions by
/// [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Set on the response by [`require_user`] so the request logging middleware
/// can attach the account to its span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity(pub String);

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

#[must_use]
pub fn session_cookie(token: String, secure: bool, ttl_days: u32) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(i64::from(ttl_days)))
        .build()
}

#[must_use]
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::ZERO)
        .build()
}

/// First `X-Forwarded-For` hop, else the peer address when the server was
/// started with connect info.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// Resolves the session cookie or turns the request away. Page loads are
/// redirected to `/login`; actions and partials get a 401 toast.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match session_token(request.headers()) {
        Some(token) => match state.auth().authenticate(&token).await {
            Ok(user) => user,
            Err(e) => return WebError::from(e).into_response(),
        },
        None => None,
    };

    let Some(user) = user else {
        let is_page_load =
            request.method() == Method::GET && !request.headers().contains_key("hx-request");
        return if is_page_load {
            Redirect::to("/login").into_response()
        } else {
            WebError::not_logged_in().into_response()
        };
    };

    let identity = AuthenticatedIdentity(user.email.clone());
    request.extensions_mut().insert(CurrentUser(user));

    let mut response = next.run(request).await;
    response.extensions_mut().insert(identity);
    response
}
