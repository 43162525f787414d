use axum::{
    Extension, Form,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

use super::AppState;
use super::pages;
use super::session::{client_ip, removal_cookie, session_cookie, session_token};
use crate::services::AuthError;

#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub message: Option<String>,
    pub msg_type: Option<String>,
}

/// GET /
pub async fn home(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let logged_in = match session_token(&headers) {
        Some(token) => matches!(state.auth().authenticate(&token).await, Ok(Some(_))),
        None => false,
    };
    Redirect::to(if logged_in { "/dashboard" } else { "/login" }).into_response()
}

/// GET /register
pub async fn register_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::register_page(
        None,
        state.config().security.min_password_length,
    ))
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let min_len = state.config().security.min_password_length;

    match state
        .auth()
        .register(&form.name, &form.email, &form.password)
        .await
    {
        Ok(_) => Redirect::to("/login?message=Account%20created,%20please%20log%20in&msg_type=success")
            .into_response(),
        Err(AuthError::Validation(msg)) => (
            StatusCode::BAD_REQUEST,
            Html(pages::register_page(Some(&msg), min_len)),
        )
            .into_response(),
        Err(AuthError::Conflict(_)) => (
            StatusCode::CONFLICT,
            Html(pages::register_page(Some("Email already registered"), min_len)),
        )
            .into_response(),
        Err(e) => super::WebError::from(e).into_response(),
    }
}

/// GET /login
pub async fn login_page(Query(query): Query<LoginQuery>) -> Html<String> {
    let notice = query
        .message
        .as_deref()
        .map(|message| (query.msg_type.as_deref().unwrap_or("info"), message));
    Html(pages::login_page(notice))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let peer = connect_info.map(|Extension(ConnectInfo(addr))| addr);
    let ip = client_ip(&headers, peer);

    match state
        .auth()
        .login(&form.email, &form.password, ip.as_deref())
        .await
    {
        Ok(session) => {
            let config = state.config();
            let cookie = session_cookie(
                session.token,
                config.server.secure_cookies,
                config.security.session_ttl_days,
            );
            (
                [(header::SET_COOKIE, cookie.to_string())],
                Redirect::to("/dashboard"),
            )
                .into_response()
        }
        Err(AuthError::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            Html(pages::login_page(Some(("error", "Invalid email or password")))),
        )
            .into_response(),
        Err(e) => super::WebError::from(e).into_response(),
    }
}

/// GET /logout
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers)
        && let Err(e) = state.auth().revoke(&token).await
    {
        tracing::warn!("Failed to revoke session: {e}");
    }

    let cookie = removal_cookie(state.config().server.secure_cookies);
    (
        [(header::SET_COOKIE, cookie.to_string())],
        Redirect::to("/login"),
    )
        .into_response()
}
