use axum::{Extension, extract::State, response::Html};
use chrono::{Days, Utc};
use std::sync::Arc;

use super::pages;
use super::session::CurrentUser;
use super::{AppState, WebError};
use crate::db::User;
use crate::domain::{Role, UsageLog};

async fn todays_logs(state: &AppState) -> Result<Vec<UsageLog>, WebError> {
    let today = Utc::now().date_naive();
    let start = today.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_days(Days::new(1))
        .ok_or_else(|| WebError::internal("date overflow"))?;

    Ok(state.occupancy().logs_between(start, end).await?)
}

async fn assignable_users(state: &AppState, viewer: &User) -> Result<Vec<User>, WebError> {
    if !viewer.role.can_assign() {
        return Ok(Vec::new());
    }
    Ok(state.auth().list_users_by_role(&[Role::User]).await?)
}

/// GET /dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Html<String>, WebError> {
    let machines = state.occupancy().list_machines().await?;
    let assignable = assignable_users(&state, &user).await?;
    let logs = todays_logs(&state).await?;

    Ok(Html(pages::dashboard_page(
        &user,
        &machines,
        &assignable,
        &logs,
    )))
}

/// GET /partials/machines
pub async fn machines_partial(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Html<String>, WebError> {
    let machines = state.occupancy().list_machines().await?;
    let assignable = assignable_users(&state, &user).await?;

    Ok(Html(pages::machines_partial(&user, &machines, &assignable)))
}

/// GET /partials/logs
pub async fn logs_partial(State(state): State<Arc<AppState>>) -> Result<Html<String>, WebError> {
    let logs = todays_logs(&state).await?;
    Ok(Html(pages::logs_partial(&logs)))
}
