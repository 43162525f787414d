//! Machine actions. Each responds `204` with a toast on success; failures
//! come back as [`WebError`] toasts.

use axum::{Extension, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use super::form::ActionForm;
use super::session::CurrentUser;
use super::toast::Toast;
use super::{AppState, WebError};
use crate::domain::validation::parse_hours;
use crate::services::{ReleaseSummary, UsageRequest};

#[derive(Deserialize)]
pub struct IpForm {
    pub ip: String,
}

#[derive(Deserialize)]
pub struct UsageForm {
    pub ip: String,
    pub project: String,
    pub duration: String,
}

#[derive(Deserialize)]
pub struct AssignForm {
    pub ip: String,
    pub email: String,
    pub project: String,
    pub duration: String,
}

fn usage_request(project: String, duration: &str) -> Result<UsageRequest, WebError> {
    let hours = parse_hours(duration).map_err(|e| WebError::validation(e.0))?;
    Ok(UsageRequest::new(project, hours))
}

fn release_toast(summary: &ReleaseSummary) -> Toast {
    if summary.machine_freed {
        Toast::success(format!("Released {}, machine is free again", summary.log.ip))
    } else {
        Toast::success(format!("Released {}", summary.log.ip))
    }
}

/// POST /book
pub async fn book(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ActionForm(form): ActionForm<UsageForm>,
) -> Result<Toast, WebError> {
    let request = usage_request(form.project, &form.duration)?;
    let machine = state.occupancy().book(&user, &form.ip, request).await?;
    Ok(Toast::success(format!("Booked {}", machine.ip)))
}

/// POST /assign/free
pub async fn assign_free(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ActionForm(form): ActionForm<AssignForm>,
) -> Result<Toast, WebError> {
    let request = usage_request(form.project, &form.duration)?;
    let machine = state
        .occupancy()
        .assign_free(&user, &form.ip, &form.email, request)
        .await?;
    Ok(Toast::success(format!(
        "Assigned {} to {}",
        machine.ip,
        form.email.trim()
    )))
}

/// POST /assign/contribute
pub async fn assign_contribute(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ActionForm(form): ActionForm<AssignForm>,
) -> Result<Toast, WebError> {
    let request = usage_request(form.project, &form.duration)?;
    let contribution = state
        .occupancy()
        .assign_contributor(&user, &form.ip, &form.email, request)
        .await?;
    Ok(Toast::success(format!(
        "Added {} as contributor on {}",
        contribution.contributor, contribution.machine_ip
    )))
}

/// POST /self/contribute
pub async fn self_contribute(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ActionForm(form): ActionForm<UsageForm>,
) -> Result<Toast, WebError> {
    let request = usage_request(form.project, &form.duration)?;
    let contribution = state
        .occupancy()
        .self_contribute(&user, &form.ip, request)
        .await?;
    Ok(Toast::success(format!(
        "Contributing on {}",
        contribution.machine_ip
    )))
}

/// POST /release/main
pub async fn release_main(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ActionForm(form): ActionForm<IpForm>,
) -> Result<Toast, WebError> {
    let summary = state.occupancy().release_primary(&user, &form.ip).await?;
    Ok(release_toast(&summary))
}

/// POST /release/contrib
pub async fn release_contrib(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ActionForm(form): ActionForm<IpForm>,
) -> Result<Toast, WebError> {
    let summary = state
        .occupancy()
        .release_contribution(&user, &form.ip)
        .await?;
    Ok(release_toast(&summary))
}

/// POST /add/system
pub async fn add_system(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ActionForm(form): ActionForm<IpForm>,
) -> Result<Toast, WebError> {
    let ip = state.occupancy().add_machine(&user, &form.ip).await?;
    Ok(Toast::success(format!("Added {ip}")))
}

/// POST /remove/system
pub async fn remove_system(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ActionForm(form): ActionForm<IpForm>,
) -> Result<Toast, WebError> {
    let removed = state.occupancy().remove_machine(&user, &form.ip).await?;
    Ok(if removed {
        Toast::success(format!("Removed {}", form.ip.trim()))
    } else {
        Toast::info(format!("{} was not registered", form.ip.trim()))
    })
}
