use axum::{Extension, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use super::form::ActionForm;
use super::session::CurrentUser;
use super::toast::Toast;
use super::{AppState, WebError};

#[derive(Deserialize)]
pub struct PromoteForm {
    pub email: String,
    pub role: String,
}

/// POST /promote
pub async fn promote(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ActionForm(form): ActionForm<PromoteForm>,
) -> Result<Toast, WebError> {
    let promoted = state
        .auth()
        .promote(&user, &form.email, &form.role)
        .await?;

    let mut toast = Toast::success(format!("{} is now {}", promoted.email, promoted.role));
    toast.refresh = false;
    Ok(toast)
}
