use axum::{
    Form,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use super::WebError;

/// `Form` for the toast-driven actions. A body that does not decode is
/// answered with a validation toast instead of axum's bare 422.
pub struct ActionForm<T>(pub T);

impl<T, S> FromRequest<S> for ActionForm<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|rejection| WebError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}
