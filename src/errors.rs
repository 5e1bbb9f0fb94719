use anyhow::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Raised when someone tries to edit, delete or decide on something that
/// hangs off a note they do not own.
#[derive(Debug, thiserror::Error)]
#[error("user {user_id} does not own note {note_id}")]
pub struct NotOwner {
    pub user_id: i32,
    pub note_id: i32,
}

#[derive(Debug)]
pub struct ServerError(Error);

impl ServerError {
    fn status(&self) -> StatusCode {
        if let Some(sqlx::Error::RowNotFound) = self.0.downcast_ref() {
            StatusCode::NOT_FOUND
        } else if self.0.downcast_ref::<NotOwner>().is_some() {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!(error = ?self.0, "not found");
                (StatusCode::NOT_FOUND, "Not found").into_response()
            }
            StatusCode::FORBIDDEN => {
                tracing::warn!(error = %self.0, "forbidden");
                (StatusCode::FORBIDDEN, "You cannot do that").into_response()
            }
            status => {
                tracing::error!(error = ?self.0, "request failed");
                (status, "Something went wrong").into_response()
            }
        }
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>`
// to turn them into `Result<_, ServerError>`. That way you don't need to do
// that manually.
impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
