//! Request extractors whose rejections use the application error body.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json<T>` that rejects with [`AppError::MalformedBody`] (400, JSON body)
/// instead of axum's plain-text 422.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
