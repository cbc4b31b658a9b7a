//! Body extractors whose rejections render as validation errors.

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON body; malformed input becomes a 400 `Validation` error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Form body; malformed input or missing fields become a 400 `Validation` error.
#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(AppError))]
pub struct AppForm<T>(pub T);
