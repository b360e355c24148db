//! Purchaser identity extraction.
//!
//! Authentication happens upstream; the proxy forwards the verified identity
//! in the `x-purchaser` header.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use domain::Purchaser;

use crate::error::ApiError;

/// Header carrying the authenticated purchaser.
pub const PURCHASER_HEADER: &str = "x-purchaser";

/// The purchaser making the request. Rejects with 401 when absent.
#[derive(Debug, Clone)]
pub struct Caller(pub Purchaser);

impl Caller {
    fn from_parts(parts: &Parts) -> Result<Option<Self>, ApiError> {
        let Some(value) = parts.headers.get(PURCHASER_HEADER) else {
            return Ok(None);
        };
        let value = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Invalid purchaser header".to_string()))?;
        let purchaser =
            Purchaser::new(value).map_err(|e| ApiError::Unauthorized(e.to_string()))?;
        Ok(Some(Caller(purchaser)))
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_parts(parts)?
            .ok_or_else(|| ApiError::Unauthorized("Purchaser identity required".to_string()))
    }
}

impl<S> OptionalFromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Caller::from_parts(parts)
    }
}
