//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CartServiceError, CheckoutError};
use domain::CartError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// No purchaser identity on the request.
    Unauthorized(String),
    /// The purchaser may not touch this resource.
    Forbidden(String),
    /// Cart management error.
    Cart(CartServiceError),
    /// Checkout error.
    Checkout(CheckoutError),
    /// Storage error.
    Store(StoreError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Cart(err) => cart_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn cart_error_to_response(err: CartServiceError) -> (StatusCode, String) {
    match &err {
        CartServiceError::CartNotFound(_) | CartServiceError::ItemNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        CartServiceError::ItemInactive(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CartServiceError::Cart(cart_err) => match cart_err {
            CartError::InvalidQuantity { .. } | CartError::QuantityTooLarge { .. } => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            CartError::LineNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        },
        CartServiceError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::CartNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CheckoutError::EmptyCart(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CheckoutError::Store(_) | CheckoutError::Record(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::CartNotFound(_) | StoreError::ItemNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<CartServiceError> for ApiError {
    fn from(err: CartServiceError) -> Self {
        ApiError::Cart(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::CartId;
    use domain::ItemId;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_checkout_error_statuses() {
        assert_eq!(
            status_of(CheckoutError::CartNotFound(CartId::new()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CheckoutError::EmptyCart(CartId::new()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CheckoutError::Store(StoreError::Unavailable("down".into())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_cart_error_statuses() {
        assert_eq!(
            status_of(CartServiceError::ItemInactive(ItemId::new("A")).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CartServiceError::Cart(CartError::LineNotFound { item_id: "A".into() }).into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_identity_statuses() {
        assert_eq!(
            status_of(ApiError::Unauthorized("missing".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Forbidden("not yours".into())),
            StatusCode::FORBIDDEN
        );
    }
}
