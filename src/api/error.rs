//! Rendering of crate errors as HTTP responses.
//!
//! Every error becomes `{"success": false, "error": <kind>, "message": <text>}`. Server-side
//! failures are logged and reported with a generic message.

use crate::errors::{CouponError, Error, OrderError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
}

/// HTTP status for an error.
#[must_use]
pub const fn status_code(err: &Error) -> StatusCode {
    match err {
        Error::Coupon(CouponError::NotFound)
        | Error::NotFound { .. }
        | Error::Order(OrderError::OrderNotFound { .. } | OrderError::ProductNotFound { .. }) => {
            StatusCode::NOT_FOUND
        }
        Error::Coupon(_) | Error::Order(OrderError::CouponInvalidAtCheckout(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::Order(
            OrderError::InsufficientStock { .. }
            | OrderError::NotCancellable { .. }
            | OrderError::InvalidTransition { .. },
        )
        | Error::Conflict { .. } => StatusCode::CONFLICT,
        Error::Order(
            OrderError::EmptyOrder
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidDiscount { .. },
        )
        | Error::Validation { .. } => StatusCode::BAD_REQUEST,
        Error::Order(OrderError::TransactionFailed { .. })
        | Error::Config { .. }
        | Error::Database(_)
        | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        let message = if status.is_server_error() {
            error!("Request failed: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            success: false,
            error: self.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_code(&CouponError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code(&CouponError::MinimumNotMet(dec!(100)).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_code(&OrderError::InsufficientStock { product_id: 1 }.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_code(&OrderError::EmptyOrder.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code(
                &OrderError::TransactionFailed {
                    reason: "disk full".to_string()
                }
                .into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let response = Error::from(OrderError::TransactionFailed {
            reason: "constraint failed".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
