//! League operations. Each service takes the store (and whatever else it
//! needs) explicitly, plus the current time, so tests can pin the clock.

pub mod audit;
pub mod challenge;
pub mod leagues;
pub mod predictions;
pub mod presence;
pub mod rate_limit;
pub mod results;
pub mod trace;
pub mod users;

use crate::error::ApiError;
use crate::store::StoreError;

/// Splits service failures into client errors and internal ones.
/// Internal failures get a correlation ID through [`trace::trace_error`].
pub trait ServiceFailure: std::fmt::Display + Send + Sync {
    fn client_error(&self) -> Option<ApiError>;
}

impl ServiceFailure for StoreError {
    fn client_error(&self) -> Option<ApiError> {
        match self {
            StoreError::NotFound(what) => Some(ApiError::not_found(what.clone())),
            _ => None,
        }
    }
}
