use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::Value;
use std::fmt::Display;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::models::ErrorLogEntry;
use crate::store::Store;

/// `err_<base36 epoch millis>_<8 hex chars>`.
pub fn correlation_id(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().max(0) as u64;
    let suffix: u32 = rand::thread_rng().gen();
    format!("err_{}_{:08x}", to_base36(millis), suffix)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Records an internal failure in `error_logs` and returns the generic 500
/// carrying its correlation ID.
pub async fn trace_error(store: &dyn Store, err: &(dyn Display + Send + Sync), context: Value) -> ApiError {
    let now = Utc::now();
    let correlation_id = correlation_id(now);
    let message = err.to_string();

    error!(correlation_id = %correlation_id, context = %context, "{}", message);

    let entry = ErrorLogEntry {
        correlation_id: correlation_id.clone(),
        message,
        context,
        timestamp: now,
    };
    if let Err(e) = store.append_error(&entry).await {
        warn!("Failed to write error log {}: {}", correlation_id, e);
    }

    ApiError::internal(correlation_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn test_correlation_id_shape() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let id = correlation_id(now);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "err");
        assert_eq!(parts[1], "loyw3v28");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_trace_error_logs_and_returns_id() {
        let store = MemoryStore::new();
        let err = StoreError::Corrupt("scores/abc".to_string());
        let api_error = trace_error(&store, &err, json!({ "op": "race_scores" })).await;

        let ApiError::Internal { correlation_id } = api_error else {
            panic!("expected internal error");
        };
        let logged = store.list_errors(10).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].correlation_id, correlation_id);
        assert_eq!(logged[0].context["op"], "race_scores");
        assert!(logged[0].message.contains("scores/abc"));
    }
}
