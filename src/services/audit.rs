use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::AuditEntry;
use crate::store::Store;

/// Appends an audit entry. A failed write is logged and never reaches the caller.
pub async fn record(store: &dyn Store, actor: &str, action: &str, details: Value) {
    let entry = AuditEntry {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: actor.to_string(),
        action: action.to_string(),
        details,
        timestamp: Utc::now(),
    };

    match store.append_audit(&entry).await {
        Ok(()) => info!(actor, action, "audit"),
        Err(e) => warn!("Failed to write audit entry '{}' for {}: {}", action, actor, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_record_appends_entry() {
        let store = MemoryStore::new();
        record(&store, "u1", "prediction_submitted", json!({ "raceId": "monaco-2025" })).await;

        let entries = store.list_audit(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, "u1");
        assert_eq!(entries[0].details["raceId"], "monaco-2025");
    }
}
