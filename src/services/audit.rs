use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, Set};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::entities::audit_log;
use crate::errors::ServiceError;

/// Write-only audit trail. Mutating services call [`AuditService::record`]
/// after each create/update/delete; there is no read endpoint.
#[derive(Clone)]
pub struct AuditService {
    db: Arc<DatabaseConnection>,
}

impl AuditService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records an audit entry on the service's own connection. Audit
    /// failures are logged but never fail the calling operation.
    #[instrument(skip(self, old_values, new_values))]
    pub async fn record(
        &self,
        table_name: &str,
        record_id: Uuid,
        action: &str,
        old_values: Option<Value>,
        new_values: Option<Value>,
        user_id: Option<Uuid>,
    ) {
        if let Err(err) = record_on(
            &*self.db, table_name, record_id, action, old_values, new_values, user_id,
        )
        .await
        {
            error!(table = table_name, record_id = %record_id, error = %err, "failed to write audit log");
        }
    }
}

/// Records an audit entry on an explicit connection, so callers inside a
/// transaction can make the audit row part of the same commit.
pub async fn record_on<C: ConnectionTrait>(
    conn: &C,
    table_name: &str,
    record_id: Uuid,
    action: &str,
    old_values: Option<Value>,
    new_values: Option<Value>,
    user_id: Option<Uuid>,
) -> Result<audit_log::Model, ServiceError> {
    let entry = audit_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        table_name: Set(table_name.to_string()),
        record_id: Set(record_id),
        action: Set(action.to_string()),
        old_values: Set(old_values),
        new_values: Set(new_values),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
    };
    entry.insert(conn).await.map_err(ServiceError::Database)
}

/// Serializes a model snapshot for the old/new value columns.
pub fn snapshot<T: Serialize>(model: &T) -> Option<Value> {
    serde_json::to_value(model).ok()
}
