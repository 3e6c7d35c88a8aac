use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Role;

/// A role-targeted notification row, written when a pipeline transition
/// changes who must act next. Delivery is fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub request_id: Uuid,
    pub recipient_role: Role,
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(request_id: Uuid, recipient_role: Role, kind: &str, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            recipient_role,
            kind: kind.to_string(),
            message,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}
