use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqMessage {
    pub original_payload: String,
    pub failure_reason: String,
    pub failed_at: String,
}
