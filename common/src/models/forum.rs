// common/src/models/forum.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forum {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewForum {
    pub title: String,
    pub description: String,
    pub creator_id: i64,
}
