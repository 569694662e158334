//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Top-level unit of labeling work; owns entries, labels and progress rows
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub total_entries: i32,
    pub is_active: bool,
    pub invite_code: String,
    /// Object-store key of the originally uploaded file
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single piece of content to be labeled
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DatasetEntry {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub content: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// Label definition usable across a dataset's entries
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DatasetLabel {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub shortcut: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One user's labeling progress on one dataset
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LabelProgress {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub user_id: Uuid,
    pub completed: i32,
    pub total: i32,
    pub updated_at: DateTime<Utc>,
}
