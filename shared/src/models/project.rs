//! Project models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A forestry project that production runs are executed for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub nombre: String,
    pub cliente: Option<String>,
    /// Mix assigned to the project; new runs produce this mix
    pub mezcla_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
