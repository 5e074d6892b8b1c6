use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a [`SyncRun`].
///
/// `Pending -> InProgress -> {Completed, Failed}`; both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl SyncState {
    /// Database representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::InProgress => "in_progress",
            SyncState::Completed => "completed",
            SyncState::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SyncState::Completed | SyncState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: SyncState) -> bool {
        matches!(
            (self, next),
            (SyncState::Pending, SyncState::InProgress | SyncState::Failed)
                | (SyncState::InProgress, SyncState::Completed | SyncState::Failed)
        )
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncState::Pending),
            "in_progress" => Ok(SyncState::InProgress),
            "completed" => Ok(SyncState::Completed),
            "failed" => Ok(SyncState::Failed),
            other => Err(format!("unknown sync state '{other}'")),
        }
    }
}

/// One execution of the full pipeline for one vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: i64,
    pub public_id: Uuid,
    pub vendor_id: i64,
    pub state: SyncState,
    pub total_items: i32,
    pub processed_items: i32,
    pub error_count: i32,
    pub created_count: i32,
    pub updated_count: i32,
    pub skipped_count: i32,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Counters accumulated while a run processes its batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub total_items: i32,
    pub processed_items: i32,
    pub created: i32,
    pub updated: i32,
    pub skipped: i32,
    pub errors: i32,
}

impl SyncProgress {
    #[must_use]
    pub fn new(total_items: usize) -> Self {
        Self {
            total_items: i32::try_from(total_items).unwrap_or(i32::MAX),
            ..Self::default()
        }
    }

    /// Products written to the catalog (created or updated).
    #[must_use]
    pub fn applied(&self) -> i32 {
        self.created + self.updated
    }
}

/// Structured result handed back to whoever triggered a sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunSummary {
    pub run_id: Option<i64>,
    pub vendor_id: i64,
    pub success: bool,
    pub total_products: i32,
    pub created: i32,
    pub updated: i32,
    pub skipped: i32,
    pub errors: i32,
    pub synced_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl SyncRunSummary {
    #[must_use]
    pub fn completed(run_id: i64, vendor_id: i64, progress: &SyncProgress) -> Self {
        Self {
            run_id: Some(run_id),
            vendor_id,
            success: true,
            total_products: progress.total_items,
            created: progress.created,
            updated: progress.updated,
            skipped: progress.skipped,
            errors: progress.errors,
            synced_at: Utc::now(),
            message: None,
        }
    }

    #[must_use]
    pub fn failed(
        run_id: Option<i64>,
        vendor_id: i64,
        progress: &SyncProgress,
        message: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            vendor_id,
            success: false,
            total_products: progress.total_items,
            created: progress.created,
            updated: progress.updated,
            skipped: progress.skipped,
            errors: progress.errors,
            synced_at: Utc::now(),
            message: Some(message.into()),
        }
    }
}

/// What the synchronizer does with products scoring below the completeness bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncompletePolicy {
    /// Persist silently.
    Persist,
    /// Persist and log the missing fields.
    #[default]
    Warn,
    /// Skip the product; it counts as `skipped`.
    Discard,
}

impl std::str::FromStr for IncompletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "persist" => Ok(IncompletePolicy::Persist),
            "warn" => Ok(IncompletePolicy::Warn),
            "discard" => Ok(IncompletePolicy::Discard),
            other => Err(format!(
                "unknown policy '{other}'; expected persist, warn, or discard"
            )),
        }
    }
}
