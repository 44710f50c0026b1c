//! Append-only log of sync attempts.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Success,
    Error,
    InProgress,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Success => "success",
            SyncState::Error => "error",
            SyncState::InProgress => "in_progress",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(SyncState::Success),
            "error" => Some(SyncState::Error),
            "in_progress" => Some(SyncState::InProgress),
            _ => None,
        }
    }
}

/// One row of the sync log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub id: i64,
    pub last_sync: DateTime<Utc>,
    pub status: SyncState,
    pub error_message: Option<String>,
    pub events_synced: i64,
}

impl SyncStatus {
    pub fn in_progress() -> Self {
        Self::new(SyncState::InProgress, None, 0)
    }

    pub fn success(events_synced: usize) -> Self {
        Self::new(SyncState::Success, None, events_synced as i64)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(SyncState::Error, Some(message.into()), 0)
    }

    fn new(status: SyncState, error_message: Option<String>, events_synced: i64) -> Self {
        SyncStatus {
            id: 0,
            last_sync: Utc::now(),
            status,
            error_message,
            events_synced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_str() {
        for state in [SyncState::Success, SyncState::Error, SyncState::InProgress] {
            assert_eq!(SyncState::parse(state.as_str()), Some(state));
        }
        assert_eq!(SyncState::parse("pending"), None);
    }

    #[test]
    fn test_in_progress_serializes_snake_case() {
        let json = serde_json::to_value(SyncStatus::in_progress()).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["events_synced"], 0);
    }
}
