/// Length of the sync window when nothing else is configured.
pub const DEFAULT_SYNC_DAYS: i64 = 30;

/// Title stored for events the provider sends without a summary.
pub const DEFAULT_EVENT_TITLE: &str = "No Title";

/// Calendar id the provider resolves to the account's main calendar.
pub const PRIMARY_CALENDAR_ALIAS: &str = "primary";
