//! Core types for the calendar kiosk.
//!
//! This crate provides the pieces shared by the server and the Google provider:
//! - `User`, `Calendar`, `CalendarEvent` and `SyncStatus` domain types
//! - `SyncWindow` and date-parameter parsing
//! - `Store`, the SQLite cache the kiosk reads from between syncs

pub mod calendar;
pub mod constants;
pub mod date_range;
pub mod error;
pub mod event;
pub mod store;
pub mod sync_status;
pub mod user;

pub use calendar::Calendar;
pub use date_range::{SyncWindow, local_midnight, parse_range_end, parse_range_start};
pub use error::{KioskError, KioskResult};
pub use event::{CalendarEvent, EventRecord, EventStatus, EventTime};
pub use store::Store;
pub use sync_status::{SyncState, SyncStatus};
pub use user::{User, UserProfile};
