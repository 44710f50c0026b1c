//! Calendars visible to the kiosk user.

use serde::Serialize;

/// A calendar from the user's calendar list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub primary: bool,
    pub access_role: String,
}
