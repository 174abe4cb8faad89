//! Sport → event → selection catalogue with a cascading activation
//! lifecycle, backed by SQLite.

pub mod activity;
pub mod catalogue;
pub mod data;
pub mod error;
pub mod report;
pub mod search;
pub mod types;

pub use activity::{ActivityManager, ActivityRef, DeleteReport, DisableReport};
pub use error::{ActivityError, Result};
pub use types::{ActivityType, Attributes, Event, EventStatus, EventType, Outcome, Row, Selection, Sport};
