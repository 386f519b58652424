//! Stage transition guard.
//!
//! Every status-affecting write goes through [`parse_status`] (or
//! [`status_or_default`] on create/update) and stamps `closed_at` with
//! [`closed_at_for`]. The timestamp is recomputed on each write, so moving a
//! deal from `gagne` to `perdu` refreshes it and reopening a deal clears it.

use entity::deal::Status;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::error::{DealError, DealResult};

/// Membership test against the six pipeline stages.
pub fn parse_status(raw: &str) -> DealResult<Status> {
    Status::parse(raw).ok_or_else(|| DealError::InvalidStatus(raw.to_string()))
}

/// Absent or blank input falls back to `prospect`.
pub fn status_or_default(raw: Option<&str>) -> DealResult<Status> {
    match raw {
        Some(value) if !value.trim().is_empty() => parse_status(value),
        _ => Ok(Status::default()),
    }
}

pub fn closed_at_for(status: Status, now: DateTimeWithTimeZone) -> Option<DateTimeWithTimeZone> {
    status.is_closed().then_some(now)
}
