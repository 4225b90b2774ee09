//! # Status Timeline Projection
//!
//! A pure function of stored history: sorts the events, attaches the
//! static label and icon for each status, and resolves actor names. The
//! result is a finished snapshot, not a live stream.

use serde::{Deserialize, Serialize};

use permits_core::{Timestamp, UserId};

use crate::application::{ApplicationStatus, StatusHistoryEvent};

/// Icon category shown next to a timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineIcon {
    Document,
    Check,
    Clock,
    Alert,
    Payment,
}

impl TimelineIcon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Check => "check",
            Self::Clock => "clock",
            Self::Alert => "alert",
            Self::Payment => "payment",
        }
    }
}

/// One display row of an application's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub status: ApplicationStatus,
    pub label: &'static str,
    pub icon: TimelineIcon,
    pub actor_name: String,
    pub timestamp: Timestamp,
    pub comment: Option<String>,
    /// Set on the most recent entry only.
    pub is_current: bool,
}

impl ApplicationStatus {
    /// Fixed timeline label.
    pub fn timeline_label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft Created",
            Self::Submitted => "Application Submitted",
            Self::UnderReview => "Under Review",
            Self::Approved => "Application Approved",
            Self::Rejected => "Application Rejected",
            Self::PaymentPending => "Payment Pending",
            Self::Completed => "Completed",
        }
    }

    pub fn timeline_icon(&self) -> TimelineIcon {
        match self {
            Self::Draft => TimelineIcon::Document,
            Self::Submitted | Self::Approved | Self::Completed => TimelineIcon::Check,
            Self::UnderReview => TimelineIcon::Clock,
            Self::Rejected => TimelineIcon::Alert,
            Self::PaymentPending => TimelineIcon::Payment,
        }
    }
}

/// Project history events into ascending timeline entries.
///
/// Ordered by `created_at`, ties broken by `sequence`. `actor_name`
/// resolves the display name of each event's actor.
pub fn project_timeline<F>(events: &[StatusHistoryEvent], actor_name: F) -> Vec<TimelineEntry>
where
    F: Fn(UserId) -> String,
{
    let mut ordered: Vec<&StatusHistoryEvent> = events.iter().collect();
    ordered.sort_by_key(|e| (e.created_at, e.sequence));
    let last = ordered.len().saturating_sub(1);
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, e)| TimelineEntry {
            status: e.status,
            label: e.status.timeline_label(),
            icon: e.status.timeline_icon(),
            actor_name: actor_name(e.updated_by),
            timestamp: e.created_at,
            comment: e.comment.clone(),
            is_current: i == last,
        })
        .collect()
}
