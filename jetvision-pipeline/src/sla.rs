//! SLA timing for the first-quote window.

use chrono::{DateTime, Duration, Utc};
use jetvision_core::request::{SlaStatus, SLA_WINDOW_HOURS};

/// The request goes at-risk this long before the deadline.
pub const AT_RISK_WINDOW_HOURS: i64 = 1;

/// Quote SLA deadline for a request created at `created_at`.
pub fn sla_due(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::hours(SLA_WINDOW_HOURS)
}

/// SLA standing at `now`. Any received quote meets the SLA regardless of
/// elapsed time; otherwise the status degrades as the deadline approaches.
pub fn sla_status(created_at: DateTime<Utc>, has_quotes: bool, now: DateTime<Utc>) -> SlaStatus {
    if has_quotes {
        return SlaStatus::Met;
    }
    let due = sla_due(created_at);
    if now > due {
        SlaStatus::Overdue
    } else if now >= due - Duration::hours(AT_RISK_WINDOW_HOURS) {
        SlaStatus::AtRisk
    } else {
        SlaStatus::OnTrack
    }
}
