use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hours between request submission and the quote SLA deadline.
pub const SLA_WINDOW_HOURS: i64 = 6;

/// Pipeline status: the authoritative "where is this deal" field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    UnderReview,
    RfqSubmitted,
    QuoteReceived,
    ProposalReady,
    ProposalSent,
    Accepted,
    Declined,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::UnderReview => "under_review",
            RequestStatus::RfqSubmitted => "rfq_submitted",
            RequestStatus::QuoteReceived => "quote_received",
            RequestStatus::ProposalReady => "proposal_ready",
            RequestStatus::ProposalSent => "proposal_sent",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Declined => "declined",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<RequestStatus> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "under_review" => Some(RequestStatus::UnderReview),
            "rfq_submitted" => Some(RequestStatus::RfqSubmitted),
            "quote_received" => Some(RequestStatus::QuoteReceived),
            "proposal_ready" => Some(RequestStatus::ProposalReady),
            "proposal_sent" => Some(RequestStatus::ProposalSent),
            "accepted" => Some(RequestStatus::Accepted),
            "declined" => Some(RequestStatus::Declined),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Accepted | RequestStatus::Declined | RequestStatus::Cancelled
        )
    }
}

/// Secondary status tracking marketplace sourcing progress.
///
/// Monotonically non-decreasing along
/// not_sent → sent_to_avinode → rfq_sent → quotes_received → booked;
/// `cancelled` is terminal and reachable from any state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AvinodeStatus {
    NotSent,
    SentToAvinode,
    RfqSent,
    QuotesReceived,
    Booked,
    Cancelled,
}

impl AvinodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvinodeStatus::NotSent => "not_sent",
            AvinodeStatus::SentToAvinode => "sent_to_avinode",
            AvinodeStatus::RfqSent => "rfq_sent",
            AvinodeStatus::QuotesReceived => "quotes_received",
            AvinodeStatus::Booked => "booked",
            AvinodeStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<AvinodeStatus> {
        match s {
            "not_sent" => Some(AvinodeStatus::NotSent),
            "sent_to_avinode" => Some(AvinodeStatus::SentToAvinode),
            "rfq_sent" => Some(AvinodeStatus::RfqSent),
            "quotes_received" => Some(AvinodeStatus::QuotesReceived),
            "booked" => Some(AvinodeStatus::Booked),
            "cancelled" => Some(AvinodeStatus::Cancelled),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            AvinodeStatus::NotSent => 0,
            AvinodeStatus::SentToAvinode => 1,
            AvinodeStatus::RfqSent => 2,
            AvinodeStatus::QuotesReceived => 3,
            AvinodeStatus::Booked => 4,
            AvinodeStatus::Cancelled => 5,
        }
    }

    /// Advance to `candidate` only when it does not regress sourcing progress.
    /// `cancelled` always wins; `cancelled` itself never advances back.
    pub fn advance(self, candidate: AvinodeStatus) -> AvinodeStatus {
        if self == AvinodeStatus::Cancelled || candidate == AvinodeStatus::Cancelled {
            return AvinodeStatus::Cancelled;
        }
        if candidate.rank() > self.rank() {
            candidate
        } else {
            self
        }
    }
}

/// SLA standing relative to the 6-hour first-quote window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    OnTrack,
    AtRisk,
    Overdue,
    Met,
}

impl SlaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlaStatus::OnTrack => "on_track",
            SlaStatus::AtRisk => "at_risk",
            SlaStatus::Overdue => "overdue",
            SlaStatus::Met => "met",
        }
    }

    pub fn parse(s: &str) -> Option<SlaStatus> {
        match s {
            "on_track" => Some(SlaStatus::OnTrack),
            "at_risk" => Some(SlaStatus::AtRisk),
            "overdue" => Some(SlaStatus::Overdue),
            "met" => Some(SlaStatus::Met),
            _ => None,
        }
    }
}

/// The central entity: one client flight request moving through the pipeline.
///
/// Serialized field names are the wire contract between the synchronizer and
/// the datastore and must stay stable for idempotent re-sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRequest {
    pub id: Uuid,
    pub iso_id: String,
    pub iso_name: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,

    pub departure: String,
    pub arrival: String,
    pub departure_date: String,
    pub departure_time: Option<String>,
    pub return_date: Option<String>,
    pub return_time: Option<String>,
    pub passengers: i32,
    pub special_requests: Option<String>,

    pub status: RequestStatus,

    pub avinode_trip_id: Option<String>,
    pub avinode_trip_href: Option<String>,
    pub avinode_search_link: Option<String>,
    pub avinode_view_link: Option<String>,
    pub avinode_rfq_ids: Vec<String>,
    pub avinode_quote_ids: Vec<String>,
    pub avinode_quote_count: i32,
    pub avinode_best_quote_amount: Option<f64>,
    pub avinode_best_quote_currency: Option<String>,
    pub avinode_first_quote_at: Option<DateTime<Utc>>,
    pub avinode_last_sync_at: Option<DateTime<Utc>>,
    pub avinode_sla_due_at: Option<DateTime<Utc>>,
    pub avinode_sla_status: Option<SlaStatus>,
    pub avinode_status: AvinodeStatus,

    pub selected_quote_id: Option<String>,
    pub selected_operator: Option<String>,
    pub selected_quote_amount: Option<f64>,
    pub iso_commission: Option<f64>,
    pub jetvision_cost: Option<f64>,
    pub total_price: Option<f64>,
    pub proposal_notes: Option<String>,
    pub proposal_sent_at: Option<DateTime<Utc>>,
    pub client_decision_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields the ISO supplies when submitting a request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlightRequest {
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub departure: String,
    pub arrival: String,
    pub departure_date: String,
    pub departure_time: Option<String>,
    pub return_date: Option<String>,
    pub return_time: Option<String>,
    pub passengers: i32,
    pub special_requests: Option<String>,
}

impl FlightRequest {
    /// Create a request in the `pending` state with the SLA deadline stamped.
    pub fn new(iso_id: String, iso_name: String, input: NewFlightRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            iso_id,
            iso_name,
            client_name: input.client_name,
            client_email: input.client_email,
            client_phone: input.client_phone,
            departure: input.departure,
            arrival: input.arrival,
            departure_date: input.departure_date,
            departure_time: input.departure_time,
            return_date: input.return_date,
            return_time: input.return_time,
            passengers: input.passengers,
            special_requests: input.special_requests,
            status: RequestStatus::Pending,
            avinode_trip_id: None,
            avinode_trip_href: None,
            avinode_search_link: None,
            avinode_view_link: None,
            avinode_rfq_ids: Vec::new(),
            avinode_quote_ids: Vec::new(),
            avinode_quote_count: 0,
            avinode_best_quote_amount: None,
            avinode_best_quote_currency: None,
            avinode_first_quote_at: None,
            avinode_last_sync_at: None,
            avinode_sla_due_at: Some(now + Duration::hours(SLA_WINDOW_HOURS)),
            avinode_sla_status: Some(SlaStatus::OnTrack),
            avinode_status: AvinodeStatus::NotSent,
            selected_quote_id: None,
            selected_operator: None,
            selected_quote_amount: None,
            iso_commission: None,
            jetvision_cost: None,
            total_price: None,
            proposal_notes: None,
            proposal_sent_at: None,
            client_decision_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update pipeline status, stamping `updated_at`.
    pub fn update_status(&mut self, new_status: RequestStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }

    /// True while the request should be picked up by the polling worker.
    pub fn is_active_sourcing(&self) -> bool {
        !self.status.is_terminal()
            && matches!(
                self.avinode_status,
                AvinodeStatus::SentToAvinode
                    | AvinodeStatus::RfqSent
                    | AvinodeStatus::QuotesReceived
            )
    }
}

/// The single-write payload produced by one synchronizer run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncUpdate {
    pub rfq_ids: Vec<String>,
    pub quote_ids: Vec<String>,
    pub quote_count: i32,
    pub best_quote_amount: Option<f64>,
    pub best_quote_currency: Option<String>,
    pub first_quote_at: Option<DateTime<Utc>>,
    pub sla_due_at: DateTime<Utc>,
    pub sla_status: SlaStatus,
    pub avinode_status: AvinodeStatus,
    pub last_sync_at: DateTime<Utc>,
}
