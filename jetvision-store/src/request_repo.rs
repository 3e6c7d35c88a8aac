use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use jetvision_core::repository::FlightRequestRepository;
use jetvision_core::request::{
    AvinodeStatus, FlightRequest, RequestStatus, SlaStatus, SyncUpdate,
};
use jetvision_core::BoxError;

/// Column list for `flight_requests` queries.
const COLUMNS: &str = "id, iso_id, iso_name, client_name, client_email, client_phone, \
     departure, arrival, departure_date, departure_time, return_date, return_time, \
     passengers, special_requests, status, \
     avinode_trip_id, avinode_trip_href, avinode_search_link, avinode_view_link, \
     avinode_rfq_ids, avinode_quote_ids, avinode_quote_count, \
     avinode_best_quote_amount, avinode_best_quote_currency, avinode_first_quote_at, \
     avinode_last_sync_at, avinode_sla_due_at, avinode_sla_status, avinode_status, \
     selected_quote_id, selected_operator, selected_quote_amount, \
     iso_commission, jetvision_cost, total_price, proposal_notes, \
     proposal_sent_at, client_decision_at, created_at, updated_at";

pub struct StoreFlightRequestRepository {
    pool: PgPool,
}

impl StoreFlightRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct FlightRequestRow {
    id: Uuid,
    iso_id: String,
    iso_name: String,
    client_name: String,
    client_email: String,
    client_phone: Option<String>,
    departure: String,
    arrival: String,
    departure_date: String,
    departure_time: Option<String>,
    return_date: Option<String>,
    return_time: Option<String>,
    passengers: i32,
    special_requests: Option<String>,
    status: String,
    avinode_trip_id: Option<String>,
    avinode_trip_href: Option<String>,
    avinode_search_link: Option<String>,
    avinode_view_link: Option<String>,
    avinode_rfq_ids: Vec<String>,
    avinode_quote_ids: Vec<String>,
    avinode_quote_count: i32,
    avinode_best_quote_amount: Option<f64>,
    avinode_best_quote_currency: Option<String>,
    avinode_first_quote_at: Option<DateTime<Utc>>,
    avinode_last_sync_at: Option<DateTime<Utc>>,
    avinode_sla_due_at: Option<DateTime<Utc>>,
    avinode_sla_status: Option<String>,
    avinode_status: String,
    selected_quote_id: Option<String>,
    selected_operator: Option<String>,
    selected_quote_amount: Option<f64>,
    iso_commission: Option<f64>,
    jetvision_cost: Option<f64>,
    total_price: Option<f64>,
    proposal_notes: Option<String>,
    proposal_sent_at: Option<DateTime<Utc>>,
    client_decision_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FlightRequestRow> for FlightRequest {
    type Error = BoxError;

    fn try_from(row: FlightRequestRow) -> Result<Self, Self::Error> {
        let status = RequestStatus::parse(&row.status)
            .ok_or_else(|| format!("unknown request status '{}'", row.status))?;
        let avinode_status = AvinodeStatus::parse(&row.avinode_status)
            .ok_or_else(|| format!("unknown avinode status '{}'", row.avinode_status))?;
        let avinode_sla_status = row
            .avinode_sla_status
            .as_deref()
            .and_then(SlaStatus::parse);

        Ok(FlightRequest {
            id: row.id,
            iso_id: row.iso_id,
            iso_name: row.iso_name,
            client_name: row.client_name,
            client_email: row.client_email,
            client_phone: row.client_phone,
            departure: row.departure,
            arrival: row.arrival,
            departure_date: row.departure_date,
            departure_time: row.departure_time,
            return_date: row.return_date,
            return_time: row.return_time,
            passengers: row.passengers,
            special_requests: row.special_requests,
            status,
            avinode_trip_id: row.avinode_trip_id,
            avinode_trip_href: row.avinode_trip_href,
            avinode_search_link: row.avinode_search_link,
            avinode_view_link: row.avinode_view_link,
            avinode_rfq_ids: row.avinode_rfq_ids,
            avinode_quote_ids: row.avinode_quote_ids,
            avinode_quote_count: row.avinode_quote_count,
            avinode_best_quote_amount: row.avinode_best_quote_amount,
            avinode_best_quote_currency: row.avinode_best_quote_currency,
            avinode_first_quote_at: row.avinode_first_quote_at,
            avinode_last_sync_at: row.avinode_last_sync_at,
            avinode_sla_due_at: row.avinode_sla_due_at,
            avinode_sla_status,
            avinode_status,
            selected_quote_id: row.selected_quote_id,
            selected_operator: row.selected_operator,
            selected_quote_amount: row.selected_quote_amount,
            iso_commission: row.iso_commission,
            jetvision_cost: row.jetvision_cost,
            total_price: row.total_price,
            proposal_notes: row.proposal_notes,
            proposal_sent_at: row.proposal_sent_at,
            client_decision_at: row.client_decision_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn rows_to_requests(rows: Vec<FlightRequestRow>) -> Result<Vec<FlightRequest>, BoxError> {
    rows.into_iter().map(FlightRequest::try_from).collect()
}

#[async_trait]
impl FlightRequestRepository for StoreFlightRequestRepository {
    async fn create(&self, request: &FlightRequest) -> Result<(), BoxError> {
        sqlx::query(
            "INSERT INTO flight_requests (\
                 id, iso_id, iso_name, client_name, client_email, client_phone, \
                 departure, arrival, departure_date, departure_time, return_date, return_time, \
                 passengers, special_requests, status, \
                 avinode_sla_due_at, avinode_sla_status, avinode_status, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
                     $13, $14, $15, $16, $17, $18, $19, $20)",
        )
        .bind(request.id)
        .bind(&request.iso_id)
        .bind(&request.iso_name)
        .bind(&request.client_name)
        .bind(&request.client_email)
        .bind(&request.client_phone)
        .bind(&request.departure)
        .bind(&request.arrival)
        .bind(&request.departure_date)
        .bind(&request.departure_time)
        .bind(&request.return_date)
        .bind(&request.return_time)
        .bind(request.passengers)
        .bind(&request.special_requests)
        .bind(request.status.as_str())
        .bind(request.avinode_sla_due_at)
        .bind(request.avinode_sla_status.map(|s| s.as_str()))
        .bind(request.avinode_status.as_str())
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FlightRequest>, BoxError> {
        let query = format!("SELECT {COLUMNS} FROM flight_requests WHERE id = $1");
        let row = sqlx::query_as::<_, FlightRequestRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(FlightRequest::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<FlightRequest>, BoxError> {
        let query = format!("SELECT {COLUMNS} FROM flight_requests ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, FlightRequestRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        rows_to_requests(rows)
    }

    async fn list_for_iso(&self, iso_id: &str) -> Result<Vec<FlightRequest>, BoxError> {
        let query = format!(
            "SELECT {COLUMNS} FROM flight_requests WHERE iso_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, FlightRequestRow>(&query)
            .bind(iso_id)
            .fetch_all(&self.pool)
            .await?;
        rows_to_requests(rows)
    }

    async fn list_active_sourcing(&self) -> Result<Vec<FlightRequest>, BoxError> {
        let query = format!(
            "SELECT {COLUMNS} FROM flight_requests \
             WHERE status NOT IN ('accepted', 'declined', 'cancelled') \
               AND avinode_status IN ('sent_to_avinode', 'rfq_sent', 'quotes_received') \
             ORDER BY created_at ASC"
        );
        let rows = sqlx::query_as::<_, FlightRequestRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        rows_to_requests(rows)
    }

    async fn update(&self, request: &FlightRequest) -> Result<(), BoxError> {
        sqlx::query(
            "UPDATE flight_requests SET \
                 status = $2, \
                 avinode_trip_id = $3, avinode_trip_href = $4, \
                 avinode_search_link = $5, avinode_view_link = $6, \
                 avinode_status = $7, \
                 selected_quote_id = $8, selected_operator = $9, selected_quote_amount = $10, \
                 iso_commission = $11, jetvision_cost = $12, total_price = $13, \
                 proposal_notes = $14, proposal_sent_at = $15, client_decision_at = $16, \
                 special_requests = $17, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(request.id)
        .bind(request.status.as_str())
        .bind(&request.avinode_trip_id)
        .bind(&request.avinode_trip_href)
        .bind(&request.avinode_search_link)
        .bind(&request.avinode_view_link)
        .bind(request.avinode_status.as_str())
        .bind(&request.selected_quote_id)
        .bind(&request.selected_operator)
        .bind(request.selected_quote_amount)
        .bind(request.iso_commission)
        .bind(request.jetvision_cost)
        .bind(request.total_price)
        .bind(&request.proposal_notes)
        .bind(request.proposal_sent_at)
        .bind(request.client_decision_at)
        .bind(&request.special_requests)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_rfq_id(&self, id: Uuid, rfq_id: &str) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE flight_requests \
             SET avinode_rfq_ids = array_append(avinode_rfq_ids, $2), updated_at = NOW() \
             WHERE id = $1 AND NOT ($2 = ANY(avinode_rfq_ids))",
        )
        .bind(id)
        .bind(rfq_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_sync(&self, id: Uuid, update: &SyncUpdate) -> Result<(), BoxError> {
        sqlx::query(
            "UPDATE flight_requests SET \
                 avinode_rfq_ids = $2, avinode_quote_ids = $3, avinode_quote_count = $4, \
                 avinode_best_quote_amount = $5, avinode_best_quote_currency = $6, \
                 avinode_first_quote_at = $7, avinode_sla_due_at = $8, avinode_sla_status = $9, \
                 avinode_status = $10, avinode_last_sync_at = $11, updated_at = $11 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&update.rfq_ids)
        .bind(&update.quote_ids)
        .bind(update.quote_count)
        .bind(update.best_quote_amount)
        .bind(&update.best_quote_currency)
        .bind(update.first_quote_at)
        .bind(update.sla_due_at)
        .bind(update.sla_status.as_str())
        .bind(update.avinode_status.as_str())
        .bind(update.last_sync_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_trip_ref(&self, trip_ref: &str) -> Result<Option<FlightRequest>, BoxError> {
        let query = format!("SELECT {COLUMNS} FROM flight_requests WHERE avinode_trip_id = $1");
        let exact = sqlx::query_as::<_, FlightRequestRow>(&query)
            .bind(trip_ref)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = exact {
            return Ok(Some(row.try_into()?));
        }

        // Legacy/partial identifiers: the stored deep links still embed the
        // long-form trip id the marketplace reports.
        let query = format!(
            "SELECT {COLUMNS} FROM flight_requests \
             WHERE avinode_trip_href LIKE '%' || $1 || '%' \
                OR avinode_search_link LIKE '%' || $1 || '%' \
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, FlightRequestRow>(&query)
            .bind(trip_ref)
            .fetch_optional(&self.pool)
            .await?;
        row.map(FlightRequest::try_from).transpose()
    }
}
