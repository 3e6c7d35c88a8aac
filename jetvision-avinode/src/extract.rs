//! Pure extraction functions over raw marketplace documents.
//!
//! The remote API's schema varies per tenant and version, so nothing here
//! deserializes into fixed DTOs. Each field is resolved through a prioritized
//! fallback chain: an ordered list of candidate locations where the first
//! usable value wins. All functions are deterministic given the same inputs
//! and perform no I/O.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;

/// Placeholder when no operator identity can be resolved at all.
const UNKNOWN_SELLER: &str = "Unknown Seller";

/// Ordered price fields checked on a candidate object.
const PRICE_FIELDS: [&str; 8] = [
    "price",
    "amount",
    "total",
    "priceWithoutTax",
    "netPrice",
    "totalAmount",
    "sellerTotal",
    "value",
];

/// Requested-price candidates on the fetched/embedded quote object.
const QUOTE_REQUESTED_FIELDS: [&str; 6] = [
    "sellerPrice",
    "sellerPriceWithoutCommission",
    "price",
    "buyerPrice",
    "requestPrice",
    "targetPrice",
];

/// Requested-price candidates on the seller-lift itself.
const LIFT_REQUESTED_FIELDS: [&str; 5] = [
    "price",
    "requestedPrice",
    "targetPrice",
    "buyerPrice",
    "requestPrice",
];

/// Status substrings marking a lift as not-yet-responded. This is a
/// blocklist, not an allowlist: unrecognized future status strings default
/// to "show the quote".
const UNANSWERED_MARKERS: [&str; 4] = ["unanswer", "awaiting", "pending", "notinvit"];

/// Keys accepted by the breadth-first operator-name search.
const NAME_KEYS: [&str; 6] = [
    "displayname",
    "name",
    "companyname",
    "sellername",
    "sellercompanyname",
    "operatorname",
];

/// Normalized record for one seller-lift within an RFQ.
///
/// `requested_amount` is the original ask; `quoted_amount` is what the
/// operator actually offered. The two come from different places and are
/// never conflated.
#[derive(Debug, Clone, PartialEq)]
pub struct SellerQuote {
    pub quote_id: Option<String>,
    pub operator: String,
    pub requested_amount: Option<f64>,
    pub quoted_amount: Option<f64>,
    pub currency: Option<String>,
    pub aircraft_type: Option<String>,
    pub aircraft_tail: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub unanswered: bool,
}

fn nonempty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A positive number, or a string that parses to one. Zero and negative are
/// treated as absent.
fn positive_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|x| *x > 0.0),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|x| *x > 0.0),
        _ => None,
    }
}

/// Resolve a price from a candidate that may be a bare number, a numeric
/// string, or an object carrying one of the known price fields.
pub fn price_from(candidate: &Value) -> Option<f64> {
    if let Some(n) = positive_number(candidate) {
        return Some(n);
    }
    if candidate.is_object() {
        for field in PRICE_FIELDS {
            if let Some(n) = positive_number(&candidate[field]) {
                return Some(n);
            }
        }
    }
    None
}

/// Currency code from a price-carrying object.
pub fn currency_from(candidate: &Value) -> Option<String> {
    for field in ["currency", "currencyCode"] {
        if let Some(s) = nonempty_str(&candidate[field]) {
            return Some(s);
        }
    }
    None
}

fn timestamp_from(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Breadth-first search over nested objects (max depth 3) for any key in
/// [`NAME_KEYS`] (case-insensitive) holding a non-empty string.
fn bfs_name(root: &Value, max_depth: usize) -> Option<String> {
    let mut queue: VecDeque<(&Value, usize)> = VecDeque::new();
    queue.push_back((root, 0));
    while let Some((node, depth)) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    if NAME_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                        if let Some(s) = nonempty_str(value) {
                            return Some(s);
                        }
                    }
                }
                if depth < max_depth {
                    for value in map.values() {
                        if value.is_object() || value.is_array() {
                            queue.push_back((value, depth + 1));
                        }
                    }
                }
            }
            Value::Array(items) => {
                if depth < max_depth {
                    for value in items {
                        queue.push_back((value, depth + 1));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Resolve the operator name for a lift and its (possibly absent) quote
/// object, in priority order, ending with [`UNKNOWN_SELLER`].
pub fn operator_name(quote: &Value, lift: &Value) -> String {
    if let Some(s) = nonempty_str(&quote["sellerCompany"]["displayName"]) {
        return s;
    }
    let lift_company = [
        &lift["sellerCompany"]["displayName"],
        &lift["sellerCompany"]["name"],
        &lift["company"]["displayName"],
        &lift["company"]["name"],
    ];
    for candidate in lift_company {
        if let Some(s) = nonempty_str(candidate) {
            return s;
        }
    }
    for candidate in [&quote["operator"]["displayName"], &quote["operator"]["name"]] {
        if let Some(s) = nonempty_str(candidate) {
            return s;
        }
    }
    if let Some(s) = bfs_name(lift, 3) {
        return s;
    }
    if let Some(s) = bfs_name(quote, 3) {
        return s;
    }
    UNKNOWN_SELLER.to_string()
}

/// Trimmed, lower-cased operator name used for trip-message matching.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// The original ask: quote-object price fields first, then the lift's own
/// price fields, then the lift's embedded latestQuote price.
pub fn requested_amount(quote: &Value, lift: &Value) -> Option<f64> {
    for field in QUOTE_REQUESTED_FIELDS {
        if let Some(n) = price_from(&quote[field]) {
            return Some(n);
        }
    }
    for field in LIFT_REQUESTED_FIELDS {
        if let Some(n) = price_from(&lift[field]) {
            return Some(n);
        }
    }
    price_from(&lift["latestQuote"]["price"])
}

/// What the operator actually offered. The operator-submitted sellerQuote
/// from a trip message takes precedence over everything else; the lift's
/// embedded latestQuote price is the last resort.
pub fn quoted_amount(message_seller_quote: &Value, quote: &Value, lift: &Value) -> Option<f64> {
    if !message_seller_quote.is_null() {
        if let Some(n) = price_from(&message_seller_quote["sellerPrice"]) {
            return Some(n);
        }
        if let Some(n) = price_from(message_seller_quote) {
            return Some(n);
        }
    }
    if let Some(n) = price_from(&quote["sellerPrice"]) {
        return Some(n);
    }
    for field in ["totalPrice", "price", "amount", "total"] {
        if let Some(n) = price_from(&quote[field]) {
            return Some(n);
        }
    }
    price_from(&lift["latestQuote"]["price"])
}

/// Currency accompanying the quoted amount, resolved along the same
/// precedence as [`quoted_amount`].
pub fn quote_currency(message_seller_quote: &Value, quote: &Value, lift: &Value) -> Option<String> {
    let candidates = [
        &message_seller_quote["sellerPrice"],
        message_seller_quote,
        &quote["sellerPrice"],
        &quote["totalPrice"],
        &quote["price"],
        quote,
        &lift["latestQuote"]["price"],
        &lift["latestQuote"],
        lift,
    ];
    for candidate in candidates {
        if let Some(c) = currency_from(candidate) {
            return Some(c);
        }
    }
    None
}

/// Canonical price from a directly-fetched quote resource, used to overwrite
/// a potentially stale lift-embedded best amount.
pub fn canonical_quote_price(quote: &Value) -> Option<(f64, Option<String>)> {
    for field in ["sellerPrice", "totalPrice", "price", "amount", "total"] {
        if let Some(n) = price_from(&quote[field]) {
            let currency = currency_from(&quote[field]).or_else(|| currency_from(quote));
            return Some((n, currency));
        }
    }
    None
}

/// A lift is unanswered when its status string matches the blocklist.
pub fn is_unanswered(lift: &Value) -> bool {
    let status = lift["status"]
        .as_str()
        .or_else(|| lift["state"].as_str())
        .unwrap_or("");
    let lowered = status.to_ascii_lowercase();
    UNANSWERED_MARKERS.iter().any(|m| lowered.contains(m))
}

fn id_of(value: &Value) -> Option<String> {
    nonempty_str(value).or_else(|| nonempty_str(&value["id"]))
}

/// Quote id referenced by a lift, across the shapes the API emits.
pub fn lift_quote_id(lift: &Value) -> Option<String> {
    nonempty_str(&lift["latestQuote"]["id"])
        .or_else(|| nonempty_str(&lift["quote"]["id"]))
        .or_else(|| id_of(&lift["links"]["quote"]))
        .or_else(|| {
            lift["links"]["quotes"]
                .as_array()
                .and_then(|quotes| quotes.first())
                .and_then(id_of)
        })
}

/// Quote ids a trip message explicitly links, from `lift[].links.quotes[]`
/// and `lift[].links.quote`.
pub fn message_quote_ids(message: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    if let Some(lifts) = message["lift"].as_array() {
        for lift in lifts {
            if let Some(quotes) = lift["links"]["quotes"].as_array() {
                for quote in quotes {
                    if let Some(id) = id_of(quote) {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                }
            }
            if let Some(id) = id_of(&lift["links"]["quote"]) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

/// RFQ ids a trip message links, from `links.rfqs[]`.
pub fn message_rfq_ids(message: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    if let Some(rfqs) = message["links"]["rfqs"].as_array() {
        for rfq in rfqs {
            if let Some(id) = id_of(rfq) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

/// Seller identity carried by a trip message, when resolvable.
pub fn message_seller_name(message: &Value) -> Option<String> {
    nonempty_str(&message["sellerCompany"]["displayName"])
        .or_else(|| nonempty_str(&message["sellerCompany"]["name"]))
        .or_else(|| nonempty_str(&message["from"]["displayName"]))
        .or_else(|| bfs_name(message, 3))
}

/// RFQ references linked from a trip resource.
pub fn trip_rfq_ids(trip: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    let sources = [&trip["rfqs"], &trip["links"]["rfqs"], &trip["data"]["rfqs"]];
    for source in sources {
        if let Some(items) = source.as_array() {
            for item in items {
                if let Some(id) = id_of(item) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
    }
    ids
}

/// Trip-message references linked from a trip resource.
pub fn trip_message_ids(trip: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    let sources = [
        &trip["tripMessages"],
        &trip["tripmsgs"],
        &trip["messages"],
        &trip["links"]["tripMessages"],
        &trip["links"]["tripmsgs"],
    ];
    for source in sources {
        if let Some(items) = source.as_array() {
            for item in items {
                if let Some(id) = id_of(item) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
    }
    ids
}

fn aircraft_type(quote: &Value, lift: &Value) -> Option<String> {
    let candidates = [
        &quote["lift"]["aircraftType"],
        &quote["aircraftType"],
        &lift["aircraftType"],
        &lift["aircraft"]["type"],
        &lift["aircraft"]["model"],
    ];
    candidates.into_iter().find_map(nonempty_str)
}

fn aircraft_tail(quote: &Value, lift: &Value) -> Option<String> {
    let candidates = [
        &quote["lift"]["aircraftTail"],
        &lift["aircraftTail"],
        &lift["tailNumber"],
        &lift["aircraft"]["tailNumber"],
        &lift["aircraft"]["registration"],
    ];
    candidates.into_iter().find_map(nonempty_str)
}

fn quote_created_on(quote: &Value, lift: &Value) -> Option<DateTime<Utc>> {
    timestamp_from(&quote["createdOn"])
        .or_else(|| timestamp_from(&lift["latestQuote"]["createdOn"]))
        .or_else(|| timestamp_from(&lift["createdOn"]))
}

/// Assign at most one trip message to each lift.
///
/// Pass 1 honors explicit quote-id links. Pass 2 is the name-based fallback
/// for unlinked messages: a single remaining message with a single lift is
/// unambiguous; otherwise a message attaches only when its normalized seller
/// name matches exactly one lift and no other unlinked message carries that
/// name. Ambiguous matches attach nothing; guessing would misattribute an
/// operator's price.
fn assign_messages(lifts: &[&Value], quotes: &[&Value], messages: &[&Value]) -> Vec<Option<usize>> {
    let mut assigned: Vec<Option<usize>> = vec![None; lifts.len()];
    let mut used = vec![false; messages.len()];

    for (li, lift) in lifts.iter().enumerate() {
        if let Some(quote_id) = lift_quote_id(lift) {
            for (mi, message) in messages.iter().enumerate() {
                if !used[mi] && message_quote_ids(message).contains(&quote_id) {
                    assigned[li] = Some(mi);
                    used[mi] = true;
                    break;
                }
            }
        }
    }

    let unlinked: Vec<usize> = (0..messages.len())
        .filter(|&mi| !used[mi] && message_quote_ids(messages[mi]).is_empty())
        .collect();

    if unlinked.len() == 1 && lifts.len() == 1 && assigned[0].is_none() {
        assigned[0] = Some(unlinked[0]);
        return assigned;
    }

    let lift_names: Vec<String> = lifts
        .iter()
        .zip(quotes.iter())
        .map(|(lift, quote)| normalize_name(&operator_name(quote, lift)))
        .collect();

    for &mi in &unlinked {
        let Some(message_name) = message_seller_name(messages[mi]) else {
            continue;
        };
        let name = normalize_name(&message_name);
        let same_name_messages = unlinked
            .iter()
            .filter(|&&other| {
                message_seller_name(messages[other])
                    .map(|n| normalize_name(&n) == name)
                    .unwrap_or(false)
            })
            .count();
        if same_name_messages != 1 {
            continue;
        }
        let matching_lifts: Vec<usize> = lift_names
            .iter()
            .enumerate()
            .filter(|(li, lift_name)| assigned[*li].is_none() && **lift_name == name)
            .map(|(li, _)| li)
            .collect();
        if matching_lifts.len() == 1 {
            assigned[matching_lifts[0]] = Some(mi);
        }
    }

    assigned
}

/// Extract every seller-lift of an RFQ into normalized [`SellerQuote`]
/// records.
///
/// `extra_messages` are trip messages fetched separately (e.g. discovered
/// through the trip resource); messages embedded in the RFQ document itself
/// are honored as well. Messages whose RFQ links name a different RFQ are
/// ignored. Unanswered lifts keep their identity but expose no quoted
/// amount, even when a stale latestQuote price is present.
pub fn extract_rfq_quotes(rfq: &Value, extra_messages: &[Value]) -> Vec<SellerQuote> {
    let rfq_id = nonempty_str(&rfq["id"]);

    let lifts: Vec<&Value> = ["sellerLift", "sellerLifts", "lifts"]
        .iter()
        .find_map(|key| rfq[*key].as_array())
        .map(|items| items.iter().collect())
        .unwrap_or_default();

    let mut messages: Vec<&Value> = Vec::new();
    for key in ["tripMessages", "messages"] {
        if let Some(items) = rfq[key].as_array() {
            messages.extend(items.iter());
        }
    }
    for message in extra_messages {
        let linked_rfqs = message_rfq_ids(message);
        let relevant = linked_rfqs.is_empty()
            || rfq_id
                .as_ref()
                .map(|id| linked_rfqs.contains(id))
                .unwrap_or(false);
        if relevant {
            messages.push(message);
        }
    }
    let messages: Vec<&Value> = messages
        .into_iter()
        .filter(|m| !m["sellerQuote"].is_null())
        .collect();

    let quotes: Vec<&Value> = lifts
        .iter()
        .map(|lift| {
            if lift["quote"].is_object() {
                &lift["quote"]
            } else {
                &lift["latestQuote"]
            }
        })
        .collect();

    let assignments = assign_messages(&lifts, &quotes, &messages);

    lifts
        .iter()
        .zip(quotes.iter())
        .zip(assignments.iter())
        .map(|((lift, quote), message_index)| {
            let seller_quote = message_index
                .map(|mi| &messages[mi]["sellerQuote"])
                .unwrap_or(&Value::Null);
            let unanswered = is_unanswered(lift);
            let quoted = if unanswered {
                None
            } else {
                quoted_amount(seller_quote, quote, lift)
            };
            SellerQuote {
                quote_id: lift_quote_id(lift),
                operator: operator_name(quote, lift),
                requested_amount: requested_amount(quote, lift),
                quoted_amount: quoted,
                currency: quote_currency(seller_quote, quote, lift),
                aircraft_type: aircraft_type(quote, lift),
                aircraft_tail: aircraft_tail(quote, lift),
                created_on: quote_created_on(quote, lift),
                unanswered,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_from_number_string_and_object() {
        assert_eq!(price_from(&json!(42000.0)), Some(42000.0));
        assert_eq!(price_from(&json!("42000")), Some(42000.0));
        assert_eq!(price_from(&json!({"amount": "55000.5"})), Some(55000.5));
        assert_eq!(price_from(&json!({"sellerTotal": 1200})), Some(1200.0));
    }

    #[test]
    fn test_price_from_rejects_zero_and_negative() {
        assert_eq!(price_from(&json!(0)), None);
        assert_eq!(price_from(&json!(-100)), None);
        assert_eq!(price_from(&json!({"price": 0, "amount": 30000})), Some(30000.0));
        assert_eq!(price_from(&json!("not a number")), None);
    }

    #[test]
    fn test_price_field_order_is_fixed() {
        let candidate = json!({"total": 3.0, "amount": 2.0, "price": 1.0});
        assert_eq!(price_from(&candidate), Some(1.0));
    }

    #[test]
    fn test_operator_name_prefers_quote_seller_company() {
        let quote = json!({"sellerCompany": {"displayName": "Alpha Jets"}});
        let lift = json!({"sellerCompany": {"displayName": "Should Not Win"}});
        assert_eq!(operator_name(&quote, &lift), "Alpha Jets");
    }

    #[test]
    fn test_operator_name_bfs_fallback() {
        let lift = json!({
            "details": {"seller": {"companyName": "Beta Aviation"}}
        });
        assert_eq!(operator_name(&Value::Null, &lift), "Beta Aviation");
    }

    #[test]
    fn test_operator_name_unknown_seller() {
        let lift = json!({"status": "Quoted", "price": 10});
        assert_eq!(operator_name(&Value::Null, &lift), "Unknown Seller");
    }

    #[test]
    fn test_requested_and_quoted_are_never_conflated() {
        // The linked quote carries the original ask; the trip message carries
        // the operator's actual submitted price.
        let lift = json!({
            "status": "Quoted",
            "sellerCompany": {"displayName": "Gamma Air"},
            "latestQuote": {"id": "q-1", "price": {"amount": 95200, "currency": "USD"}}
        });
        let rfq = json!({
            "id": "rfq-1",
            "sellerLift": [lift],
            "tripMessages": [{
                "sellerCompany": {"displayName": "Gamma Air"},
                "sellerQuote": {"sellerPrice": {"amount": 97500, "currency": "USD"}},
                "lift": [{"links": {"quotes": [{"id": "q-1"}]}}]
            }]
        });
        let quotes = extract_rfq_quotes(&rfq, &[]);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].requested_amount, Some(95200.0));
        assert_eq!(quotes[0].quoted_amount, Some(97500.0));
        assert_eq!(quotes[0].currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_unanswered_blocklist() {
        let pending = json!({"status": "PendingReview", "latestQuote": {"id": "q", "price": 50000}});
        assert!(is_unanswered(&pending));

        let accepted = json!({"status": "Accepted"});
        assert!(!is_unanswered(&accepted));

        // Unrecognized future statuses default to answered.
        let novel = json!({"status": "SellerCountered"});
        assert!(!is_unanswered(&novel));
    }

    #[test]
    fn test_unanswered_lift_shows_no_quote() {
        let rfq = json!({
            "id": "rfq-1",
            "sellerLift": [{
                "status": "Unanswered",
                "sellerCompany": {"name": "Delta Wings"},
                "latestQuote": {"id": "q-9", "price": 88000}
            }]
        });
        let quotes = extract_rfq_quotes(&rfq, &[]);
        assert_eq!(quotes.len(), 1);
        assert!(quotes[0].unanswered);
        assert_eq!(quotes[0].quoted_amount, None);
        assert_eq!(quotes[0].quote_id.as_deref(), Some("q-9"));
    }

    #[test]
    fn test_message_attaches_by_unique_name_match() {
        let rfq = json!({
            "id": "rfq-2",
            "sellerLift": [
                {
                    "status": "Quoted",
                    "sellerCompany": {"displayName": "Echo Charter"},
                    "latestQuote": {"id": "q-a", "price": 61000}
                },
                {
                    "status": "Quoted",
                    "sellerCompany": {"displayName": "Foxtrot Air"},
                    "latestQuote": {"id": "q-b", "price": 64000}
                }
            ],
            "tripMessages": [{
                "sellerCompany": {"displayName": "  ECHO CHARTER "},
                "sellerQuote": {"sellerPrice": {"amount": 59500}}
            }]
        });
        let quotes = extract_rfq_quotes(&rfq, &[]);
        assert_eq!(quotes[0].quoted_amount, Some(59500.0));
        assert_eq!(quotes[1].quoted_amount, Some(64000.0));
    }

    #[test]
    fn test_ambiguous_name_match_attaches_nothing() {
        // Two lifts share a normalized display name; guessing which one the
        // message belongs to would misattribute the price.
        let rfq = json!({
            "id": "rfq-3",
            "sellerLift": [
                {
                    "status": "Quoted",
                    "sellerCompany": {"displayName": "Golf Jets"},
                    "latestQuote": {"id": "q-1", "price": 70000}
                },
                {
                    "status": "Quoted",
                    "sellerCompany": {"displayName": "golf jets"},
                    "latestQuote": {"id": "q-2", "price": 71000}
                }
            ],
            "tripMessages": [{
                "sellerCompany": {"displayName": "Golf Jets"},
                "sellerQuote": {"sellerPrice": {"amount": 65000}}
            }]
        });
        let quotes = extract_rfq_quotes(&rfq, &[]);
        assert_eq!(quotes[0].quoted_amount, Some(70000.0));
        assert_eq!(quotes[1].quoted_amount, Some(71000.0));
    }

    #[test]
    fn test_single_message_single_lift_attaches_without_name() {
        let rfq = json!({
            "id": "rfq-4",
            "sellerLift": [{
                "status": "Quoted",
                "sellerCompany": {"displayName": "Hotel Aviation"},
                "latestQuote": {"id": "q-1", "price": 40000}
            }]
        });
        let message = json!({
            "links": {"rfqs": [{"id": "rfq-4"}]},
            "sellerQuote": {"price": 38750}
        });
        let quotes = extract_rfq_quotes(&rfq, &[message]);
        assert_eq!(quotes[0].quoted_amount, Some(38750.0));
    }

    #[test]
    fn test_messages_for_other_rfqs_are_ignored() {
        let rfq = json!({
            "id": "rfq-5",
            "sellerLift": [{
                "status": "Quoted",
                "sellerCompany": {"displayName": "India Jet"},
                "latestQuote": {"id": "q-1", "price": 52000}
            }]
        });
        let message = json!({
            "links": {"rfqs": [{"id": "rfq-other"}]},
            "sellerQuote": {"price": 1}
        });
        let quotes = extract_rfq_quotes(&rfq, &[message]);
        assert_eq!(quotes[0].quoted_amount, Some(52000.0));
    }

    #[test]
    fn test_requested_chain_falls_back_to_lift_fields() {
        let lift = json!({"requestedPrice": {"amount": 45000}});
        assert_eq!(requested_amount(&Value::Null, &lift), Some(45000.0));

        let lift = json!({"latestQuote": {"price": "47250"}});
        assert_eq!(requested_amount(&Value::Null, &lift), Some(47250.0));
    }

    #[test]
    fn test_quoted_chain_quote_object_fallbacks() {
        let quote = json!({"totalPrice": {"amount": 82000}});
        assert_eq!(
            quoted_amount(&Value::Null, &quote, &Value::Null),
            Some(82000.0)
        );

        let quote = json!({"price": 79000});
        assert_eq!(
            quoted_amount(&Value::Null, &quote, &Value::Null),
            Some(79000.0)
        );
    }

    #[test]
    fn test_canonical_quote_price_with_currency() {
        let quote = json!({"sellerPrice": {"amount": 91000, "currency": "EUR"}});
        assert_eq!(
            canonical_quote_price(&quote),
            Some((91000.0, Some("EUR".to_string())))
        );

        let quote = json!({"price": 12000, "currency": "USD"});
        assert_eq!(
            canonical_quote_price(&quote),
            Some((12000.0, Some("USD".to_string())))
        );
    }

    #[test]
    fn test_trip_rfq_and_message_discovery() {
        let trip = json!({
            "rfqs": [{"id": "rfq-1"}, "rfq-2", {"id": "rfq-1"}],
            "links": {"rfqs": [{"id": "rfq-3"}]},
            "tripMessages": [{"id": "msg-1"}]
        });
        assert_eq!(trip_rfq_ids(&trip), vec!["rfq-1", "rfq-2", "rfq-3"]);
        assert_eq!(trip_message_ids(&trip), vec!["msg-1"]);
    }

    #[test]
    fn test_lift_quote_id_shapes() {
        assert_eq!(
            lift_quote_id(&json!({"latestQuote": {"id": "q-1"}})).as_deref(),
            Some("q-1")
        );
        assert_eq!(
            lift_quote_id(&json!({"links": {"quote": "q-2"}})).as_deref(),
            Some("q-2")
        );
        assert_eq!(
            lift_quote_id(&json!({"links": {"quotes": [{"id": "q-3"}]}})).as_deref(),
            Some("q-3")
        );
        assert_eq!(lift_quote_id(&json!({})), None);
    }

    #[test]
    fn test_created_on_parsing() {
        let lift = json!({
            "latestQuote": {"id": "q", "createdOn": "2025-05-01T10:30:00Z", "price": 1000}
        });
        let ts = quote_created_on(&Value::Null, &lift).unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-05-01T10:30:00+00:00");
    }
}
