use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// Local directory of airports common in the charter business, merged into
/// marketplace suggestions so typeahead keeps working when the marketplace
/// is down.
const COMMON_AIRPORTS: &[(&str, &str, &str)] = &[
    ("KTEB", "TEB", "Teterboro"),
    ("KVNY", "VNY", "Van Nuys"),
    ("KPBI", "PBI", "Palm Beach International"),
    ("KOPF", "OPF", "Miami-Opa Locka Executive"),
    ("KHPN", "HPN", "Westchester County"),
    ("KLAS", "LAS", "Harry Reid International"),
    ("KSDL", "SDL", "Scottsdale"),
    ("KAPA", "APA", "Centennial"),
    ("KDAL", "DAL", "Dallas Love Field"),
    ("KMDW", "MDW", "Chicago Midway"),
    ("KBCT", "BCT", "Boca Raton"),
    ("KSNA", "SNA", "John Wayne-Orange County"),
    ("EGGW", "LTN", "London Luton"),
    ("LFPB", "LBG", "Paris-Le Bourget"),
    ("LSGG", "GVA", "Geneva Cointrin"),
];

const CACHE_TTL_SECONDS: u64 = 300;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub filter: String,
}

/// Merge marketplace suggestions with local directory hits, and keep a
/// manually-typed 4-letter ICAO code usable even when nothing matches.
fn merge_results(remote: Vec<Value>, filter: &str) -> Vec<Value> {
    let mut results = remote;
    let lowered = filter.to_lowercase();

    for (icao, iata, name) in COMMON_AIRPORTS {
        let matches = icao.to_lowercase().contains(&lowered)
            || iata.to_lowercase().contains(&lowered)
            || name.to_lowercase().contains(&lowered);
        if matches && !results.iter().any(|r| r["icao"].as_str() == Some(icao)) {
            results.push(json!({
                "icao": icao,
                "iata": iata,
                "name": name,
                "source": "local",
            }));
        }
    }

    let upper = filter.to_ascii_uppercase();
    if filter.len() == 4
        && filter.chars().all(|c| c.is_ascii_alphabetic())
        && !results.iter().any(|r| r["icao"].as_str() == Some(&upper))
    {
        results.push(json!({
            "icao": upper,
            "name": "Manually entered ICAO code",
            "source": "manual",
        }));
    }

    results
}

/// GET /v1/airports/search?filter=
/// Never fails: marketplace errors degrade to local-directory results.
pub async fn search_airports(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Value> {
    let filter = params.filter.trim();
    if filter.is_empty() {
        return Json(json!({ "data": [] }));
    }

    if let Ok(Some(cached)) = state.redis.get_cached_airports(filter).await {
        if let Ok(doc) = serde_json::from_str::<Value>(&cached) {
            return Json(doc);
        }
    }

    // Degrades to an empty list internally on any marketplace failure.
    let remote = state.avinode.search_airports(filter).await;
    let results = merge_results(remote, filter);

    let doc = json!({ "data": results });
    if let Err(e) = state
        .redis
        .cache_airports(filter, &doc.to_string(), CACHE_TTL_SECONDS)
        .await
    {
        tracing::debug!("Airport cache write failed: {}", e);
    }
    Json(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_local_matches() {
        let results = merge_results(Vec::new(), "teterboro");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["icao"].as_str(), Some("KTEB"));
        assert_eq!(results[0]["source"].as_str(), Some("local"));
    }

    #[test]
    fn test_merge_keeps_remote_and_dedupes() {
        let remote = vec![json!({"icao": "KTEB", "name": "Teterboro", "source": "avinode"})];
        let results = merge_results(remote, "KTEB");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["source"].as_str(), Some("avinode"));
    }

    #[test]
    fn test_manual_icao_fallback_on_empty_remote() {
        // A marketplace outage leaves remote results empty; a typed ICAO
        // code must still be usable.
        let results = merge_results(Vec::new(), "kxyz");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["icao"].as_str(), Some("KXYZ"));
        assert_eq!(results[0]["source"].as_str(), Some("manual"));
    }

    #[test]
    fn test_short_filters_get_no_manual_row() {
        let results = merge_results(Vec::new(), "kx");
        assert!(results.is_empty());
    }
}
