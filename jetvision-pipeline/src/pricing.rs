//! Client-facing proposal pricing. Pure arithmetic, no I/O.

/// Currency used for display when a request has no recorded quote currency.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Total the client sees: selected quote base plus ISO commission plus
/// Jetvision cost. Commission and cost arrive as flat amounts; percentage
/// entry is converted by the caller before this point. No rounding is
/// applied here.
pub fn proposal_total(base: f64, iso_commission: f64, jetvision_cost: f64) -> f64 {
    base + iso_commission + jetvision_cost
}

/// Convert a percentage-of-base entry into a flat amount.
pub fn percentage_of(base: f64, percentage: f64) -> f64 {
    percentage * base / 100.0
}

/// Display currency for a proposal.
pub fn display_currency(best_quote_currency: Option<&str>) -> &str {
    match best_quote_currency {
        Some(c) if !c.trim().is_empty() => c,
        _ => DEFAULT_CURRENCY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_sum_of_parts() {
        assert_eq!(proposal_total(42000.0, 4200.0, 1500.0), 47700.0);
        assert_eq!(proposal_total(95200.0, 0.0, 0.0), 95200.0);
    }

    #[test]
    fn test_percentage_conversion() {
        assert_eq!(percentage_of(42000.0, 10.0), 4200.0);
        assert_eq!(percentage_of(50000.0, 2.5), 1250.0);
    }

    #[test]
    fn test_display_currency_defaults_to_usd() {
        assert_eq!(display_currency(Some("EUR")), "EUR");
        assert_eq!(display_currency(Some("")), "USD");
        assert_eq!(display_currency(None), "USD");
    }
}
