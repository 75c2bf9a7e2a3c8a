use crate::types::FundQuote;

/// Resolve the grams of gold one share of `quote` represents.
///
/// NAV sits closer to intrinsic value than a market price that may trade at
/// a premium or discount, so it wins whenever it is usable:
/// 1. nav_price present and > 0  -> nav_price / spot
/// 2. current_price > 0          -> current_price / spot
/// 3. otherwise                  -> None
///
/// A missing or non-positive spot price makes every basis unusable. That is
/// a data gap, not a fault: the resolver returns None instead of dividing.
pub fn resolve_backing(quote: &FundQuote, spot_try_per_gram: Option<f64>) -> Option<f64> {
    let spot = spot_try_per_gram?;
    if spot <= 0.0 {
        return None;
    }

    if let Some(nav) = quote.nav_price {
        if nav > 0.0 {
            return Some(nav / spot);
        }
    }

    if quote.current_price > 0.0 {
        return Some(quote.current_price / spot);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: f64, nav: Option<f64>) -> FundQuote {
        FundQuote {
            symbol: "ZGOLD".to_string(),
            name: "Test Fund".to_string(),
            current_price: price,
            change_percent: None,
            volume: None,
            nav_price: nav,
            expense_ratio: None,
            stopaj_rate: None,
            last_updated: None,
            gold_backing_grams: None,
        }
    }

    #[test]
    fn nav_takes_priority_over_price() {
        let backing = resolve_backing(&quote(120.0, Some(100.0)), Some(40.0));
        let b = backing.unwrap();
        assert!((b - 2.5).abs() < 1e-9, "backing={b}");
    }

    #[test]
    fn price_basis_when_nav_missing() {
        let backing = resolve_backing(&quote(80.0, None), Some(40.0));
        let b = backing.unwrap();
        assert!((b - 2.0).abs() < 1e-9, "backing={b}");
    }

    #[test]
    fn zero_nav_falls_back_to_price() {
        let backing = resolve_backing(&quote(80.0, Some(0.0)), Some(40.0));
        let b = backing.unwrap();
        assert!((b - 2.0).abs() < 1e-9, "backing={b}");
    }

    #[test]
    fn missing_spot_resolves_nothing() {
        assert!(resolve_backing(&quote(80.0, Some(100.0)), None).is_none());
    }

    #[test]
    fn zero_spot_resolves_nothing() {
        assert!(resolve_backing(&quote(80.0, Some(100.0)), Some(0.0)).is_none());
    }

    #[test]
    fn negative_spot_resolves_nothing() {
        assert!(resolve_backing(&quote(80.0, None), Some(-40.0)).is_none());
    }

    #[test]
    fn zero_price_without_nav_resolves_nothing() {
        assert!(resolve_backing(&quote(0.0, None), Some(40.0)).is_none());
    }
}
