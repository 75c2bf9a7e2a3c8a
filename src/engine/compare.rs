use std::collections::BTreeMap;

use crate::engine::backing::resolve_backing;
use crate::error::{AppError, Result};
use crate::types::{ComparisonResult, FundQuote, PairComparison, PairPerGram, PriceDelta};

/// Rank funds by TL per gram of gold backing and compute every fund's delta
/// against the cheapest.
///
/// Funds whose backing cannot be resolved (no usable NAV or price, missing
/// spot) are kept out of the ranking but still returned at the tail of
/// `all_etfs` in their input order, with `gold_backing_grams` cleared. An
/// input where nothing qualifies produces a degraded result, not an error;
/// only nonsensical numeric values are rejected.
pub fn compare(funds: Vec<FundQuote>, spot_try_per_gram: Option<f64>) -> Result<ComparisonResult> {
    validate_spot(spot_try_per_gram)?;
    for quote in &funds {
        validate_quote(quote)?;
    }

    let mut ranked: Vec<(FundQuote, f64)> = Vec::new();
    let mut unranked: Vec<FundQuote> = Vec::new();
    for mut quote in funds {
        match qualify(&quote, spot_try_per_gram) {
            Some((backing, per_gram)) => {
                quote.gold_backing_grams = Some(backing);
                ranked.push((quote, per_gram));
            }
            None => {
                quote.gold_backing_grams = None;
                unranked.push(quote);
            }
        }
    }

    // sort_by is stable, so equal per-gram prices keep their input order and
    // repeated runs over the same snapshot produce identical rankings.
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    if ranked.is_empty() {
        return Ok(ComparisonResult {
            cheapest: None,
            all_etfs: unranked,
            price_difference: BTreeMap::new(),
            recommendation:
                "Comparison could not be completed: no fund has a usable price and gold backing."
                    .to_string(),
            spot_gram_gold_price: spot_try_per_gram,
        });
    }

    let cheapest_per_gram = ranked[0].1;
    let cheapest = ranked[0].0.clone();

    // One symbol -> delta mapping per run; every display surface reads from
    // this map instead of re-deriving per-gram prices.
    let mut price_difference = BTreeMap::new();
    for (quote, per_gram) in &ranked {
        let absolute_diff = per_gram - cheapest_per_gram;
        price_difference.insert(
            quote.symbol.clone(),
            PriceDelta {
                per_gram_price: *per_gram,
                absolute_diff,
                percent_diff: absolute_diff / cheapest_per_gram * 100.0,
            },
        );
    }

    let recommendation =
        build_recommendation(&cheapest.symbol, cheapest_per_gram, &price_difference);

    let mut all_etfs: Vec<FundQuote> = ranked.into_iter().map(|(quote, _)| quote).collect();
    all_etfs.extend(unranked);

    Ok(ComparisonResult {
        cheapest: Some(cheapest),
        all_etfs,
        price_difference,
        recommendation,
        spot_gram_gold_price: spot_try_per_gram,
    })
}

/// Head-to-head comparison of two quotes. Unit prices are always compared;
/// the per-gram section appears only when both funds resolve a backing
/// against the given spot price.
pub fn compare_pair(
    first: &FundQuote,
    second: &FundQuote,
    spot_try_per_gram: Option<f64>,
) -> Result<PairComparison> {
    validate_spot(spot_try_per_gram)?;
    validate_quote(first)?;
    validate_quote(second)?;

    let first_q = qualify(first, spot_try_per_gram);
    let second_q = qualify(second, spot_try_per_gram);

    let (cheaper, pricier) = if first.current_price <= second.current_price {
        (first, second)
    } else {
        (second, first)
    };
    let unit_price_diff = pricier.current_price - cheaper.current_price;
    let unit_price_diff_percent = if cheaper.current_price > 0.0 {
        Some(unit_price_diff / cheaper.current_price * 100.0)
    } else {
        None
    };

    let per_gram = match (first_q, second_q) {
        (Some((_, first_pg)), Some((_, second_pg))) => {
            let (cheap_pg, steep_pg, cheap_sym) = if first_pg <= second_pg {
                (first_pg, second_pg, first.symbol.clone())
            } else {
                (second_pg, first_pg, second.symbol.clone())
            };
            let absolute_diff = steep_pg - cheap_pg;
            Some(PairPerGram {
                first_per_gram: first_pg,
                second_per_gram: second_pg,
                cheaper_symbol: cheap_sym,
                absolute_diff,
                percent_diff: absolute_diff / cheap_pg * 100.0,
            })
        }
        _ => None,
    };

    let recommendation = match &per_gram {
        Some(pg) => format!(
            "{} is cheaper per gram of gold backing: {:.4} vs {:.4} TL/gram.",
            pg.cheaper_symbol,
            pg.first_per_gram.min(pg.second_per_gram),
            pg.first_per_gram.max(pg.second_per_gram),
        ),
        None => format!(
            "By unit price {} is cheaper: {:.4} TL vs {:.4} TL.",
            cheaper.symbol, cheaper.current_price, pricier.current_price
        ),
    };

    let mut first_out = first.clone();
    let mut second_out = second.clone();
    first_out.gold_backing_grams = first_q.map(|(backing, _)| backing);
    second_out.gold_backing_grams = second_q.map(|(backing, _)| backing);

    Ok(PairComparison {
        first: first_out,
        second: second_out,
        cheaper_symbol: cheaper.symbol.clone(),
        unit_price_diff,
        unit_price_diff_percent,
        per_gram,
        recommendation,
    })
}

/// Backing and per-gram price for one fund, or None when it cannot be ranked.
/// Ranking needs a positive market price on top of a resolved backing.
fn qualify(quote: &FundQuote, spot_try_per_gram: Option<f64>) -> Option<(f64, f64)> {
    let backing = resolve_backing(quote, spot_try_per_gram)?;
    if backing <= 0.0 || quote.current_price <= 0.0 {
        return None;
    }
    let per_gram = quote.current_price / backing;
    if !per_gram.is_finite() || per_gram <= 0.0 {
        return None;
    }
    Some((backing, per_gram))
}

/// A zero or absent spot price degrades the comparison; a negative or
/// non-finite one is a caller bug and gets rejected outright.
fn validate_spot(spot: Option<f64>) -> Result<()> {
    if let Some(s) = spot {
        if !s.is_finite() || s < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "spot gram-gold price must be a non-negative finite number, got {s}"
            )));
        }
    }
    Ok(())
}

fn validate_quote(quote: &FundQuote) -> Result<()> {
    if !quote.current_price.is_finite() || quote.current_price < 0.0 {
        return Err(AppError::InvalidInput(format!(
            "{}: current_price must be a non-negative finite number, got {}",
            quote.symbol, quote.current_price
        )));
    }
    if let Some(nav) = quote.nav_price {
        if !nav.is_finite() || nav < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "{}: nav_price must be a non-negative finite number, got {nav}",
                quote.symbol
            )));
        }
    }
    Ok(())
}

/// One English sentence naming the cheapest fund. With more than one ranked
/// fund it also states the mean premium of the alternatives.
fn build_recommendation(
    cheapest_symbol: &str,
    cheapest_per_gram: f64,
    deltas: &BTreeMap<String, PriceDelta>,
) -> String {
    let premiums: Vec<f64> = deltas
        .iter()
        .filter(|(symbol, _)| symbol.as_str() != cheapest_symbol)
        .map(|(_, delta)| delta.percent_diff)
        .collect();

    if premiums.is_empty() {
        format!("Only one fund qualified: {cheapest_symbol} ({cheapest_per_gram:.4} TL/gram).")
    } else {
        let avg = premiums.iter().sum::<f64>() / premiums.len() as f64;
        format!(
            "Cheapest gold exposure per gram: {cheapest_symbol} ({cheapest_per_gram:.4} TL/gram), \
             on average {avg:.2}% cheaper than the alternatives."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fund(symbol: &str, price: f64, nav: Option<f64>) -> FundQuote {
        FundQuote {
            symbol: symbol.to_string(),
            name: format!("{symbol} Fund"),
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
    fn tie_keeps_input_order() {
        // A: backing 100/50 = 2g, per-gram 50. B: backing 90/50 = 1.8g, per-gram 50.
        let result = compare(
            vec![fund("A", 100.0, None), fund("B", 90.0, None)],
            Some(50.0),
        )
        .unwrap();

        assert_eq!(result.cheapest.as_ref().unwrap().symbol, "A");
        assert_eq!(result.all_etfs[0].symbol, "A");
        assert_eq!(result.all_etfs[1].symbol, "B");

        let delta_b = &result.price_difference["B"];
        assert!((delta_b.per_gram_price - 50.0).abs() < 1e-9);
        assert_eq!(delta_b.absolute_diff, 0.0);
        assert_eq!(delta_b.percent_diff, 0.0);
    }

    #[test]
    fn nav_overrides_market_price() {
        // A: NAV backing 100/40 = 2.5g, per-gram 120/2.5 = 48.
        // B: price backing 80/40 = 2g, per-gram 40.
        let result = compare(
            vec![fund("A", 120.0, Some(100.0)), fund("B", 80.0, None)],
            Some(40.0),
        )
        .unwrap();

        assert_eq!(result.cheapest.as_ref().unwrap().symbol, "B");

        let delta_a = &result.price_difference["A"];
        assert!(
            (delta_a.per_gram_price - 48.0).abs() < 1e-9,
            "per_gram={}",
            delta_a.per_gram_price
        );
        assert!((delta_a.absolute_diff - 8.0).abs() < 1e-9);
        assert!((delta_a.percent_diff - 20.0).abs() < 1e-9);
    }

    #[test]
    fn zero_spot_degrades_without_fault() {
        let result = compare(
            vec![fund("A", 100.0, Some(90.0)), fund("B", 80.0, None)],
            Some(0.0),
        )
        .unwrap();

        assert!(result.cheapest.is_none());
        assert!(result.price_difference.is_empty());
        assert_eq!(result.all_etfs.len(), 2);
        assert!(result.all_etfs.iter().all(|q| q.gold_backing_grams.is_none()));
        assert!(result.recommendation.contains("could not be completed"));
    }

    #[test]
    fn missing_spot_degrades_without_fault() {
        let result = compare(vec![fund("A", 100.0, Some(90.0))], None).unwrap();

        assert!(result.cheapest.is_none());
        assert!(result.price_difference.is_empty());
        assert!(result.spot_gram_gold_price.is_none());
    }

    #[test]
    fn zero_price_fund_is_excluded_not_fatal() {
        let result = compare(
            vec![fund("A", 0.0, None), fund("B", 80.0, None)],
            Some(40.0),
        )
        .unwrap();

        assert_eq!(result.cheapest.as_ref().unwrap().symbol, "B");
        assert_eq!(result.price_difference.len(), 1);
        // Excluded fund trails the ranking with its backing cleared.
        assert_eq!(result.all_etfs[1].symbol, "A");
        assert!(result.all_etfs[1].gold_backing_grams.is_none());
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let result = compare(Vec::new(), Some(50.0)).unwrap();

        assert!(result.cheapest.is_none());
        assert!(result.all_etfs.is_empty());
        assert!(result.price_difference.is_empty());
    }

    #[test]
    fn negative_price_is_rejected() {
        let err = compare(vec![fund("A", -1.0, None)], Some(50.0)).unwrap_err();
        match err {
            AppError::InvalidInput(_) => {}
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_spot_is_rejected() {
        let err = compare(vec![fund("A", 100.0, None)], Some(f64::NAN)).unwrap_err();
        match err {
            AppError::InvalidInput(_) => {}
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn negative_spot_is_rejected() {
        let err = compare(vec![fund("A", 100.0, None)], Some(-50.0)).unwrap_err();
        match err {
            AppError::InvalidInput(_) => {}
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_nav_is_rejected() {
        let err = compare(vec![fund("A", 100.0, Some(f64::INFINITY))], Some(50.0)).unwrap_err();
        match err {
            AppError::InvalidInput(_) => {}
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn deltas_ascend_and_cheapest_sits_at_zero() {
        let result = compare(
            vec![
                fund("A", 120.0, Some(100.0)),
                fund("B", 80.0, None),
                fund("C", 95.0, Some(85.0)),
            ],
            Some(40.0),
        )
        .unwrap();

        let cheapest = result.cheapest.as_ref().unwrap();
        let own = &result.price_difference[&cheapest.symbol];
        assert_eq!(own.absolute_diff, 0.0);
        assert_eq!(own.percent_diff, 0.0);

        for delta in result.price_difference.values() {
            assert!(delta.absolute_diff >= 0.0);
            assert!(delta.percent_diff >= 0.0);
        }

        let ranked: Vec<f64> = result
            .all_etfs
            .iter()
            .filter_map(|q| result.price_difference.get(&q.symbol))
            .map(|d| d.per_gram_price)
            .collect();
        assert!(ranked.windows(2).all(|w| w[0] <= w[1]), "ranked={ranked:?}");
    }

    #[test]
    fn per_gram_times_backing_reconstructs_price() {
        let result = compare(
            vec![fund("A", 123.4567, Some(111.11)), fund("B", 87.65, None)],
            Some(43.21),
        )
        .unwrap();

        for quote in &result.all_etfs {
            let Some(backing) = quote.gold_backing_grams else {
                continue;
            };
            let per_gram = result.price_difference[&quote.symbol].per_gram_price;
            let rebuilt = per_gram * backing;
            assert!(
                (rebuilt - quote.current_price).abs() < 1e-6,
                "{}: rebuilt={rebuilt}, price={}",
                quote.symbol,
                quote.current_price
            );
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let input = || {
            vec![
                fund("A", 120.0, Some(100.0)),
                fund("B", 80.0, None),
                fund("C", 95.0, Some(85.0)),
            ]
        };
        let first = compare(input(), Some(40.0)).unwrap();
        let second = compare(input(), Some(40.0)).unwrap();

        let order = |r: &ComparisonResult| -> Vec<String> {
            r.all_etfs.iter().map(|q| q.symbol.clone()).collect()
        };
        assert_eq!(order(&first), order(&second));
        for (symbol, delta) in &first.price_difference {
            let other = &second.price_difference[symbol];
            assert_eq!(delta.per_gram_price.to_bits(), other.per_gram_price.to_bits());
            assert_eq!(delta.absolute_diff.to_bits(), other.absolute_diff.to_bits());
        }
        assert_eq!(first.recommendation, second.recommendation);
    }

    #[test]
    fn single_fund_gets_its_own_recommendation() {
        let result = compare(vec![fund("A", 100.0, None)], Some(50.0)).unwrap();
        assert!(result.recommendation.contains("Only one fund qualified"));
        assert!(result.recommendation.contains('A'));
    }

    #[test]
    fn pair_reports_unit_and_per_gram_sides() {
        let a = fund("A", 120.0, Some(100.0)); // backing 2.5g, per-gram 48
        let b = fund("B", 80.0, None); // backing 2g, per-gram 40
        let pair = compare_pair(&a, &b, Some(40.0)).unwrap();

        assert_eq!(pair.cheaper_symbol, "B");
        assert!((pair.unit_price_diff - 40.0).abs() < 1e-9);
        assert!((pair.unit_price_diff_percent.unwrap() - 50.0).abs() < 1e-9);

        let pg = pair.per_gram.as_ref().unwrap();
        assert_eq!(pg.cheaper_symbol, "B");
        assert!((pg.first_per_gram - 48.0).abs() < 1e-9);
        assert!((pg.second_per_gram - 40.0).abs() < 1e-9);
        assert!((pg.absolute_diff - 8.0).abs() < 1e-9);
        assert!((pg.percent_diff - 20.0).abs() < 1e-9);
    }

    #[test]
    fn pair_without_spot_omits_per_gram() {
        let pair = compare_pair(&fund("A", 120.0, None), &fund("B", 80.0, None), None).unwrap();
        assert!(pair.per_gram.is_none());
        assert_eq!(pair.cheaper_symbol, "B");
        assert!(pair.first.gold_backing_grams.is_none());
        assert!(pair.second.gold_backing_grams.is_none());
    }

    #[test]
    fn pair_tie_prefers_first() {
        let pair = compare_pair(&fund("A", 80.0, None), &fund("B", 80.0, None), Some(40.0)).unwrap();
        assert_eq!(pair.cheaper_symbol, "A");
        assert!((pair.unit_price_diff).abs() < 1e-12);
        assert_eq!(pair.per_gram.as_ref().unwrap().cheaper_symbol, "A");
    }
}
