//! Server-rendered comparison page. A pure function of the engine output;
//! no ranking or per-gram math happens here.

use crate::types::ComparisonResult;

const STYLE: &str = "<style>\
body{font-family:sans-serif;margin:2rem auto;max-width:60rem;color:#222}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ccc;padding:0.4rem 0.6rem;text-align:right}\
th:nth-child(-n+3),td:nth-child(-n+3){text-align:left}\
tr.cheapest{background:#e8f6e8;font-weight:bold}\
tr.unranked{color:#999}\
p.recommendation{background:#fdf4dc;padding:0.6rem;border-radius:4px}\
p.degraded{background:#fbe4e4;padding:0.6rem;border-radius:4px}\
</style>";

/// Render the comparison result as a standalone HTML page.
pub fn comparison_page(result: &ComparisonResult) -> String {
    let mut page = String::with_capacity(4096);
    page.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    page.push_str("<title>BIST Gold Fund Comparison</title>");
    page.push_str(STYLE);
    page.push_str("</head><body>");
    page.push_str("<h1>BIST Gold Fund Comparison</h1>");

    match result.spot_gram_gold_price {
        Some(spot) => {
            page.push_str(&format!(
                "<p class=\"spot\">Spot gram gold: {spot:.2} TL/gram</p>"
            ));
        }
        None => page.push_str("<p class=\"spot\">Spot gram gold price unavailable</p>"),
    }

    let banner_class = if result.price_difference.is_empty() {
        "degraded"
    } else {
        "recommendation"
    };
    page.push_str(&format!(
        "<p class=\"{banner_class}\">{}</p>",
        escape(&result.recommendation)
    ));

    page.push_str("<table><thead><tr>");
    for heading in [
        "#",
        "Symbol",
        "Fund",
        "Price (TL)",
        "NAV (TL)",
        "Backing (g)",
        "TL/gram",
        "vs cheapest (TL)",
        "vs cheapest (%)",
    ] {
        page.push_str(&format!("<th>{heading}</th>"));
    }
    page.push_str("</tr></thead><tbody>");

    for (i, fund) in result.all_etfs.iter().enumerate() {
        let delta = result.price_difference.get(&fund.symbol);
        let row_class = match (i, delta) {
            (0, Some(_)) => " class=\"cheapest\"",
            (_, None) => " class=\"unranked\"",
            _ => "",
        };
        // Ranked rows come first, so the row index doubles as the rank.
        let rank = match delta {
            Some(_) => (i + 1).to_string(),
            None => "-".to_string(),
        };

        page.push_str(&format!("<tr{row_class}>"));
        page.push_str(&format!("<td>{rank}</td>"));
        page.push_str(&format!("<td>{}</td>", escape(&fund.symbol)));
        page.push_str(&format!("<td>{}</td>", escape(&fund.name)));
        page.push_str(&format!("<td>{:.4}</td>", fund.current_price));
        page.push_str(&format!("<td>{}</td>", fmt_opt(fund.nav_price, 4)));
        page.push_str(&format!("<td>{}</td>", fmt_opt(fund.gold_backing_grams, 6)));
        match delta {
            Some(d) => {
                page.push_str(&format!("<td>{:.4}</td>", d.per_gram_price));
                page.push_str(&format!("<td>{:.4}</td>", d.absolute_diff));
                page.push_str(&format!("<td>{:.2}%</td>", d.percent_diff));
            }
            None => page.push_str("<td>n/a</td><td>n/a</td><td>n/a</td>"),
        }
        page.push_str("</tr>");
    }

    page.push_str("</tbody></table></body></html>");
    page
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "n/a".to_string(),
    }
}

/// Minimal escaping for text interpolated into the page.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compare;
    use crate::types::FundQuote;

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
    fn page_lists_funds_in_ranking_order() {
        // B ranks first: per-gram 40 vs A's 48.
        let result = compare(
            vec![fund("AAA", 120.0, Some(100.0)), fund("BBB", 80.0, None)],
            Some(40.0),
        )
        .unwrap();
        let page = comparison_page(&result);

        let pos_a = page.find("AAA").unwrap();
        let pos_b = page.find("BBB").unwrap();
        assert!(pos_b < pos_a, "cheapest must render first");
        assert!(page.contains("class=\"cheapest\""));
        assert!(page.contains("Spot gram gold: 40.00 TL/gram"));
    }

    #[test]
    fn degraded_result_renders_without_ranking() {
        let result = compare(vec![fund("AAA", 120.0, None)], None).unwrap();
        let page = comparison_page(&result);

        assert!(page.contains("class=\"degraded\""));
        assert!(page.contains("could not be completed"));
        assert!(!page.contains("class=\"cheapest\""));
        assert!(page.contains("Spot gram gold price unavailable"));
    }

    #[test]
    fn unranked_fund_shows_no_per_gram_columns() {
        let result = compare(
            vec![fund("AAA", 0.0, None), fund("BBB", 80.0, None)],
            Some(40.0),
        )
        .unwrap();
        let page = comparison_page(&result);

        assert!(page.contains("class=\"unranked\""));
        assert!(page.contains("<td>n/a</td><td>n/a</td><td>n/a</td>"));
    }

    #[test]
    fn fund_names_are_escaped() {
        let mut quote = fund("AAA", 80.0, None);
        quote.name = "Fonds <Gold> & Co".to_string();
        let result = compare(vec![quote], Some(40.0)).unwrap();
        let page = comparison_page(&result);

        assert!(page.contains("Fonds &lt;Gold&gt; &amp; Co"));
        assert!(!page.contains("<Gold>"));
    }
}
