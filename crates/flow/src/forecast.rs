use serde_json::Value;

use wizard_api::models::{ForecastKpis, ForecastPayload, ForecastSeries};
use wizard_core::format::{cell_text, money_m, neg_pct_badge, number_of, pct_badge, pct_plain};
use wizard_core::types::{BarChart, ForecastView, KpiTile};

fn tile(id: &str, value: String, badge: String) -> KpiTile {
    KpiTile {
        id: id.to_string(),
        value,
        badge,
    }
}

fn chart(id: &str, labels: &[String], data: &[Value]) -> BarChart {
    BarChart {
        id: id.to_string(),
        labels: labels.to_vec(),
        data: data.iter().map(number_of).collect(),
    }
}

/// Three KPI tiles and three six-month bar charts. Missing parts render as
/// placeholders and empty charts.
pub fn render_forecast(payload: &ForecastPayload) -> ForecastView {
    let k = payload.kpis.clone().unwrap_or_else(ForecastKpis::default);
    let s = payload.series.clone().unwrap_or_else(ForecastSeries::default);
    let months: Vec<String> = s.months6.iter().map(cell_text).collect();

    ForecastView {
        tiles: vec![
            tile(
                "revenue_total",
                money_m(number_of(&k.revenue_total_m)),
                pct_badge(number_of(&k.rev_uplift_pct)),
            ),
            tile(
                "margin_total",
                money_m(number_of(&k.margin_total_m)),
                pct_badge(number_of(&k.margin_uplift_pct)),
            ),
            tile(
                "churn_avg",
                pct_plain(number_of(&k.churn_avg_pct)),
                neg_pct_badge(number_of(&k.churn_reduction_pct)),
            ),
        ],
        charts: vec![
            chart("revenue6", &months, &s.revenue6_m),
            chart("margin6", &months, &s.margin6_m),
            chart("churn6", &months, &s.churn6_pct),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: Value) -> ForecastPayload {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_full_payload() {
        let view = render_forecast(&payload(json!({
            "kpis": {
                "revenue_total_m": 612.345,
                "margin_total_m": 150.0,
                "churn_avg_pct": 2.456,
                "rev_uplift_pct": 4.2,
                "margin_uplift_pct": -1.0,
                "churn_reduction_pct": 1.76
            },
            "series": {
                "months6": ["May", "Jun", "Jul", "Aug", "Sep", "Oct"],
                "revenue6_m": [100.1, 101.2, 102.3, 103.4, 104.5, 100.8],
                "margin6_m": [25, 25, 26, 26, 27, 21],
                "churn6_pct": [3.1, 3.0, 2.9, 2.8, 2.7, 2.6]
            }
        })));

        assert_eq!(view.tiles[0].value, "$612.35M");
        assert_eq!(view.tiles[0].badge, "+4.2%");
        assert_eq!(view.tiles[1].badge, "-1.0%");
        assert_eq!(view.tiles[2].value, "2.46%");
        assert_eq!(view.tiles[2].badge, "-1.8%");
        assert_eq!(view.charts.len(), 3);
        assert_eq!(view.charts[0].labels[0], "May");
        assert_eq!(view.charts[1].data[5], 21.0);
    }

    #[test]
    fn test_missing_parts_render_placeholders() {
        let view = render_forecast(&payload(json!({"kpis": {"revenue_total_m": "n/a"}})));
        assert_eq!(view.tiles[0].value, "—");
        assert_eq!(view.tiles[0].badge, "+—%");
        assert_eq!(view.tiles[1].value, "—");
        assert_eq!(view.tiles[2].value, "0.00%");
        assert_eq!(view.tiles[2].badge, "-—%");
        assert!(view.charts.iter().all(|c| c.labels.is_empty() && c.data.is_empty()));
    }
}
