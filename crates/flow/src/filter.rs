//! Client-side narrowing of preview rows to the chosen LOBs and opportunity
//! types. Matching is deliberately loose (case folding, substring containment
//! in both directions, a few aliases) and never fails.

use tracing::debug;

use wizard_core::format::cell_text;
use wizard_core::types::PreviewRow;

use crate::selection::is_auto;

/// LOBs assumed when nothing is selected.
pub const DEFAULT_LOBS: [&str; 4] = ["DATA", "VOICE", "VAS", "TOTAL_NETWORK"];

/// Selected LOB → row values that also count as that LOB.
const LOB_ALIASES: &[(&str, &[&str])] = &[("TOTAL_NETWORK", &["TOTAL_NETWORK", "TOTALNETWORK", "TOTAL"])];

/// Canonical opportunity token → row tokens that also count as it.
const OPP_ALIASES: &[(&str, &[&str])] = &[("noaction", &["noaction", "no"])];

/// Opportunity tokens each lifecycle stage usually yields. Used for
/// diagnostics only.
const STAGE_OPPORTUNITIES: &[(&str, &[&str])] = &[
    ("grower", &["noaction", "no action"]),
    ("newuser", &["noaction", "no action"]),
    ("new user", &["noaction", "no action"]),
    ("dropper", &["retain"]),
    ("stopper", &["revive"]),
    ("stable", &["upsell", "noaction", "no action"]),
    ("nonuser", &["crosssell", "cross-sell"]),
    ("non-user", &["crosssell", "cross-sell"]),
];

const OPPORTUNITY_COLUMN_PREFIX: &str = "opportunity_";

/// Upper-cases each LOB; an empty selection means every LOB.
pub fn normalize_lobs<S: AsRef<str>>(lobs: &[S]) -> Vec<String> {
    if lobs.is_empty() {
        return DEFAULT_LOBS.iter().map(|l| l.to_string()).collect();
    }
    lobs.iter().map(|l| l.as_ref().to_uppercase()).collect()
}

/// Lower-case and strip everything but ASCII letters and digits:
/// `"Cross-sell"` → `"crosssell"`, `"No action"` → `"noaction"`.
pub fn normalize_opp_type(opp_type: &str) -> String {
    opp_type
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Leading `_`-separated token of an opportunity value, normalized:
/// `"upsell_data"` → `"upsell"`.
pub fn opportunity_token(value: &str) -> String {
    normalize_opp_type(value.split('_').next().unwrap_or_default())
}

/// Whether a row's LOB value falls under any of the selected (normalized) LOBs.
pub fn lob_matches(row_lob: &str, selected: &[String]) -> bool {
    let row_lob = row_lob.to_uppercase();
    selected.iter().any(|lob| {
        let lob = lob.to_uppercase();
        if lob == row_lob {
            return true;
        }
        let aliased = LOB_ALIASES
            .iter()
            .any(|(canon, forms)| lob == *canon && forms.contains(&row_lob.as_str()));
        aliased || row_lob.contains(&lob) || lob.contains(&row_lob)
    })
}

/// Whether a normalized row token matches any normalized selected type.
pub fn opp_type_matches(row_token: &str, selected: &[String]) -> bool {
    selected.iter().any(|t| {
        if t == row_token || row_token.contains(t.as_str()) || t.contains(row_token) {
            return true;
        }
        OPP_ALIASES
            .iter()
            .any(|(canon, forms)| t == canon && forms.contains(&row_token))
    })
}

/// Tokens a lifecycle stage typically yields; empty for unknown stages.
pub fn stage_opportunities(stage: &str) -> &'static [&'static str] {
    let stage: String = stage
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    STAGE_OPPORTUNITIES
        .iter()
        .find(|(key, _)| {
            let key: String = key.chars().filter(|c| c.is_ascii_lowercase()).collect();
            stage == key || stage.contains(&key) || key.contains(&stage)
        })
        .map(|(_, opps)| *opps)
        .unwrap_or(&[])
}

fn field(row: &PreviewRow, key: &str) -> String {
    row.get(key).map(cell_text).unwrap_or_default()
}

/// Narrow opportunity rows by `lob` and, unless Auto is chosen, by the
/// leading token of `opportunity`. Rows with no opportunity value pass the
/// type check.
pub fn filter_opportunity_preview<S: AsRef<str>>(
    rows: &[PreviewRow],
    lobs: &[S],
    opp_types: &[S],
) -> Vec<PreviewRow> {
    let lobs = normalize_lobs(lobs);
    let types: Vec<String> = opp_types
        .iter()
        .map(|t| normalize_opp_type(t.as_ref()))
        .collect();
    let has_auto = opp_types.iter().any(|t| is_auto(t.as_ref()));
    debug!(?lobs, ?types, has_auto, "Filtering opportunity preview");

    rows.iter()
        .filter(|row| {
            let row_lob = field(row, "lob");
            if !lob_matches(&row_lob, &lobs) {
                debug!(lob = %row_lob, "Row dropped: LOB mismatch");
                return false;
            }
            if has_auto {
                return true;
            }
            let opportunity = field(row, "opportunity");
            if opportunity.is_empty() {
                return true;
            }
            let token = opportunity_token(&opportunity);
            if !opp_type_matches(&token, &types) {
                debug!(opportunity = %opportunity, "Row dropped: opportunity mismatch");
                return false;
            }

            let stage = field(row, "lifecycle_stage");
            if !stage.is_empty() {
                let usual = stage_opportunities(&stage);
                if !usual.is_empty() && !usual.iter().any(|v| normalize_opp_type(v) == token) {
                    debug!(stage = %stage, ?usual, token = %token, "Unusual opportunity for lifecycle stage");
                }
            }
            true
        })
        .cloned()
        .collect()
}

/// Narrow offer rows by their `opportunity_*` columns: a row stays when any
/// of them matches a selected type, or when it has none. No LOBs, Auto, or
/// no types selected keeps every row.
pub fn filter_offers_preview<S: AsRef<str>>(
    rows: &[PreviewRow],
    lobs: &[S],
    opp_types: &[S],
) -> Vec<PreviewRow> {
    if lobs.is_empty() || opp_types.iter().any(|t| is_auto(t.as_ref())) {
        return rows.to_vec();
    }
    let types: Vec<String> = opp_types
        .iter()
        .map(|t| normalize_opp_type(t.as_ref()))
        .collect();
    if types.is_empty() {
        return rows.to_vec();
    }
    debug!(?types, rows = rows.len(), "Filtering offers preview");

    rows.iter()
        .filter(|row| {
            let mut columns = row
                .keys()
                .filter(|k| k.starts_with(OPPORTUNITY_COLUMN_PREFIX))
                .peekable();
            if columns.peek().is_none() {
                return true;
            }
            columns.any(|col| {
                let token = opportunity_token(&field(row, col).to_lowercase());
                opp_type_matches(&token, &types)
            })
        })
        .cloned()
        .collect()
}

/// Distinct leading tokens of `opportunity` values in first-seen order, as
/// they appear in the data.
pub fn available_opportunity_types(rows: &[PreviewRow]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for row in rows {
        let opportunity = field(row, "opportunity");
        if opportunity.is_empty() {
            continue;
        }
        let token = opportunity.split('_').next().unwrap_or_default().to_string();
        if !seen.contains(&token) {
            seen.push(token);
        }
    }
    seen
}
