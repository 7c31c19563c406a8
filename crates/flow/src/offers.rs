//! Per-opportunity-type offer counts configured before generating offers.

use serde_json::{Map, Value};

use wizard_core::types::OfferCard;
use wizard_core::{WizardError, WizardResult};

use crate::selection::{is_auto, SelectionSnapshot};

/// Types shown when Auto is selected.
pub const AUTO_EXPANSION: [&str; 5] = ["Upsell", "Retain", "Revive", "Cross-sell", "No action"];

pub const MIN_OFFERS: u8 = 1;
pub const MAX_OFFERS: u8 = 3;

/// Shown in place of the grid before the Opportunity step has run.
pub const PLAN_PLACEHOLDER: &str =
    "Please complete Step 3 (Opportunity Identification) first to configure offers.";

struct TypeProfile {
    name: &'static str,
    icon: &'static str,
    default_count: u8,
}

const PROFILES: [TypeProfile; 5] = [
    TypeProfile { name: "Upsell", icon: "📈", default_count: 2 },
    TypeProfile { name: "Retain", icon: "🛡️", default_count: 2 },
    TypeProfile { name: "Revive", icon: "🔄", default_count: 1 },
    TypeProfile { name: "Cross-sell", icon: "🔀", default_count: 1 },
    TypeProfile { name: "No action", icon: "⏸️", default_count: 1 },
];

const GENERIC_ICON: &str = "📋";

fn profile(opp_type: &str) -> (&'static str, u8) {
    PROFILES
        .iter()
        .find(|p| p.name == opp_type)
        .map(|p| (p.icon, p.default_count))
        .unwrap_or((GENERIC_ICON, 1))
}

/// One card per opportunity type, each with an offer count in 1..=3.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferPlan {
    cards: Vec<OfferCard>,
}

impl OfferPlan {
    /// Build the plan from the committed selection. `None` when nothing has
    /// been committed or it has no types.
    pub fn from_snapshot(snapshot: Option<&SelectionSnapshot>) -> Option<OfferPlan> {
        let types = &snapshot?.selection.opp_types;
        if types.is_empty() {
            return None;
        }
        let shown: Vec<String> = if types.iter().any(|t| is_auto(t)) {
            AUTO_EXPANSION.iter().map(|t| t.to_string()).collect()
        } else {
            types.clone()
        };
        let cards = shown
            .into_iter()
            .map(|opp_type| {
                let (icon, count) = profile(&opp_type);
                OfferCard {
                    icon: icon.to_string(),
                    count,
                    opp_type,
                }
            })
            .collect();
        Some(OfferPlan { cards })
    }

    pub fn cards(&self) -> &[OfferCard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn count_for(&self, opp_type: &str) -> Option<u8> {
        self.cards
            .iter()
            .find(|c| c.opp_type == opp_type)
            .map(|c| c.count)
    }

    pub fn set_count(&mut self, opp_type: &str, count: u8) -> WizardResult<()> {
        if !(MIN_OFFERS..=MAX_OFFERS).contains(&count) {
            return Err(WizardError::Validation(format!(
                "offer count must be between {MIN_OFFERS} and {MAX_OFFERS}, got {count}"
            )));
        }
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.opp_type == opp_type)
            .ok_or_else(|| {
                WizardError::Validation(format!("'{opp_type}' is not part of the offer plan"))
            })?;
        card.count = count;
        Ok(())
    }

    /// `offer_counts_per_opp` request field, in card order.
    pub fn counts(&self) -> Map<String, Value> {
        self.cards
            .iter()
            .map(|c| (c.opp_type.clone(), Value::from(c.count)))
            .collect()
    }

    /// `"Upsell: 2, Retain: 2"`.
    pub fn display(&self) -> String {
        self.cards
            .iter()
            .map(|c| format!("{}: {}", c.opp_type, c.count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionStore;
    use chrono::Utc;

    fn committed(types: &[&str]) -> SelectionStore {
        let mut store = SelectionStore::new();
        store.set_lobs(["DATA"]);
        store.set_opp_types(types.iter().copied());
        store.commit(Utc::now());
        store
    }

    #[test]
    fn test_auto_expands_with_defaults() {
        let store = committed(&["Auto"]);
        let plan = OfferPlan::from_snapshot(store.snapshot()).unwrap();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.display(), "Upsell: 2, Retain: 2, Revive: 1, Cross-sell: 1, No action: 1");
        assert_eq!(plan.cards()[1].icon, "🛡️");
    }

    #[test]
    fn test_unknown_type_gets_generic_card() {
        let store = committed(&["Loyalty"]);
        let plan = OfferPlan::from_snapshot(store.snapshot()).unwrap();
        assert_eq!(plan.cards()[0].icon, "📋");
        assert_eq!(plan.count_for("Loyalty"), Some(1));
    }

    #[test]
    fn test_no_snapshot_means_no_plan() {
        assert!(OfferPlan::from_snapshot(None).is_none());
        let store = committed(&[]);
        assert!(OfferPlan::from_snapshot(store.snapshot()).is_none());
    }

    #[test]
    fn test_set_count_validates_range_and_type() {
        let store = committed(&["Upsell", "Revive"]);
        let mut plan = OfferPlan::from_snapshot(store.snapshot()).unwrap();
        plan.set_count("Revive", 3).unwrap();
        assert!(plan.set_count("Revive", 4).is_err());
        assert!(plan.set_count("Revive", 0).is_err());
        assert!(plan.set_count("Retain", 2).is_err());

        let counts = plan.counts();
        assert_eq!(counts.get("Upsell"), Some(&Value::from(2u8)));
        assert_eq!(counts.get("Revive"), Some(&Value::from(3u8)));
        assert_eq!(plan.display(), "Upsell: 2, Revive: 3");
    }
}
