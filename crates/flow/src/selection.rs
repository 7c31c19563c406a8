//! Line-of-business and opportunity-type selection.
//!
//! The draft follows the user's edits. Running the Opportunity step commits
//! a snapshot, and Offers, Forecast, and Launch read that snapshot. When the
//! draft has moved on since the commit the store reports itself stale so the
//! controller can warn instead of silently mixing the two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wizard_core::types::Dialog;

use crate::filter::normalize_lobs;

pub const AUTO: &str = "Auto";

/// Selectable LOB values with their display labels.
pub const LOB_OPTIONS: [(&str, &str); 4] = [
    ("TOTAL_NETWORK", "Total Network"),
    ("DATA", "Data"),
    ("VOICE", "Voice"),
    ("VAS", "VAS"),
];

/// Selectable opportunity types with the hint shown when none is picked.
pub const OPP_TYPE_OPTIONS: [(&str, &str); 6] = [
    (AUTO, "System determines best opportunity for each customer"),
    ("Upsell", "Grow revenue from stable customers"),
    ("Retain", "Prevent churn from declining customers"),
    ("Revive", "Win back at-risk customers"),
    ("Cross-sell", "Activate new service lines"),
    ("No action", "Standard treatment"),
];

/// Display text for a LOB value; unknown values show as given.
pub fn lob_label(value: &str) -> &str {
    LOB_OPTIONS
        .iter()
        .find(|(v, _)| v.eq_ignore_ascii_case(value))
        .map(|(_, label)| *label)
        .unwrap_or(value)
}

pub fn is_auto(opp_type: &str) -> bool {
    opp_type.eq_ignore_ascii_case(AUTO)
}

/// A normalized view of the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub lobs: Vec<String>,
    pub opp_types: Vec<String>,
    pub normalized_lobs: Vec<String>,
}

impl Selection {
    pub fn has_auto(&self) -> bool {
        self.opp_types.iter().any(|t| is_auto(t))
    }
}

/// Selection frozen when the Opportunity step ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    #[serde(flatten)]
    pub selection: Selection,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    lobs: Vec<String>,
    opp_types: Vec<String>,
    snapshot: Option<SelectionSnapshot>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the LOB draft. Blank entries and duplicates are dropped.
    pub fn set_lobs<I, S>(&mut self, lobs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lobs.clear();
        for lob in lobs {
            let lob: String = lob.into();
            let lob = lob.trim().to_string();
            if !lob.is_empty() && !self.lobs.contains(&lob) {
                self.lobs.push(lob);
            }
        }
    }

    /// Add one opportunity type. Picking Auto clears the others; picking
    /// anything else clears Auto.
    pub fn select_opp_type(&mut self, opp_type: &str) {
        let opp_type = opp_type.trim();
        if opp_type.is_empty() {
            return;
        }
        if is_auto(opp_type) {
            self.opp_types = vec![AUTO.to_string()];
            return;
        }
        self.opp_types.retain(|t| !is_auto(t));
        if !self.opp_types.iter().any(|t| t == opp_type) {
            self.opp_types.push(opp_type.to_string());
        }
    }

    pub fn deselect_opp_type(&mut self, opp_type: &str) {
        self.opp_types.retain(|t| t != opp_type.trim());
    }

    /// Replace the type draft wholesale. Auto alongside other types keeps
    /// only Auto.
    pub fn set_opp_types<I, S>(&mut self, opp_types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut picked: Vec<String> = Vec::new();
        for t in opp_types {
            let t: String = t.into();
            let t = t.trim().to_string();
            if !t.is_empty() && !picked.contains(&t) {
                picked.push(t);
            }
        }
        self.opp_types = if picked.iter().any(|t| is_auto(t)) {
            vec![AUTO.to_string()]
        } else {
            picked
        };
    }

    pub fn draft_lobs(&self) -> &[String] {
        &self.lobs
    }

    pub fn draft_opp_types(&self) -> &[String] {
        &self.opp_types
    }

    /// The draft, recomputed on every call.
    pub fn current(&self) -> Selection {
        Selection {
            lobs: self.lobs.clone(),
            opp_types: self.opp_types.clone(),
            normalized_lobs: normalize_lobs(&self.lobs),
        }
    }

    /// Freeze the draft for downstream steps.
    pub fn commit(&mut self, at: DateTime<Utc>) -> &SelectionSnapshot {
        self.snapshot.insert(SelectionSnapshot {
            selection: self.current(),
            timestamp: at,
        })
    }

    pub fn snapshot(&self) -> Option<&SelectionSnapshot> {
        self.snapshot.as_ref()
    }

    /// True when a snapshot exists and the draft no longer matches it.
    pub fn is_stale(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| {
            s.selection.lobs != self.lobs || s.selection.opp_types != self.opp_types
        })
    }

    /// Blocking dialog when no LOB is selected.
    pub fn validate_lobs(&self) -> Result<(), Dialog> {
        if !self.lobs.is_empty() {
            return Ok(());
        }
        let mut lines = vec![
            "Please select at least one LOB (Line of Business) before proceeding.".to_string(),
            "Available LOBs:".to_string(),
        ];
        lines.extend(LOB_OPTIONS.iter().map(|(value, label)| {
            if *value == "TOTAL_NETWORK" {
                format!("{label} (Voice + Data + VAS)")
            } else {
                label.to_string()
            }
        }));
        lines.push("Tip: Use Ctrl+Click to select multiple LOBs.".to_string());
        Err(Dialog::new("LOB Selection Required", lines))
    }

    /// Blocking dialog when no opportunity type is selected.
    pub fn validate_opp_types(&self) -> Result<(), Dialog> {
        if !self.opp_types.is_empty() {
            return Ok(());
        }
        let mut lines = vec![
            "Please select at least one Opportunity Type before proceeding.".to_string(),
            "Available Types:".to_string(),
        ];
        lines.extend(
            OPP_TYPE_OPTIONS
                .iter()
                .map(|(value, hint)| format!("{value} - {hint}")),
        );
        lines.push("Tip: Use Ctrl+Click to select multiple types.".to_string());
        Err(Dialog::new("Opportunity Type Required", lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_clears_other_types() {
        let mut store = SelectionStore::new();
        store.select_opp_type("Upsell");
        store.select_opp_type("Retain");
        store.select_opp_type("Auto");
        assert_eq!(store.draft_opp_types(), ["Auto"]);
    }

    #[test]
    fn test_specific_type_clears_auto() {
        let mut store = SelectionStore::new();
        store.select_opp_type("Auto");
        store.select_opp_type("Revive");
        assert_eq!(store.draft_opp_types(), ["Revive"]);
    }

    #[test]
    fn test_bulk_set_with_auto_keeps_only_auto() {
        let mut store = SelectionStore::new();
        store.set_opp_types(["Upsell", "Auto", "Retain"]);
        assert_eq!(store.draft_opp_types(), ["Auto"]);
        store.set_opp_types(["Upsell", "Upsell", " "]);
        assert_eq!(store.draft_opp_types(), ["Upsell"]);
    }

    #[test]
    fn test_current_normalizes_lobs() {
        let mut store = SelectionStore::new();
        store.set_lobs(["data", "Voice", "data"]);
        let sel = store.current();
        assert_eq!(sel.lobs, vec!["data", "Voice"]);
        assert_eq!(sel.normalized_lobs, vec!["DATA", "VOICE"]);

        store.set_lobs(Vec::<String>::new());
        assert_eq!(
            store.current().normalized_lobs,
            vec!["DATA", "VOICE", "VAS", "TOTAL_NETWORK"]
        );
    }

    #[test]
    fn test_snapshot_staleness() {
        let mut store = SelectionStore::new();
        store.set_lobs(["DATA"]);
        store.select_opp_type("Upsell");
        assert!(!store.is_stale());

        store.commit(Utc::now());
        assert!(!store.is_stale());

        store.set_lobs(["DATA", "VAS"]);
        assert!(store.is_stale());
        assert_eq!(store.snapshot().unwrap().selection.lobs, vec!["DATA"]);

        store.commit(Utc::now());
        assert!(!store.is_stale());
    }

    #[test]
    fn test_validation_dialogs() {
        let mut store = SelectionStore::new();
        let lob = store.validate_lobs().unwrap_err();
        assert_eq!(lob.title, "LOB Selection Required");
        assert!(lob.lines.contains(&"Total Network (Voice + Data + VAS)".to_string()));
        assert!(lob.lines.last().unwrap().contains("Ctrl+Click"));

        let opp = store.validate_opp_types().unwrap_err();
        assert_eq!(opp.title, "Opportunity Type Required");
        assert_eq!(opp.lines.len(), 9);

        store.set_lobs(["VAS"]);
        store.select_opp_type("Auto");
        assert!(store.validate_lobs().is_ok());
        assert!(store.validate_opp_types().is_ok());
    }

    #[test]
    fn test_lob_labels() {
        assert_eq!(lob_label("TOTAL_NETWORK"), "Total Network");
        assert_eq!(lob_label("data"), "Data");
        assert_eq!(lob_label("OTHER"), "OTHER");
    }
}
