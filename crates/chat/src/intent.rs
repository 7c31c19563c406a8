//! Goal classification for the marketing expert.
//!
//! Rules are checked in order and the first match wins, so a goal that
//! mentions both churn and revenue is a churn goal.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntentKind {
    Churn,
    Winback,
    Arpu,
    Adoption,
    Usage,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentKind::Churn => "CHURN",
            IntentKind::Winback => "WINBACK",
            IntentKind::Arpu => "ARPU",
            IntentKind::Adoption => "ADOPTION",
            IntentKind::Usage => "USAGE",
        }
    }
}

/// A recognized business goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub label: &'static str,
    pub objective: &'static str,
    pub metric: &'static str,
}

struct IntentRule {
    intent: Intent,
    pattern: Regex,
}

fn rule(kind: IntentKind, label: &'static str, objective: &'static str, metric: &'static str, pattern: &str) -> IntentRule {
    IntentRule {
        intent: Intent {
            kind,
            label,
            objective,
            metric,
        },
        pattern: Regex::new(&format!("(?i){pattern}")).expect("intent pattern is valid"),
    }
}

static RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    vec![
        rule(
            IntentKind::Churn,
            "Reduce Customer Churn",
            "Identify at-risk customers and prevent them from leaving",
            "Churn rate reduction",
            r"churn|retain|retention|losing\s*customer|stop.*leaving|prevent.*cancel|reduce.*attrition|customer.*leaving",
        ),
        rule(
            IntentKind::Winback,
            "Reactivate Dormant Customers",
            "Win back customers who have stopped using services",
            "Reactivation rate",
            r"win\s*back|reactivat|dormant|inactive|lapsed|bring.*back|lost.*customer",
        ),
        rule(
            IntentKind::Arpu,
            "Increase Revenue Per User",
            "Grow average revenue through upselling and upgrades",
            "ARPU uplift",
            r"arpu|revenue|upsell|upgrade|increase.*spend|more.*revenue|monetiz",
        ),
        rule(
            IntentKind::Adoption,
            "Drive Product Adoption",
            "Increase adoption of products and bundles",
            "Adoption rate",
            r"adopt|bundle|content\s*pack|ott|streaming|cross.?sell|new.*product|subscription",
        ),
        rule(
            IntentKind::Usage,
            "Increase Customer Engagement",
            "Boost product usage and customer engagement",
            "Usage increase",
            r"usage|engage|active|consumption|utiliz|more.*use",
        ),
    ]
});

/// Classify free text. `None` means the goal was not understood and the
/// caller should ask for clarification.
pub fn detect_intent(text: &str) -> Option<Intent> {
    RULES
        .iter()
        .find(|r| r.pattern.is_match(text))
        .map(|r| r.intent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(text: &str) -> Option<IntentKind> {
        detect_intent(text).map(|i| i.kind)
    }

    #[test]
    fn test_each_category() {
        assert_eq!(kind("I want to reduce customer churn"), Some(IntentKind::Churn));
        assert_eq!(kind("reactivate dormant customers"), Some(IntentKind::Winback));
        assert_eq!(kind("Increase ARPU through upselling"), Some(IntentKind::Arpu));
        assert_eq!(kind("drive content bundle adoption"), Some(IntentKind::Adoption));
        assert_eq!(kind("boost app usage"), Some(IntentKind::Usage));
    }

    #[test]
    fn test_first_match_wins() {
        // mentions churn and revenue
        assert_eq!(kind("protect revenue by lowering churn"), Some(IntentKind::Churn));
        // "inactive" is checked before "active"
        assert_eq!(kind("inactive users"), Some(IntentKind::Winback));
        assert_eq!(kind("cross-sell upgrades"), Some(IntentKind::Arpu));
    }

    #[test]
    fn test_unmatched_text() {
        assert_eq!(kind("Deploy this campaign"), None);
        assert_eq!(kind(""), None);
    }

    #[test]
    fn test_greeting_is_unmatched() {
        assert_eq!(detect_intent("hello"), None);
        assert_eq!(kind("I want to reduce churn"), Some(IntentKind::Churn));
    }

    #[test]
    fn test_intent_details() {
        let intent = detect_intent("win back lapsed subscribers").unwrap();
        assert_eq!(intent.label, "Reactivate Dormant Customers");
        assert_eq!(intent.metric, "Reactivation rate");
        assert_eq!(intent.kind.as_str(), "WINBACK");
    }
}
