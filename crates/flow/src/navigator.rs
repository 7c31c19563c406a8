use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use wizard_core::types::{Control, Step, ViewEvent};

/// Header shown above a pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneTitle {
    pub title: &'static str,
    pub subtitle: &'static str,
}

const FALLBACK_TITLE: PaneTitle = PaneTitle {
    title: "Product Expert",
    subtitle: "",
};

const TITLES: [(Step, PaneTitle); 6] = [
    (
        Step::Upload,
        PaneTitle {
            title: "Upload Audience",
            subtitle: "Validation and Ingestion Agent uploads subscriber base.",
        },
    ),
    (
        Step::Lifecycle,
        PaneTitle {
            title: "Lifecycle Stage Calculation",
            subtitle: "Lifecycle Intelligence Agent assigns lifecycle stage (no reasons).",
        },
    ),
    (
        Step::Opportunity,
        PaneTitle {
            title: "Opportunity Identification",
            subtitle: "Select LOBs and opportunity types. Next Best Action Agent outputs opportunities with premium reasoning.",
        },
    ),
    (
        Step::Offers,
        PaneTitle {
            title: "Offer Strategy",
            subtitle: "Next Best Offer Agent generates offers per selected LOB based on opportunities from Step 3.",
        },
    ),
    (
        Step::Forecast,
        PaneTitle {
            title: "Impact Forecast",
            subtitle: "Impact Forecast Agent estimates uplift and churn reduction.",
        },
    ),
    (
        Step::ReviewLaunch,
        PaneTitle {
            title: "Review & Launch",
            subtitle: "Governance Agent prepares approval pack and publishes output.",
        },
    ),
];

/// Header for `step`, by its wire name. Unknown names get the generic title.
pub fn pane_title(step: &str) -> PaneTitle {
    Step::parse(step)
        .and_then(|s| TITLES.iter().find(|(k, _)| *k == s).map(|(_, t)| *t))
        .unwrap_or(FALLBACK_TITLE)
}

/// Tracker fill for `step`: 0% on the first step, 100% on the last.
pub fn progress_pct(step: Step) -> f64 {
    let total = Step::ALL.len() as f64;
    (step.index() as f64 - 1.0) / (total - 1.0) * 100.0
}

/// Visible pane, completed steps, and the unlocked navigation items and
/// buttons. Completion is always a prefix of the step order; unlocking is
/// never undone.
#[derive(Debug, Clone)]
pub struct StepNavigator {
    active: Step,
    completed: BTreeSet<Step>,
    nav_enabled: BTreeSet<Step>,
    controls: BTreeSet<Control>,
}

impl StepNavigator {
    /// Starts on the upload pane with only its nav item enabled.
    pub fn new() -> Self {
        Self {
            active: Step::Upload,
            completed: BTreeSet::new(),
            nav_enabled: BTreeSet::from([Step::Upload]),
            controls: BTreeSet::new(),
        }
    }

    pub fn active(&self) -> Step {
        self.active
    }

    pub fn completed(&self) -> Vec<Step> {
        self.completed.iter().copied().collect()
    }

    pub fn is_completed(&self, step: Step) -> bool {
        self.completed.contains(&step)
    }

    pub fn is_nav_enabled(&self, step: Step) -> bool {
        self.nav_enabled.contains(&step)
    }

    pub fn is_control_enabled(&self, control: Control) -> bool {
        self.controls.contains(&control)
    }

    fn tracker(&self, highlighted: Step) -> ViewEvent {
        ViewEvent::TrackerUpdated {
            active: highlighted,
            completed: self.completed(),
            progress_pct: progress_pct(highlighted),
        }
    }

    /// Switch the visible pane and refresh header and tracker.
    pub fn show_pane(&mut self, step: Step) -> Vec<ViewEvent> {
        self.active = step;
        let title = pane_title(step.as_str());
        vec![
            ViewEvent::PaneShown {
                step,
                title: title.title.to_string(),
                subtitle: title.subtitle.to_string(),
            },
            self.tracker(step),
        ]
    }

    /// Mark `step` and every earlier step completed. Idempotent.
    pub fn mark_step_completed(&mut self, step: Step) -> ViewEvent {
        self.completed
            .extend(Step::ALL.iter().copied().filter(|s| s.index() <= step.index()));
        self.tracker(step)
    }

    /// Unlock a nav item. Returns the event only the first time.
    pub fn enable_nav(&mut self, step: Step) -> Option<ViewEvent> {
        self.nav_enabled
            .insert(step)
            .then_some(ViewEvent::NavEnabled(step))
    }

    /// Unlock a button. Returns the event only the first time.
    pub fn enable_control(&mut self, control: Control) -> Option<ViewEvent> {
        self.controls
            .insert(control)
            .then_some(ViewEvent::ControlEnabled(control))
    }

    /// A nav click: shows the pane when its item is enabled, otherwise
    /// nothing happens.
    pub fn click_nav(&mut self, step: Step) -> Option<Vec<ViewEvent>> {
        if !self.is_nav_enabled(step) {
            return None;
        }
        Some(self.show_pane(step))
    }
}

impl Default for StepNavigator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_and_fallback() {
        assert_eq!(pane_title("offers").title, "Offer Strategy");
        assert_eq!(pane_title("reviewlaunch").title, "Review & Launch");
        assert_eq!(pane_title("bogus"), FALLBACK_TITLE);
        assert_eq!(pane_title("bogus").subtitle, "");
    }

    #[test]
    fn test_progress() {
        assert_eq!(progress_pct(Step::Upload), 0.0);
        assert_eq!(progress_pct(Step::Opportunity), 40.0);
        assert_eq!(progress_pct(Step::ReviewLaunch), 100.0);
    }

    #[test]
    fn test_completion_is_prefix_closed() {
        let mut nav = StepNavigator::new();
        nav.mark_step_completed(Step::Offers);
        assert_eq!(
            nav.completed(),
            vec![Step::Upload, Step::Lifecycle, Step::Opportunity, Step::Offers]
        );
        nav.mark_step_completed(Step::Lifecycle);
        assert_eq!(nav.completed().len(), 4);
        assert!(!nav.is_completed(Step::Forecast));
    }

    #[test]
    fn test_nav_unlock_is_monotonic() {
        let mut nav = StepNavigator::new();
        assert!(nav.click_nav(Step::Lifecycle).is_none());
        assert_eq!(nav.active(), Step::Upload);

        assert_eq!(
            nav.enable_nav(Step::Lifecycle),
            Some(ViewEvent::NavEnabled(Step::Lifecycle))
        );
        assert_eq!(nav.enable_nav(Step::Lifecycle), None);

        let events = nav.click_nav(Step::Lifecycle).unwrap();
        assert!(matches!(
            events[0],
            ViewEvent::PaneShown { step: Step::Lifecycle, .. }
        ));
        assert_eq!(nav.active(), Step::Lifecycle);
    }

    #[test]
    fn test_controls_enable_once() {
        let mut nav = StepNavigator::new();
        assert!(!nav.is_control_enabled(Control::Download));
        assert!(nav.enable_control(Control::Download).is_some());
        assert!(nav.enable_control(Control::Download).is_none());
        assert!(nav.is_control_enabled(Control::Download));
    }

    #[test]
    fn test_tracker_reports_highlighted_step() {
        let mut nav = StepNavigator::new();
        match nav.mark_step_completed(Step::Lifecycle) {
            ViewEvent::TrackerUpdated {
                active,
                completed,
                progress_pct,
            } => {
                assert_eq!(active, Step::Lifecycle);
                assert_eq!(completed, vec![Step::Upload, Step::Lifecycle]);
                assert_eq!(progress_pct, 20.0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
