//! The six-step campaign wizard: navigation, LOB and opportunity selection,
//! preview filtering, offer counts, forecast rendering, and the controller
//! that drives them against the backend.

pub mod controller;
pub mod filter;
pub mod forecast;
pub mod navigator;
pub mod offers;
pub mod selection;

pub use controller::{AppState, Outcome, WizardController, WizardSettings};
pub use navigator::StepNavigator;
pub use offers::OfferPlan;
pub use selection::{Selection, SelectionSnapshot, SelectionStore};
