pub mod config;
pub mod error;
pub mod event_bus;
pub mod format;
pub mod types;

pub use config::AppConfig;
pub use error::{WizardError, WizardResult};
pub use event_bus::{CaptureSink, EventSink, NoOpSink};
