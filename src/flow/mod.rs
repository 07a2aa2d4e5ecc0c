//! Flow engine — the controller/orchestrator pair that executes step
//! scripts against the timeline.

pub mod controller;
pub mod orchestrator;

pub use controller::{PendingTurn, ResolveChoice, ResolveOutcome, StepController};
pub use orchestrator::{NoticeLevel, WizardEvent, WizardOrchestrator, WizardStatus};
