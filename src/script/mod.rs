//! Step scripts — the declarative chains the controller executes.
//!
//! A script is a linked list of stages, never a graph: each stage's
//! turn either auto-triggers the next stage off a timer (agent text) or
//! holds the chain until the user resolves it (interactive widget).

pub mod model;
pub mod steps;

pub use model::{Stage, StepScript, WizardFlow};
pub use steps::builtin_flow;
