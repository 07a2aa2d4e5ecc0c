//! Message timeline — the ordered conversation log for one wizard step.
//!
//! The timeline is the leaf of the flow engine: it holds turns, computes
//! the avatar flag at append time, and fans out change events to
//! observers over a broadcast channel. Resets bump an epoch counter so
//! that delayed appends scheduled before a reset die silently.

pub mod log;
pub mod model;

pub use log::Timeline;
pub use model::{TimelineEvent, Turn, TurnKind, TurnPatch, TurnSpec, WidgetKind};
