//! HTTP/WebSocket server — the surface presentation adapters talk to.

pub mod routes;
pub mod ws;

pub use routes::{AppState, wizard_routes};
pub use ws::ClientAction;
