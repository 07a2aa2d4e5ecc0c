//! Session state — the explicit replacement for ambient global state.
//!
//! One `Session` lives for the duration of a wizard run: created at app
//! start, cleared on logout. Reads and writes go through this handle
//! rather than any global store.

use std::collections::HashMap;

use secrecy::SecretString;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::api::PropertyInfo;

#[derive(Default)]
struct SessionInner {
    logged_in: bool,
    auth_token: Option<SecretString>,
    selected_property: Option<PropertyInfo>,
    /// Per-step scratch values, keyed by 1-based step number. Holds the
    /// ancillary flags that drive conditional rendering (kept listing
    /// ids, chosen condition rating, slider value, …).
    step_values: HashMap<usize, serde_json::Value>,
}

/// In-memory application state handle shared across the server.
pub struct Session {
    /// Correlation id for log lines across this run.
    id: Uuid,
    inner: RwLock<SessionInner>,
}

impl Session {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        info!(session_id = %id, "Session created");
        Self {
            id,
            inner: RwLock::new(SessionInner::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Record a successful login.
    pub async fn login(&self, token: SecretString) {
        let mut inner = self.inner.write().await;
        inner.logged_in = true;
        inner.auth_token = Some(token);
    }

    pub async fn is_logged_in(&self) -> bool {
        self.inner.read().await.logged_in
    }

    pub async fn auth_token(&self) -> Option<SecretString> {
        self.inner.read().await.auth_token.clone()
    }

    /// The property the user verified in step 1, if any.
    pub async fn selected_property(&self) -> Option<PropertyInfo> {
        self.inner.read().await.selected_property.clone()
    }

    pub async fn set_selected_property(&self, property: PropertyInfo) {
        info!(property_id = %property.id, "Property selected");
        self.inner.write().await.selected_property = Some(property);
    }

    pub async fn is_property_selected(&self) -> bool {
        self.inner.read().await.selected_property.is_some()
    }

    /// Read the scratch value for a step.
    pub async fn step_value(&self, step: usize) -> Option<serde_json::Value> {
        self.inner.read().await.step_values.get(&step).cloned()
    }

    /// Replace the scratch value for a step.
    pub async fn set_step_value(&self, step: usize, value: serde_json::Value) {
        self.inner.write().await.step_values.insert(step, value);
    }

    /// Drop the scratch value for a step.
    pub async fn clear_step_value(&self, step: usize) {
        self.inner.write().await.step_values.remove(&step);
    }

    /// Wipe everything. Called on logout and navigation back to home.
    pub async fn clear(&self) {
        info!(session_id = %self.id, "Session cleared");
        *self.inner.write().await = SessionInner::default();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_property() -> PropertyInfo {
        PropertyInfo {
            id: "prop_1".to_string(),
            address: "1427 Sycamore Ln".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            zip: "78745".to_string(),
            beds: 3,
            baths: 2.0,
            sqft: 1840,
            year_built: None,
            estimated_value: dec!(400000),
        }
    }

    #[tokio::test]
    async fn starts_empty() {
        let session = Session::new();
        assert!(!session.is_logged_in().await);
        assert!(!session.is_property_selected().await);
        assert!(session.step_value(1).await.is_none());
    }

    #[tokio::test]
    async fn stores_selected_property() {
        let session = Session::new();
        session.set_selected_property(sample_property()).await;
        assert!(session.is_property_selected().await);
        assert_eq!(
            session.selected_property().await.unwrap().id,
            "prop_1"
        );
    }

    #[tokio::test]
    async fn step_values_are_keyed_by_step() {
        let session = Session::new();
        session
            .set_step_value(2, serde_json::json!({"kept": ["comp_01", "comp_03"]}))
            .await;
        session
            .set_step_value(5, serde_json::json!({"close_days": 30}))
            .await;

        assert_eq!(
            session.step_value(2).await.unwrap()["kept"][0],
            "comp_01"
        );
        assert_eq!(session.step_value(5).await.unwrap()["close_days"], 30);
        assert!(session.step_value(3).await.is_none());

        session.clear_step_value(2).await;
        assert!(session.step_value(2).await.is_none());
    }

    #[tokio::test]
    async fn clear_wipes_everything() {
        let session = Session::new();
        session.login(SecretString::from("tok_abc")).await;
        session.set_selected_property(sample_property()).await;
        session.set_step_value(1, serde_json::json!(true)).await;

        session.clear().await;

        assert!(!session.is_logged_in().await);
        assert!(session.auth_token().await.is_none());
        assert!(!session.is_property_selected().await);
        assert!(session.step_value(1).await.is_none());
    }
}
