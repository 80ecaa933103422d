use crate::core::{BrowserConfig, Locator};
use crate::errors::Result;
use crate::utils::javascript;
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

/// A resolved, momentarily valid reference to a DOM node.
///
/// Handles go stale after any DOM mutation; callers resolve one, use it for a
/// single operation and drop it.
#[derive(Debug, Clone)]
pub struct ElementHandle {
    reference: String,
    locator: Locator,
    resolved_at: Instant,
}

impl ElementHandle {
    pub fn new(reference: impl Into<String>, locator: Locator) -> Self {
        Self {
            reference: reference.into(),
            locator,
            resolved_at: Instant::now(),
        }
    }

    /// Backend specific node reference.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn resolved_at(&self) -> Instant {
        self.resolved_at
    }
}

/// The session/driver boundary. The interaction layer only ever talks to a
/// browser through this trait, so it stays agnostic of the transport behind it.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// First element matching the locator (or its `nth` match).
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle>;

    /// All matches in document order; possibly empty.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    /// Native click. Implementations classify failures as intercepted, stale
    /// or not interactable where they can.
    async fn click(&self, element: &ElementHandle) -> Result<()>;

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()>;

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool>;

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool>;

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool>;

    /// Whether another node covers the element's centre point.
    async fn is_obscured(&self, element: &ElementHandle) -> Result<bool> {
        let covered = self
            .execute_script(javascript::IS_OBSCURED, Some(element))
            .await?;
        Ok(covered.as_bool().unwrap_or(false))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// Runs `script`; when `element` is given it is available as `arguments[0]`.
    async fn execute_script(&self, script: &str, element: Option<&ElementHandle>)
        -> Result<Value>;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn window_handle(&self) -> Result<String>;

    async fn window_handles(&self) -> Result<Vec<String>>;

    async fn switch_window(&self, handle: &str) -> Result<()>;

    async fn close_window(&self) -> Result<()>;

    async fn capture_screenshot(&self) -> Result<Vec<u8>>;

    /// Ends the session. Called exactly once, at run teardown.
    async fn quit(&self) -> Result<()>;
}

/// Opens one independent session per run.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, config: &BrowserConfig) -> Result<Box<dyn SessionDriver>>;
}
