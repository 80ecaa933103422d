use crate::core::{BrowserConfig, ElementHandle, Locator, SessionDriver, SessionFactory};
use crate::errors::{FormError, Result};
use crate::utils::javascript;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

/// Attribute stamped on every node this session hands out a handle for.
const REF_ATTRIBUTE: &str = "data-formpilot-ref";

/// Launches a local Chrome per session.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher;

impl ChromeLauncher {
    pub fn new() -> Self {
        Self
    }

    fn launch_args(config: &BrowserConfig) -> Vec<String> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!(
                "--window-size={},{}",
                config.viewport.width, config.viewport.height
            ),
        ];
        if let Some(ua) = &config.user_agent {
            args.push(format!("--user-agent={}", ua));
        }
        args.extend(config.args.iter().cloned());
        args
    }
}

#[async_trait]
impl SessionFactory for ChromeLauncher {
    async fn open(&self, config: &BrowserConfig) -> Result<Box<dyn SessionDriver>> {
        let args = Self::launch_args(config);
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args.iter().map(OsStr::new).collect())
            .build()
            .map_err(|e| FormError::LaunchFailed(e.to_string()))?;
        let browser = Browser::new(options).map_err(|e| FormError::LaunchFailed(e.to_string()))?;
        let tab = browser
            .wait_for_initial_tab()
            .map_err(|e| FormError::LaunchFailed(e.to_string()))?;
        info!(headless = config.headless, "chrome session opened");
        Ok(Box::new(ChromeSession::new(browser, tab)))
    }
}

#[derive(Debug, Deserialize)]
struct ScriptOutcome {
    #[serde(default)]
    stale: bool,
    #[serde(default)]
    value: Value,
}

/// A Chrome window driven over the DevTools protocol.
///
/// Element handles are tags written onto the node itself, so a handle whose
/// node was re-rendered no longer resolves and reports as stale.
pub struct ChromeSession {
    browser: Mutex<Option<Browser>>,
    current: Mutex<Option<Arc<Tab>>>,
    ref_prefix: String,
}

impl ChromeSession {
    pub fn new(browser: Browser, tab: Arc<Tab>) -> Self {
        Self {
            browser: Mutex::new(Some(browser)),
            current: Mutex::new(Some(tab)),
            ref_prefix: Uuid::new_v4().simple().to_string(),
        }
    }

    fn tab(&self) -> Result<Arc<Tab>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| FormError::WindowError("no current window".into()))
    }

    fn tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let browser = self.browser.lock().unwrap_or_else(PoisonError::into_inner);
        let browser = browser
            .as_ref()
            .ok_or_else(|| FormError::WindowError("session has quit".into()))?;
        let tabs = browser
            .get_tabs()
            .lock()
            .map_err(|e| FormError::WindowError(e.to_string()))?
            .clone();
        Ok(tabs)
    }

    fn evaluate(&self, expression: &str) -> Result<ScriptOutcome> {
        let result = self
            .tab()?
            .evaluate(expression, false)
            .map_err(|e| FormError::JavaScriptFailed(e.to_string()))?;
        match result.value {
            Some(Value::String(raw)) => Ok(serde_json::from_str(&raw)?),
            other => Err(FormError::JavaScriptFailed(format!(
                "unexpected script result {:?}",
                other
            ))),
        }
    }

    /// Runs `body` with the handle's node as `arguments[0]`.
    fn on_element(&self, element: &ElementHandle, body: &str) -> Result<Value> {
        let expression = format!(
            "(function() {{ const el = document.querySelector({}); \
             if (!el) {{ return JSON.stringify({{stale: true}}); }} \
             const value = (function() {{ {} }}).apply(null, [el]); \
             return JSON.stringify({{stale: false, value: value === undefined ? null : value}}); }})()",
            javascript::json_string(&ref_selector(element.reference())),
            body
        );
        let outcome = self.evaluate(&expression)?;
        if outcome.stale {
            return Err(FormError::StaleElement(element.locator().to_string()));
        }
        Ok(outcome.value)
    }

    fn resolve(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let expression = format!(
            "(function() {{ const nodes = {}; \
             window.__formpilotSeq = window.__formpilotSeq || 0; \
             const refs = nodes.map(n => {{ \
               if (!n.getAttribute({attr})) {{ \
                 window.__formpilotSeq += 1; \
                 n.setAttribute({attr}, {prefix} + '-' + window.__formpilotSeq); \
               }} \
               return n.getAttribute({attr}); }}); \
             return JSON.stringify({{value: refs}}); }})()",
            javascript::query_all(locator),
            attr = javascript::json_string(REF_ATTRIBUTE),
            prefix = javascript::json_string(&self.ref_prefix),
        );
        let refs: Vec<String> = serde_json::from_value(self.evaluate(&expression)?.value)?;
        let handles = refs
            .into_iter()
            .enumerate()
            .map(|(i, reference)| ElementHandle::new(reference, locator.nth(i)));
        Ok(match locator.index() {
            Some(index) => handles.skip(index).take(1).collect(),
            None => handles.collect(),
        })
    }

    fn flag(&self, element: &ElementHandle, body: &str) -> Result<bool> {
        Ok(self.on_element(element, body)?.as_bool().unwrap_or(false))
    }
}

fn ref_selector(reference: &str) -> String {
    format!("[{}=\"{}\"]", REF_ATTRIBUTE, reference)
}

/// Maps a native click failure onto the categories the actuator retries on.
fn classify_click_failure(element: &ElementHandle, message: String) -> FormError {
    let lowered = message.to_lowercase();
    let locator = element.locator().to_string();
    if lowered.contains("box model") || lowered.contains("not visible") || lowered.contains("zero size") {
        FormError::NotInteractable(format!("{}: {}", locator, message))
    } else if lowered.contains("no node") || lowered.contains("could not find node") {
        FormError::StaleElement(locator)
    } else {
        FormError::from_any_error(message)
    }
}

#[async_trait]
impl SessionDriver for ChromeSession {
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        self.resolve(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| FormError::ElementNotFound(locator.to_string()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        self.resolve(locator)
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        if self.is_obscured(element).await? {
            return Err(FormError::ClickIntercepted(element.locator().to_string()));
        }
        let tab = self.tab()?;
        let node = tab
            .find_element(&ref_selector(element.reference()))
            .map_err(|_| FormError::StaleElement(element.locator().to_string()))?;
        node.click()
            .map_err(|e| classify_click_failure(element, e.to_string()))?;
        debug!(locator = %element.locator(), "native click");
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let tab = self.tab()?;
        let node = tab
            .find_element(&ref_selector(element.reference()))
            .map_err(|_| FormError::StaleElement(element.locator().to_string()))?;
        node.type_into(text)
            .map_err(|e| classify_click_failure(element, e.to_string()))?;
        Ok(())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        self.flag(
            element,
            "const s = window.getComputedStyle(arguments[0]); \
             const r = arguments[0].getBoundingClientRect(); \
             return s.display !== 'none' && s.visibility !== 'hidden' && (r.width > 0 || r.height > 0);",
        )
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        self.flag(element, "return !arguments[0].disabled;")
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        self.flag(element, "return !!(arguments[0].checked || arguments[0].selected);")
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        let value = self.on_element(
            element,
            "return arguments[0].innerText || arguments[0].textContent || '';",
        )?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        // Properties first so `href` comes back resolved, like a WebDriver would.
        let body = format!(
            "const p = arguments[0][{name}]; \
             return typeof p === 'string' ? p : arguments[0].getAttribute({name});",
            name = javascript::json_string(name)
        );
        Ok(self
            .on_element(element, &body)?
            .as_str()
            .map(str::to_string))
    }

    async fn execute_script(&self, script: &str, element: Option<&ElementHandle>) -> Result<Value> {
        match element {
            Some(element) => self.on_element(element, script),
            None => {
                let expression = format!(
                    "(function() {{ const value = (function() {{ {} }})(); \
                     return JSON.stringify({{value: value === undefined ? null : value}}); }})()",
                    script
                );
                Ok(self.evaluate(&expression)?.value)
            }
        }
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let tab = self.tab()?;
        tab.navigate_to(url)
            .map_err(|e| FormError::NavigationFailed(e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| FormError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.tab()?.get_url())
    }

    async fn window_handle(&self) -> Result<String> {
        Ok(self.tab()?.get_target_id().to_string())
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        Ok(self
            .tabs()?
            .iter()
            .map(|tab| tab.get_target_id().to_string())
            .collect())
    }

    async fn switch_window(&self, handle: &str) -> Result<()> {
        let tab = self
            .tabs()?
            .into_iter()
            .find(|tab| tab.get_target_id().as_str() == handle)
            .ok_or_else(|| FormError::WindowError(format!("no window {}", handle)))?;
        tab.bring_to_front()
            .map_err(|e| FormError::WindowError(e.to_string()))?;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(tab);
        Ok(())
    }

    async fn close_window(&self) -> Result<()> {
        let tab = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| FormError::WindowError("no current window".into()))?;
        tab.close(true)
            .map_err(|e| FormError::WindowError(e.to_string()))?;
        Ok(())
    }

    async fn capture_screenshot(&self) -> Result<Vec<u8>> {
        self.tab()?
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| FormError::ScreenshotFailed(e.to_string()))
    }

    async fn quit(&self) -> Result<()> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let browser = self
            .browser
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if browser.is_some() {
            info!("chrome session closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_failures_are_classified() {
        let element = ElementHandle::new("fp-1", Locator::id("save-btn").unwrap());

        let hidden = classify_click_failure(&element, "Could not compute box model.".into());
        assert!(matches!(hidden, FormError::NotInteractable(_)));

        let gone = classify_click_failure(&element, "No node with given id found".into());
        assert!(matches!(gone, FormError::StaleElement(_)));

        let other = classify_click_failure(&element, "websocket closed".into());
        assert_eq!(other.kind(), crate::errors::FailureKind::Other);
    }

    #[test]
    fn test_launch_args_carry_viewport_and_extras() {
        let mut config = BrowserConfig::default();
        config.user_agent = Some("formpilot".into());
        config.args = vec!["--lang=en-SG".into()];

        let args = ChromeLauncher::launch_args(&config);

        assert!(args.contains(&format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        )));
        assert!(args.contains(&"--user-agent=formpilot".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("--lang=en-SG"));
    }

    #[test]
    fn test_handles_resolve_by_attribute() {
        assert_eq!(ref_selector("abc-3"), "[data-formpilot-ref=\"abc-3\"]");
    }
}
