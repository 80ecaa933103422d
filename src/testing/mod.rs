//! In-memory session backend for exercising page objects and workflows
//! without a browser.

pub mod form_fixture;

use crate::core::{ElementHandle, Locator, SessionDriver};
use crate::errors::{FailureKind, FormError, Result};
use crate::report::{ReportEntry, Reporter};
use crate::utils::javascript;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

type Hook = Arc<dyn Fn(&mut MockDom) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Static,
    Button,
    Input,
    Checkbox,
    Radio,
}

/// Builder for one simulated node.
#[derive(Debug, Clone)]
pub struct MockElement {
    key: String,
    locator: Locator,
    group: Option<String>,
    kind: ElementKind,
    attached: bool,
    displayed: bool,
    enabled: bool,
    obscured: bool,
    selected: bool,
    text: String,
    text_timeline: Vec<(Duration, String)>,
    value: String,
    attributes: HashMap<String, String>,
    appears_after: Option<Duration>,
    generation: u32,
}

impl MockElement {
    pub fn new(key: impl Into<String>, locator: Locator) -> Self {
        Self {
            key: key.into(),
            locator,
            group: None,
            kind: ElementKind::Button,
            attached: true,
            displayed: true,
            enabled: true,
            obscured: false,
            selected: false,
            text: String::new(),
            text_timeline: Vec::new(),
            value: String::new(),
            attributes: HashMap::new(),
            appears_after: None,
            generation: 0,
        }
    }

    /// Belongs to a section that is attached and detached as a unit. Grouped
    /// nodes start detached.
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self.attached = false;
        self
    }

    pub fn kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn input(self) -> Self {
        self.kind(ElementKind::Input)
    }

    pub fn checkbox(self) -> Self {
        self.kind(ElementKind::Checkbox)
    }

    pub fn radio(self) -> Self {
        self.kind(ElementKind::Radio)
    }

    pub fn label(self) -> Self {
        self.kind(ElementKind::Static)
    }

    pub fn detached(mut self) -> Self {
        self.attached = false;
        self
    }

    pub fn attached(mut self) -> Self {
        self.attached = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn obscured(mut self) -> Self {
        self.obscured = true;
        self
    }

    pub fn checked(mut self) -> Self {
        self.selected = true;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Text switches to `text` once `after` has elapsed since the driver started.
    pub fn text_after(mut self, after: Duration, text: impl Into<String>) -> Self {
        self.text_timeline.push((after, text.into()));
        self.text_timeline.sort_by_key(|(at, _)| *at);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Not in the DOM until `after` has elapsed since the driver started.
    pub fn appears_after(mut self, after: Duration) -> Self {
        self.appears_after = Some(after);
        self
    }
}

struct Window {
    handle: String,
    url: String,
}

/// Mutable state of the simulated page. Click and script hooks receive it.
pub struct MockDom {
    started: Instant,
    nodes: Vec<MockElement>,
    click_hooks: HashMap<String, Vec<Hook>>,
    script_hooks: Vec<(String, Hook)>,
    script_responses: Vec<(String, Value)>,
    native_failures: HashMap<String, VecDeque<FailureKind>>,
    lookup_failure: Option<String>,
    native_clicks: HashMap<String, usize>,
    successful_clicks: HashMap<String, usize>,
    scripted_clicks: HashMap<String, usize>,
    scripts: Vec<String>,
    windows: Vec<Window>,
    current_window: Option<String>,
    next_window: usize,
    quit_calls: usize,
}

impl MockDom {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            nodes: Vec::new(),
            click_hooks: HashMap::new(),
            script_hooks: Vec::new(),
            script_responses: Vec::new(),
            native_failures: HashMap::new(),
            lookup_failure: None,
            native_clicks: HashMap::new(),
            successful_clicks: HashMap::new(),
            scripted_clicks: HashMap::new(),
            scripts: Vec::new(),
            windows: vec![Window {
                handle: "window-0".to_string(),
                url: "about:blank".to_string(),
            }],
            current_window: Some("window-0".to_string()),
            next_window: 1,
            quit_calls: 0,
        }
    }

    fn node(&self, key: &str) -> Option<&MockElement> {
        self.nodes.iter().find(|n| n.key == key)
    }

    fn node_mut(&mut self, key: &str) -> Option<&mut MockElement> {
        self.nodes.iter_mut().find(|n| n.key == key)
    }

    fn update(&mut self, key: &str, f: impl FnOnce(&mut MockElement)) {
        if let Some(node) = self.node_mut(key) {
            f(node);
        }
    }

    fn is_present(&self, node: &MockElement) -> bool {
        node.attached
            && node
                .appears_after
                .map_or(true, |after| self.started.elapsed() >= after)
    }

    fn current_text(&self, node: &MockElement) -> String {
        let elapsed = self.started.elapsed();
        node.text_timeline
            .iter()
            .rev()
            .find(|(at, _)| elapsed >= *at)
            .map(|(_, text)| text.clone())
            .unwrap_or_else(|| node.text.clone())
    }

    fn resolve(&self, element: &ElementHandle) -> Result<&MockElement> {
        let (key, generation) = element
            .reference()
            .rsplit_once('#')
            .ok_or_else(|| FormError::StaleElement(element.reference().to_string()))?;
        match self.node(key) {
            Some(node)
                if self.is_present(node) && generation == node.generation.to_string() =>
            {
                Ok(node)
            }
            _ => Err(FormError::StaleElement(element.locator().to_string())),
        }
    }

    fn apply_click(&mut self, key: &str) {
        self.update(key, |node| match node.kind {
            ElementKind::Checkbox => node.selected = !node.selected,
            ElementKind::Radio => node.selected = true,
            _ => {}
        });
        let hooks = self.click_hooks.get(key).cloned().unwrap_or_default();
        for hook in hooks {
            hook(&mut *self);
        }
    }

    pub fn attach(&mut self, key: &str) {
        self.update(key, |node| node.attached = true);
    }

    pub fn detach(&mut self, key: &str) {
        self.update(key, |node| node.attached = false);
    }

    pub fn attach_group(&mut self, group: &str) {
        for node in self.nodes.iter_mut().filter(|n| n.group.as_deref() == Some(group)) {
            node.attached = true;
        }
    }

    pub fn detach_group(&mut self, group: &str) {
        for node in self.nodes.iter_mut().filter(|n| n.group.as_deref() == Some(group)) {
            node.attached = false;
        }
    }

    pub fn is_group_attached(&self, group: &str) -> bool {
        self.nodes
            .iter()
            .any(|n| n.group.as_deref() == Some(group) && n.attached)
    }

    pub fn group_keys(&self, group: &str) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.group.as_deref() == Some(group))
            .map(|n| n.key.clone())
            .collect()
    }

    pub fn is_attached(&self, key: &str) -> bool {
        self.node(key).map_or(false, |n| self.is_present(n))
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.node(key)
            .map_or(false, |n| self.is_present(n) && n.displayed)
    }

    pub fn set_displayed(&mut self, key: &str, displayed: bool) {
        self.update(key, |node| node.displayed = displayed);
    }

    pub fn set_enabled(&mut self, key: &str, enabled: bool) {
        self.update(key, |node| node.enabled = enabled);
    }

    pub fn set_obscured(&mut self, key: &str, obscured: bool) {
        self.update(key, |node| node.obscured = obscured);
    }

    pub fn set_selected(&mut self, key: &str, selected: bool) {
        self.update(key, |node| node.selected = selected);
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.node(key).map_or(false, |n| n.selected)
    }

    pub fn set_text(&mut self, key: &str, text: &str) {
        self.update(key, |node| {
            node.text = text.to_string();
            node.text_timeline.clear();
        });
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.node(key).map(|n| n.value.clone())
    }

    /// Re-renders a node: handles resolved before this call go stale.
    pub fn rerender(&mut self, key: &str) {
        self.update(key, |node| node.generation += 1);
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    pub fn set_url(&mut self, url: &str) {
        let current = self.current_window.clone();
        if let Some(window) = self
            .windows
            .iter_mut()
            .find(|w| Some(&w.handle) == current.as_ref())
        {
            window.url = url.to_string();
        }
    }

    /// Opens a new window at `url` without switching to it.
    pub fn open_window(&mut self, url: &str) -> String {
        let handle = format!("window-{}", self.next_window);
        self.next_window += 1;
        self.windows.push(Window {
            handle: handle.clone(),
            url: url.to_string(),
        });
        handle
    }

    fn current(&self) -> Result<&Window> {
        let handle = self
            .current_window
            .as_ref()
            .ok_or_else(|| FormError::WindowError("no current window".to_string()))?;
        self.windows
            .iter()
            .find(|w| &w.handle == handle)
            .ok_or_else(|| FormError::WindowError(format!("window {} closed", handle)))
    }

    fn take_failure(&mut self, key: &str) -> Option<FormError> {
        let kind = self.native_failures.get_mut(key)?.pop_front()?;
        let what = key.to_string();
        Some(match kind {
            FailureKind::ClickIntercepted => FormError::ClickIntercepted(what),
            FailureKind::StaleElement => FormError::StaleElement(what),
            FailureKind::NotInteractable => FormError::NotInteractable(what),
            FailureKind::NotFound => FormError::ElementNotFound(what),
            FailureKind::Timeout => FormError::Timeout {
                description: what,
                waited_ms: 0,
            },
            FailureKind::Exhausted => FormError::ActionExhausted {
                locator: what,
                attempts: 0,
            },
            FailureKind::Other => FormError::JavaScriptFailed(format!("injected failure on {}", what)),
        })
    }

    fn check_lookup(&self) -> Result<()> {
        match &self.lookup_failure {
            Some(message) => Err(FormError::JavaScriptFailed(message.clone())),
            None => Ok(()),
        }
    }

    /// Native actuation gate shared by click and typing.
    fn native_gate(&mut self, element: &ElementHandle) -> Result<String> {
        self.check_lookup()?;
        let key = self.resolve(element)?.key.clone();
        if let Some(failure) = self.take_failure(&key) {
            return Err(failure);
        }
        let node = self.resolve(element)?;
        if !node.displayed {
            return Err(FormError::NotInteractable(element.locator().to_string()));
        }
        if node.obscured {
            return Err(FormError::ClickIntercepted(element.locator().to_string()));
        }
        Ok(key)
    }
}

/// Scripted [`SessionDriver`] over a [`MockDom`]. Clones share state, so a
/// test can keep a handle while the workflow owns another.
#[derive(Clone)]
pub struct MockDriver {
    dom: Arc<Mutex<MockDom>>,
}

impl MockDriver {
    pub const SCREENSHOT_BYTES: &'static [u8] = b"\x89PNG mock";

    pub fn new() -> Self {
        Self {
            dom: Arc::new(Mutex::new(MockDom::new())),
        }
    }

    pub fn with_dom<R>(&self, f: impl FnOnce(&mut MockDom) -> R) -> R {
        let mut dom = self.dom.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut dom)
    }

    pub fn add(&self, element: MockElement) {
        self.with_dom(|dom| dom.nodes.push(element));
    }

    /// Runs `hook` after every successful click (native or scripted) on `key`.
    pub fn on_click(&self, key: &str, hook: impl Fn(&mut MockDom) + Send + Sync + 'static) {
        self.with_dom(|dom| {
            dom.click_hooks
                .entry(key.to_string())
                .or_default()
                .push(Arc::new(hook))
        });
    }

    pub fn clear_click_hooks(&self, key: &str) {
        self.with_dom(|dom| {
            dom.click_hooks.remove(key);
        });
    }

    /// Runs `hook` whenever an executed script contains `fragment`.
    pub fn on_script(&self, fragment: impl Into<String>, hook: impl Fn(&mut MockDom) + Send + Sync + 'static) {
        let fragment = fragment.into();
        self.with_dom(|dom| dom.script_hooks.push((fragment, Arc::new(hook))));
    }

    /// Value returned by scripts containing `fragment`.
    pub fn respond_to_script(&self, fragment: impl Into<String>, value: Value) {
        let fragment = fragment.into();
        self.with_dom(|dom| dom.script_responses.push((fragment, value)));
    }

    /// Queues failures returned by the next native clicks or key presses on `key`.
    pub fn fail_native(&self, key: &str, kinds: impl IntoIterator<Item = FailureKind>) {
        self.with_dom(|dom| {
            dom.native_failures
                .entry(key.to_string())
                .or_default()
                .extend(kinds)
        });
    }

    /// Every lookup and script fails, as if the session died.
    pub fn fail_lookups_with(&self, message: &str) {
        self.with_dom(|dom| dom.lookup_failure = Some(message.to_string()));
    }

    pub fn native_clicks(&self, key: &str) -> usize {
        self.with_dom(|dom| dom.native_clicks.get(key).copied().unwrap_or(0))
    }

    pub fn successful_clicks(&self, key: &str) -> usize {
        self.with_dom(|dom| dom.successful_clicks.get(key).copied().unwrap_or(0))
    }

    pub fn scripted_clicks(&self, key: &str) -> usize {
        self.with_dom(|dom| dom.scripted_clicks.get(key).copied().unwrap_or(0))
    }

    /// Native plus scripted clicks that reached the node.
    pub fn clicks_landed(&self, key: &str) -> usize {
        self.successful_clicks(key) + self.scripted_clicks(key)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.with_dom(|dom| dom.value(key))
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.with_dom(|dom| dom.is_selected(key))
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.with_dom(|dom| dom.is_visible(key))
    }

    pub fn scripts(&self) -> Vec<String> {
        self.with_dom(|dom| dom.scripts.clone())
    }

    pub fn window_count(&self) -> usize {
        self.with_dom(|dom| dom.windows.len())
    }

    pub fn quit_calls(&self) -> usize {
        self.with_dom(|dom| dom.quit_calls)
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionDriver for MockDriver {
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FormError::ElementNotFound(locator.to_string()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        self.with_dom(|dom| {
            dom.check_lookup()?;
            let matches: Vec<ElementHandle> = dom
                .nodes
                .iter()
                .filter(|n| n.locator.same_query(locator) && dom.is_present(n))
                .enumerate()
                .map(|(i, n)| {
                    ElementHandle::new(format!("{}#{}", n.key, n.generation), locator.nth(i))
                })
                .collect();
            Ok(match locator.index() {
                Some(index) => matches.into_iter().nth(index).into_iter().collect(),
                None => matches,
            })
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.with_dom(|dom| {
            if let Ok(node) = dom.resolve(element) {
                let key = node.key.clone();
                *dom.native_clicks.entry(key).or_default() += 1;
            }
            let key = dom.native_gate(element)?;
            *dom.successful_clicks.entry(key.clone()).or_default() += 1;
            dom.apply_click(&key);
            Ok(())
        })
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.with_dom(|dom| {
            let key = dom.native_gate(element)?;
            dom.update(&key, |node| node.value.push_str(text));
            Ok(())
        })
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        self.with_dom(|dom| Ok(dom.resolve(element)?.displayed))
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        self.with_dom(|dom| Ok(dom.resolve(element)?.enabled))
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        self.with_dom(|dom| Ok(dom.resolve(element)?.selected))
    }

    async fn is_obscured(&self, element: &ElementHandle) -> Result<bool> {
        self.with_dom(|dom| Ok(dom.resolve(element)?.obscured))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        self.with_dom(|dom| {
            let node = dom.resolve(element)?;
            Ok(dom.current_text(node))
        })
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        self.with_dom(|dom| {
            let node = dom.resolve(element)?;
            if name == "value" {
                return Ok(Some(node.value.clone()));
            }
            Ok(node.attributes.get(name).cloned())
        })
    }

    async fn execute_script(&self, script: &str, element: Option<&ElementHandle>) -> Result<Value> {
        self.with_dom(|dom| {
            dom.check_lookup()?;
            dom.scripts.push(script.to_string());

            if let Some(element) = element {
                let key = dom.resolve(element)?.key.clone();
                if script == javascript::FORCE_CLICK {
                    *dom.scripted_clicks.entry(key.clone()).or_default() += 1;
                    dom.apply_click(&key);
                    return Ok(Value::Null);
                }
                if let Some(value) = javascript::parse_set_value(script) {
                    dom.update(&key, |node| node.value = value);
                    return Ok(Value::Null);
                }
            }

            let hooks: Vec<Hook> = dom
                .script_hooks
                .iter()
                .filter(|(fragment, _)| script.contains(fragment.as_str()))
                .map(|(_, hook)| hook.clone())
                .collect();
            for hook in hooks {
                hook(&mut *dom);
            }

            Ok(dom
                .script_responses
                .iter()
                .find(|(fragment, _)| script.contains(fragment.as_str()))
                .map(|(_, value)| value.clone())
                .unwrap_or(Value::Null))
        })
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.with_dom(|dom| {
            dom.current()?;
            dom.set_url(url);
            Ok(())
        })
    }

    async fn current_url(&self) -> Result<String> {
        self.with_dom(|dom| Ok(dom.current()?.url.clone()))
    }

    async fn window_handle(&self) -> Result<String> {
        self.with_dom(|dom| Ok(dom.current()?.handle.clone()))
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        self.with_dom(|dom| Ok(dom.windows.iter().map(|w| w.handle.clone()).collect()))
    }

    async fn switch_window(&self, handle: &str) -> Result<()> {
        self.with_dom(|dom| {
            if !dom.windows.iter().any(|w| w.handle == handle) {
                return Err(FormError::WindowError(format!("no window {}", handle)));
            }
            dom.current_window = Some(handle.to_string());
            Ok(())
        })
    }

    async fn close_window(&self) -> Result<()> {
        self.with_dom(|dom| {
            let handle = dom.current()?.handle.clone();
            dom.windows.retain(|w| w.handle != handle);
            dom.current_window = None;
            Ok(())
        })
    }

    async fn capture_screenshot(&self) -> Result<Vec<u8>> {
        Ok(Self::SCREENSHOT_BYTES.to_vec())
    }

    async fn quit(&self) -> Result<()> {
        self.with_dom(|dom| dom.quit_calls += 1);
        Ok(())
    }
}

/// Reporter that keeps every entry for later assertions.
#[derive(Clone, Default)]
pub struct MemoryReporter {
    entries: Arc<Mutex<Vec<ReportEntry>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, entry: ReportEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.push(ReportEntry::Info(message.to_string()));
    }

    fn pass(&self, message: &str) {
        self.push(ReportEntry::Pass(message.to_string()));
    }

    fn fail(&self, message: &str, attachment: Option<&Path>) {
        self.push(ReportEntry::Fail {
            message: message.to_string(),
            attachment: attachment.map(PathBuf::from),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rerender_makes_handles_stale() {
        let driver = MockDriver::new();
        let locator = Locator::id("next-btn").unwrap();
        driver.add(MockElement::new("next", locator.clone()));

        let handle = driver.find_element(&locator).await.unwrap();
        driver.with_dom(|dom| dom.rerender("next"));

        let err = driver.click(&handle).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::StaleElement);
        let fresh = driver.find_element(&locator).await.unwrap();
        assert!(driver.click(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_script_responses_match_by_fragment() {
        let driver = MockDriver::new();
        driver.respond_to_script("document.title", Value::String("Grant".into()));

        let title = driver.execute_script("return document.title;", None).await.unwrap();
        assert_eq!(title, Value::String("Grant".into()));
        let other = driver.execute_script("return 1;", None).await.unwrap();
        assert_eq!(other, Value::Null);
        assert_eq!(driver.scripts().len(), 2);
    }

    #[tokio::test]
    async fn test_nth_resolves_document_order() {
        let driver = MockDriver::new();
        let boxes = Locator::xpath("//input[@type='checkbox']").unwrap();
        for i in 0..3 {
            driver.add(MockElement::new(format!("box-{i}"), boxes.clone()).checkbox());
        }

        let second = driver.find_element(&boxes.nth(1)).await.unwrap();
        driver.click(&second).await.unwrap();
        assert!(driver.is_selected("box-1"));
        assert!(!driver.is_selected("box-0"));
        assert!(driver.find_elements(&boxes.nth(7)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_windows_open_switch_close() {
        let driver = MockDriver::new();
        let original = driver.window_handle().await.unwrap();
        let opened = driver.with_dom(|dom| dom.open_window("https://faq.test/"));

        driver.switch_window(&opened).await.unwrap();
        assert_eq!(driver.current_url().await.unwrap(), "https://faq.test/");
        driver.close_window().await.unwrap();
        assert!(driver.current_url().await.is_err());

        driver.switch_window(&original).await.unwrap();
        assert_eq!(driver.window_count(), 1);
    }
}
