use crate::actions::{ActionKind, RetryPolicy, RetryingActuator};
use crate::browser::wait::{Condition, WaitEngine};
use crate::core::{Config, ElementHandle, Locator, Selectors, SessionDriver};
use crate::errors::{FormError, Result};
use crate::utils::javascript;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Session binding shared by every page object: the borrowed driver plus the
/// wait engine and actuator built from the run configuration.
pub struct BasePage<'s> {
    name: &'static str,
    driver: &'s dyn SessionDriver,
    config: &'s Config,
    wait: WaitEngine<'s>,
    actuator: RetryingActuator<'s>,
}

impl<'s> BasePage<'s> {
    pub fn new(name: &'static str, driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        let wait = WaitEngine::from_config(driver, &config.waits)?;
        let policy = RetryPolicy::from_config(&config.retry)?;
        Ok(Self {
            name,
            driver,
            config,
            wait,
            actuator: RetryingActuator::new(wait, policy),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn driver(&self) -> &'s dyn SessionDriver {
        self.driver
    }

    pub fn config(&self) -> &'s Config {
        self.config
    }

    pub fn selectors(&self) -> &'s Selectors {
        &self.config.selectors
    }

    pub fn wait(&self) -> &WaitEngine<'s> {
        &self.wait
    }

    pub fn actuator(&self) -> &RetryingActuator<'s> {
        &self.actuator
    }
}

fn not_ready(label: &str, condition: &'static str, error: FormError) -> FormError {
    match error {
        FormError::Timeout { .. } => FormError::NotReady {
            label: label.to_string(),
            condition,
            source: Box::new(error),
        },
        other => other,
    }
}

/// Uniform interaction surface of a page or form section.
///
/// Every operation resolves its elements at call time; nothing resolved here
/// outlives the call that resolved it.
#[async_trait]
pub trait PageObject: Send + Sync {
    fn base(&self) -> &BasePage<'_>;

    fn name(&self) -> &'static str {
        self.base().name()
    }

    async fn wait_visible(&self, locator: &Locator, label: &str) -> Result<ElementHandle> {
        let element = self
            .base()
            .wait()
            .until(locator, Condition::Visible)
            .await
            .map_err(|e| not_ready(label, "visible", e))?;
        debug!(page = self.name(), label, "visible");
        Ok(element)
    }

    async fn wait_clickable(&self, locator: &Locator, label: &str) -> Result<ElementHandle> {
        let element = self
            .base()
            .wait()
            .until(locator, Condition::Clickable)
            .await
            .map_err(|e| not_ready(label, "clickable", e))?;
        debug!(page = self.name(), label, "clickable");
        Ok(element)
    }

    /// Blocks until the render-complete marker shows, failing after `timeout`.
    async fn wait_for_sync_marker(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let wait = self.base().wait();
        let condition = wait.condition_within(Condition::Visible, timeout)?;
        wait.until_within(locator, &condition)
            .await
            .map_err(|e| not_ready("Sync marker", "visible", e))?;
        debug!(page = self.name(), "sync marker visible");
        Ok(())
    }

    /// Best effort: a locator that never resolves is logged, not raised.
    async fn scroll_into_view(&self, locator: &Locator) {
        let base = self.base();
        let element = match base.wait().until(locator, Condition::Present).await {
            Ok(element) => element,
            Err(e) => {
                debug!(page = self.name(), locator = %locator, error = %e, "nothing to scroll to");
                return;
            }
        };
        if let Err(e) = base
            .driver()
            .execute_script(javascript::SCROLL_INTO_VIEW_NEAREST, Some(&element))
            .await
        {
            debug!(page = self.name(), locator = %locator, error = %e, "scroll into view failed");
        }
    }

    async fn act_safely(&self, locator: &Locator, action: &ActionKind) -> Result<()> {
        self.base().actuator().act_safely(locator, action).await
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.act_safely(locator, &ActionKind::Click).await
    }

    async fn type_into(&self, locator: &Locator, text: &str) -> Result<()> {
        self.act_safely(locator, &ActionKind::Type(text.to_string()))
            .await
    }

    /// Boolean check: `Ok(false)` when the condition never held in time.
    async fn probe(&self, locator: &Locator, condition: Condition) -> Result<bool> {
        let wait = self.base().wait();
        wait.probe(locator, &wait.condition(condition)).await
    }

    async fn probe_within(&self, locator: &Locator, condition: Condition, timeout: Duration) -> Result<bool> {
        let wait = self.base().wait();
        let condition = wait.condition_within(condition, timeout)?;
        wait.probe(locator, &condition).await
    }

    /// Visible text of a control that must be there.
    async fn require_text(&self, locator: &Locator, label: &str) -> Result<String> {
        let element = self.wait_visible(locator, label).await?;
        self.base().driver().text(&element).await
    }

    /// Number of elements currently matching, after waiting for the first.
    async fn count_matches(&self, locator: &Locator) -> Result<usize> {
        let wait = self.base().wait();
        let all = wait
            .until_all(locator, &wait.condition(Condition::AnyPresent))
            .await?;
        Ok(all.len())
    }

    /// Clicks every match in document order. Returns the number clicked.
    async fn select_all(&self, locator: &Locator) -> Result<usize> {
        let count = self.count_matches(locator).await?;
        for index in 0..count {
            self.click(&locator.nth(index)).await?;
        }
        info!(page = self.name(), locator = %locator, count, "selected all");
        Ok(count)
    }

    /// Brings every matching checkbox to `checked`, clicking only those whose
    /// state differs. Returns the number toggled.
    async fn set_all_checkboxes(&self, locator: &Locator, checked: bool) -> Result<usize> {
        let count = self.count_matches(locator).await?;
        let driver = self.base().driver();
        let mut toggled = 0;
        for index in 0..count {
            let target = locator.nth(index);
            let element = self.wait_clickable(&target, "checkbox").await?;
            if driver.is_selected(&element).await? != checked {
                self.click(&target).await?;
                toggled += 1;
            }
        }
        info!(page = self.name(), locator = %locator, checked, toggled, "checkboxes set");
        Ok(toggled)
    }

    /// Types the i-th value into the i-th match. A missing match is an error.
    async fn fill_fields(&self, locator: &Locator, values: &[String]) -> Result<()> {
        for (index, value) in values.iter().enumerate() {
            let target = locator.nth(index);
            self.wait_visible(&target, &format!("{} #{}", locator, index + 1))
                .await?;
            self.type_into(&target, value).await?;
        }
        Ok(())
    }

    /// Like [`fill_fields`](Self::fill_fields) but skips matches that are not
    /// displayed; their values are dropped, not shifted. More values than
    /// matches is an error. Returns the number filled.
    async fn fill_displayed(&self, locator: &Locator, values: &[String]) -> Result<usize> {
        let available = self.count_matches(locator).await?;
        if values.len() > available {
            return Err(FormError::ElementNotFound(format!(
                "{} ({} values, {} fields)",
                locator,
                values.len(),
                available
            )));
        }
        let driver = self.base().driver();
        let mut filled = 0;
        for (index, value) in values.iter().enumerate() {
            let target = locator.nth(index);
            let element = driver.find_element(&target).await?;
            if !driver.is_displayed(&element).await? {
                debug!(page = self.name(), locator = %target, "skipping hidden field");
                continue;
            }
            self.type_into(&target, value).await?;
            filled += 1;
        }
        Ok(filled)
    }

    async fn enter_date(&self, locator: &Locator, date: &str) -> Result<()> {
        self.type_into(locator, date).await
    }

    /// Opens each dropdown and picks its first option. Returns the number set.
    async fn select_first_options(&self, arrows: &Locator, option: &Locator) -> Result<usize> {
        let count = self.count_matches(arrows).await?;
        for index in 0..count {
            self.click(&arrows.nth(index)).await?;
            self.click(&option.nth(0)).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;
    use crate::testing::{MockDriver, MockElement};
    use tokio::time::Instant;

    struct Page<'s> {
        base: BasePage<'s>,
    }

    impl PageObject for Page<'_> {
        fn base(&self) -> &BasePage<'_> {
            &self.base
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.waits.explicit_timeout_ms = 2000;
        config.waits.poll_interval_ms = 250;
        config
    }

    fn values(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_visible_names_label_on_timeout() {
        let driver = MockDriver::new();
        let config = config();
        let page = Page {
            base: BasePage::new("test", &driver, &config).unwrap(),
        };
        let header = Locator::xpath("//h1").unwrap();
        driver.add(MockElement::new("h1", header.clone()).hidden());

        let err = page.wait_visible(&header, "CorpPass header").await.unwrap_err();
        assert_eq!(err.to_string(), "CorpPass header not visible after wait");
        assert_eq!(err.kind(), FailureKind::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_all_actuates_every_match() {
        let driver = MockDriver::new();
        let config = config();
        let page = Page {
            base: BasePage::new("test", &driver, &config).unwrap(),
        };
        let radios = config.selectors.form.yes_radios.clone();
        for i in 0..4 {
            driver.add(MockElement::new(format!("yes-{i}"), radios.clone()).radio());
        }
        driver.fail_native("yes-2", [FailureKind::ClickIntercepted]);

        assert_eq!(page.select_all(&radios).await.unwrap(), 4);
        for i in 0..4 {
            assert!(driver.is_selected(&format!("yes-{i}")));
        }
        assert_eq!(driver.native_clicks("yes-2"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_all_checkboxes_only_toggles_differing() {
        let driver = MockDriver::new();
        let config = config();
        let page = Page {
            base: BasePage::new("test", &driver, &config).unwrap(),
        };
        let boxes = config.selectors.form.checkboxes.clone();
        driver.add(MockElement::new("a", boxes.clone()).checkbox().checked());
        driver.add(MockElement::new("b", boxes.clone()).checkbox());
        driver.add(MockElement::new("c", boxes.clone()).checkbox().checked());

        assert_eq!(page.set_all_checkboxes(&boxes, false).await.unwrap(), 2);
        assert!(!driver.is_selected("a") && !driver.is_selected("b") && !driver.is_selected("c"));
        assert_eq!(driver.native_clicks("b"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_displayed_skips_hidden_without_shifting() {
        let driver = MockDriver::new();
        let config = config();
        let page = Page {
            base: BasePage::new("test", &driver, &config).unwrap(),
        };
        let areas = config.selectors.form.text_areas.clone();
        driver.add(MockElement::new("t0", areas.clone()).input());
        driver.add(MockElement::new("t1", areas.clone()).input().hidden());
        driver.add(MockElement::new("t2", areas.clone()).input());

        let filled = page
            .fill_displayed(&areas, &values(&["one", "two", "three"]))
            .await
            .unwrap();

        assert_eq!(filled, 2);
        assert_eq!(driver.value("t0").as_deref(), Some("one"));
        assert_eq!(driver.value("t1").as_deref(), Some(""));
        assert_eq!(driver.value("t2").as_deref(), Some("three"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_displayed_rejects_values_without_a_field() {
        let driver = MockDriver::new();
        let config = config();
        let page = Page {
            base: BasePage::new("test", &driver, &config).unwrap(),
        };
        let areas = config.selectors.form.text_areas.clone();
        driver.add(MockElement::new("t0", areas.clone()).input());

        let err = page
            .fill_displayed(&areas, &values(&["details1", "details2"]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::NotFound);
        assert_eq!(driver.value("t0").as_deref(), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_fields_requires_every_target() {
        let driver = MockDriver::new();
        let config = config();
        let page = Page {
            base: BasePage::new("test", &driver, &config).unwrap(),
        };
        let fields = config.selectors.form.text_fields.clone();
        driver.add(MockElement::new("f0", fields.clone()).input());

        let err = page
            .fill_fields(&fields, &values(&["name", "title"]))
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::NotReady { condition: "visible", .. }));
        assert_eq!(driver.value("f0").as_deref(), Some("name"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_marker_uses_its_own_timeout() {
        let driver = MockDriver::new();
        let config = config();
        let page = Page {
            base: BasePage::new("test", &driver, &config).unwrap(),
        };
        let marker = config.selectors.form.sync_marker.clone();

        let started = Instant::now();
        let err = page
            .wait_for_sync_marker(&marker, Duration::from_millis(500))
            .await
            .unwrap_err();
        assert_eq!(started.elapsed(), Duration::from_millis(500));
        assert_eq!(err.to_string(), "Sync marker not visible after wait");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_into_view_is_best_effort() {
        let driver = MockDriver::new();
        let config = config();
        let page = Page {
            base: BasePage::new("test", &driver, &config).unwrap(),
        };
        page.scroll_into_view(&Locator::id("gone").unwrap()).await;
        assert!(driver.scripts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_first_options_opens_each_dropdown() {
        let driver = MockDriver::new();
        let config = config();
        let page = Page {
            base: BasePage::new("test", &driver, &config).unwrap(),
        };
        let form = &config.selectors.form;
        driver.add(MockElement::new("arrow-0", form.dropdown_arrows.clone()));
        driver.add(MockElement::new("arrow-1", form.dropdown_arrows.clone()));
        driver.add(MockElement::new("option", form.dropdown_option.clone()).detached());
        for arrow in ["arrow-0", "arrow-1"] {
            driver.on_click(arrow, |dom| dom.attach("option"));
        }
        driver.on_click("option", |dom| dom.detach("option"));

        let count = page
            .select_first_options(&form.dropdown_arrows, &form.dropdown_option)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(driver.successful_clicks("option"), 2);
    }
}
