use crate::actions::{ActionKind, RetryPolicy};
use crate::browser::wait::{Condition, WaitEngine};
use crate::core::{ElementHandle, Locator, SessionDriver};
use crate::errors::{FailureKind, FormError, Result};
use crate::utils::javascript;
use tracing::{debug, info, warn};

/// Performs clicks and typing with bounded retries.
///
/// Each attempt resolves the element fresh through the wait engine, scrolls it
/// into view and actuates it natively. Intercepted clicks and stale
/// references pause and retry; a "not interactable" failure switches once to
/// a scripted dispatch; anything else aborts. The attempt bound is shared by
/// every branch.
#[derive(Clone)]
pub struct RetryingActuator<'s> {
    wait: WaitEngine<'s>,
    policy: RetryPolicy,
}

impl<'s> RetryingActuator<'s> {
    pub fn new(wait: WaitEngine<'s>, policy: RetryPolicy) -> Self {
        Self { wait, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn driver(&self) -> &'s dyn SessionDriver {
        self.wait.driver()
    }

    pub async fn act_safely(&self, locator: &Locator, action: &ActionKind) -> Result<()> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        while attempt < max_attempts {
            attempt += 1;
            let element = self.wait.until(locator, Condition::Clickable).await?;
            self.scroll_into_view(&element).await;

            let failure = match self.perform_native(&element, action).await {
                Ok(()) => {
                    debug!(locator = %locator, action = %action, attempt, "actuated");
                    return Ok(());
                }
                Err(e) => e,
            };

            match failure.kind() {
                kind if self.policy.is_recoverable(kind) => {
                    warn!(
                        locator = %locator,
                        attempt,
                        max_attempts,
                        error = %failure,
                        "transient actuation failure"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.pause()).await;
                    }
                }
                FailureKind::NotInteractable => {
                    info!(locator = %locator, action = %action, "falling back to scripted dispatch");
                    return self.perform_scripted(locator, action).await;
                }
                _ => return Err(failure),
            }
        }

        Err(FormError::ActionExhausted {
            locator: locator.to_string(),
            attempts: attempt,
        })
    }

    pub async fn click(&self, locator: &Locator) -> Result<()> {
        self.act_safely(locator, &ActionKind::Click).await
    }

    pub async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        self.act_safely(locator, &ActionKind::Type(text.to_string()))
            .await
    }

    /// Best effort; a failed scroll surfaces through the next action instead.
    pub async fn scroll_into_view(&self, element: &ElementHandle) {
        if let Err(e) = self
            .driver()
            .execute_script(javascript::SCROLL_INTO_VIEW_CENTER, Some(element))
            .await
        {
            debug!(locator = %element.locator(), error = %e, "scroll into view failed");
        }
    }

    async fn perform_native(&self, element: &ElementHandle, action: &ActionKind) -> Result<()> {
        match action {
            ActionKind::Click => self.driver().click(element).await,
            ActionKind::Type(text) => self.driver().send_keys(element, text).await,
        }
    }

    async fn perform_scripted(&self, locator: &Locator, action: &ActionKind) -> Result<()> {
        let element = self.wait.until(locator, Condition::Present).await?;
        let script = match action {
            ActionKind::Click => javascript::FORCE_CLICK.to_string(),
            ActionKind::Type(text) => javascript::set_value(text),
        };
        self.driver().execute_script(&script, Some(&element)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDriver, MockElement};
    use std::time::Duration;
    use tokio::time::Instant;

    fn actuator(driver: &MockDriver, attempts: u32) -> RetryingActuator<'_> {
        let wait = WaitEngine::new(driver, Duration::from_secs(2), Duration::from_millis(100)).unwrap();
        RetryingActuator::new(wait, RetryPolicy::new(attempts, Duration::from_secs(1)).unwrap())
    }

    fn save_button(driver: &MockDriver) -> Locator {
        let locator = Locator::id("save-btn").unwrap();
        driver.add(MockElement::new("save", locator.clone()));
        locator
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_click_is_single_attempt() {
        let driver = MockDriver::new();
        let save = save_button(&driver);

        actuator(&driver, 5).click(&save).await.unwrap();

        assert_eq!(driver.native_clicks("save"), 1);
        assert_eq!(driver.scripted_clicks("save"), 0);
        assert!(driver.scripts().iter().any(|s| s == javascript::SCROLL_INTO_VIEW_CENTER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerendered_node_is_resolved_again() {
        let driver = MockDriver::new();
        let save = save_button(&driver);
        let held = driver.find_element(&save).await.unwrap();

        driver.with_dom(|dom| dom.rerender("save"));

        let err = driver.click(&held).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::StaleElement);
        assert_eq!(driver.successful_clicks("save"), 0);

        actuator(&driver, 5).click(&save).await.unwrap();
        assert_eq!(driver.successful_clicks("save"), 1);
        assert_eq!(driver.scripted_clicks("save"), 0);

        let wait = WaitEngine::new(&driver, Duration::from_secs(2), Duration::from_millis(100)).unwrap();
        let fresh = wait.until(&save, Condition::Visible).await.unwrap();
        assert_ne!(fresh.reference(), held.reference());
        assert!(driver.is_displayed(&fresh).await.unwrap());
        assert_eq!(
            driver.is_displayed(&held).await.unwrap_err().kind(),
            FailureKind::StaleElement
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_intercepted_click_retries_after_pause() {
        let driver = MockDriver::new();
        let save = save_button(&driver);
        driver.fail_native("save", [FailureKind::ClickIntercepted, FailureKind::StaleElement]);

        let started = Instant::now();
        actuator(&driver, 5).click(&save).await.unwrap();

        assert_eq!(driver.native_clicks("save"), 3);
        assert_eq!(driver.successful_clicks("save"), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_bounded() {
        for attempts in [1u32, 3, 5] {
            let driver = MockDriver::new();
            let save = save_button(&driver);
            driver.fail_native("save", vec![FailureKind::ClickIntercepted; 10]);

            let err = actuator(&driver, attempts).click(&save).await.unwrap_err();

            assert_eq!(driver.native_clicks("save"), attempts as usize);
            match err {
                FormError::ActionExhausted { locator, attempts: made } => {
                    assert_eq!(locator, "id=save-btn");
                    assert_eq!(made, attempts);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_interactable_falls_back_once() {
        let driver = MockDriver::new();
        let save = save_button(&driver);
        driver.fail_native("save", [FailureKind::NotInteractable]);

        actuator(&driver, 5).click(&save).await.unwrap();

        assert_eq!(driver.native_clicks("save"), 1);
        assert_eq!(driver.scripted_clicks("save"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_interactable_type_sets_value_by_script() {
        let driver = MockDriver::new();
        let field = Locator::id("entityId").unwrap();
        driver.add(MockElement::new("entity", field.clone()).input());
        driver.fail_native("entity", [FailureKind::NotInteractable]);

        actuator(&driver, 5).type_text(&field, "UEN123").await.unwrap();

        assert_eq!(driver.value("entity").as_deref(), Some("UEN123"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unclassified_failure_aborts_immediately() {
        let driver = MockDriver::new();
        let save = save_button(&driver);
        driver.fail_native("save", [FailureKind::Other, FailureKind::Other]);

        let err = actuator(&driver, 5).click(&save).await.unwrap_err();

        assert_eq!(driver.native_clicks("save"), 1);
        assert_eq!(err.kind(), FailureKind::Other);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_element_times_out_without_retry() {
        let driver = MockDriver::new();
        let missing = Locator::id("missing").unwrap();

        let err = actuator(&driver, 5).click(&missing).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Timeout);
    }
}
