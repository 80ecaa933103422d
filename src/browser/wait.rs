use crate::core::{ElementHandle, Locator, SessionDriver, WaitConfig};
use crate::errors::{FailureKind, FormError, Result};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Predicate a wait polls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Present,
    Visible,
    /// Visible, enabled and not covered by another node.
    Clickable,
    TextEquals(String),
    TextContains(String),
    /// At least one match exists; resolves to every match.
    AnyPresent,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Present => f.write_str("present"),
            Condition::Visible => f.write_str("visible"),
            Condition::Clickable => f.write_str("clickable"),
            Condition::TextEquals(text) => write!(f, "text equal to '{}'", text),
            Condition::TextContains(text) => write!(f, "text containing '{}'", text),
            Condition::AnyPresent => f.write_str("any present"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaitCondition {
    condition: Condition,
    timeout: Duration,
    poll_interval: Duration,
}

impl WaitCondition {
    pub fn new(condition: Condition, timeout: Duration, poll_interval: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(FormError::Configuration(format!(
                "wait for {} needs a timeout greater than zero",
                condition
            )));
        }
        if poll_interval.is_zero() || poll_interval > timeout {
            return Err(FormError::Configuration(format!(
                "poll interval {:?} must be within (0, {:?}]",
                poll_interval, timeout
            )));
        }
        Ok(Self {
            condition,
            timeout,
            poll_interval,
        })
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Explicit-wait primitive: polls the session until a condition holds or the
/// timeout elapses. Never mutates page state.
#[derive(Clone, Copy)]
pub struct WaitEngine<'s> {
    driver: &'s dyn SessionDriver,
    timeout: Duration,
    poll_interval: Duration,
}

impl<'s> WaitEngine<'s> {
    pub fn new(driver: &'s dyn SessionDriver, timeout: Duration, poll_interval: Duration) -> Result<Self> {
        WaitCondition::new(Condition::Present, timeout, poll_interval)?;
        Ok(Self {
            driver,
            timeout,
            poll_interval,
        })
    }

    pub fn from_config(driver: &'s dyn SessionDriver, config: &WaitConfig) -> Result<Self> {
        Self::new(driver, config.explicit_timeout(), config.poll_interval())
    }

    pub fn driver(&self) -> &'s dyn SessionDriver {
        self.driver
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// A condition using this engine's default timeout and poll interval.
    pub fn condition(&self, condition: Condition) -> WaitCondition {
        WaitCondition {
            condition,
            timeout: self.timeout,
            poll_interval: self.poll_interval,
        }
    }

    /// Same condition with a custom timeout; the poll interval shrinks to fit.
    pub fn condition_within(&self, condition: Condition, timeout: Duration) -> Result<WaitCondition> {
        WaitCondition::new(condition, timeout, self.poll_interval.min(timeout))
    }

    pub async fn until(&self, locator: &Locator, condition: Condition) -> Result<ElementHandle> {
        self.until_within(locator, &self.condition(condition)).await
    }

    pub async fn until_within(&self, locator: &Locator, wait: &WaitCondition) -> Result<ElementHandle> {
        let this = self;
        let condition = &wait.condition;
        self.poll(
            format!("{} {}", condition, locator),
            wait.timeout,
            wait.poll_interval,
            move || this.evaluate(locator, condition),
        )
        .await
    }

    /// Resolves every match once at least one satisfies the condition.
    pub async fn until_all(&self, locator: &Locator, wait: &WaitCondition) -> Result<Vec<ElementHandle>> {
        let this = self;
        let condition = &wait.condition;
        self.poll(
            format!("{} {}", condition, locator),
            wait.timeout,
            wait.poll_interval,
            move || this.evaluate_all(locator, condition),
        )
        .await
    }

    /// Boolean form of [`until_within`](Self::until_within): a timeout is `false`.
    pub async fn probe(&self, locator: &Locator, wait: &WaitCondition) -> Result<bool> {
        match self.until_within(locator, wait).await {
            Ok(_) => Ok(true),
            Err(FormError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Core loop: runs `check` until it yields a value, sleeping
    /// `poll_interval` between checks, and fails with `Timeout` once the
    /// deadline has passed. The last check happens at the deadline.
    pub async fn poll<T, F, Fut>(
        &self,
        description: String,
        timeout: Duration,
        poll_interval: Duration,
        mut check: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut polls = 0u32;

        loop {
            polls += 1;
            if let Some(value) = check().await? {
                trace!(wait = %description, polls, "condition met");
                return Ok(value);
            }

            let now = Instant::now();
            if now >= deadline {
                let waited_ms = now.duration_since(started).as_millis() as u64;
                debug!(wait = %description, polls, waited_ms, "wait timed out");
                return Err(FormError::Timeout {
                    description,
                    waited_ms,
                });
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }

    async fn evaluate(&self, locator: &Locator, condition: &Condition) -> Result<Option<ElementHandle>> {
        let element = match self.driver.find_element(locator).await {
            Ok(element) => element,
            Err(e) if not_yet(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        match self.holds(&element, condition).await {
            Ok(true) => Ok(Some(element)),
            Ok(false) => Ok(None),
            Err(e) if not_yet(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn evaluate_all(
        &self,
        locator: &Locator,
        condition: &Condition,
    ) -> Result<Option<Vec<ElementHandle>>> {
        let elements = match self.driver.find_elements(locator).await {
            Ok(elements) => elements,
            Err(e) if not_yet(&e) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut matching = Vec::with_capacity(elements.len());
        for element in elements {
            match self.holds(&element, condition).await {
                Ok(true) => matching.push(element),
                Ok(false) => {}
                Err(e) if not_yet(&e) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(if matching.is_empty() { None } else { Some(matching) })
    }

    async fn holds(&self, element: &ElementHandle, condition: &Condition) -> Result<bool> {
        let driver = self.driver;
        match condition {
            Condition::Present | Condition::AnyPresent => Ok(true),
            Condition::Visible => driver.is_displayed(element).await,
            Condition::Clickable => Ok(driver.is_displayed(element).await?
                && driver.is_enabled(element).await?
                && !driver.is_obscured(element).await?),
            Condition::TextEquals(expected) => Ok(driver.text(element).await?.trim() == expected),
            Condition::TextContains(expected) => Ok(driver.text(element).await?.contains(expected.as_str())),
        }
    }
}

/// Failures that only mean "not rendered yet" while polling.
fn not_yet(error: &FormError) -> bool {
    matches!(error.kind(), FailureKind::NotFound | FailureKind::StaleElement)
}
