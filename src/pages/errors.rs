use crate::browser::wait::Condition;
use crate::core::{Config, Locator, SessionDriver};
use crate::errors::{FailureKind, FormError, Result};
use crate::pages::base::{BasePage, PageObject};
use tracing::{debug, info};

/// Side observation of validation state: field errors, section error badges
/// and the eligibility warning. Never advances the form.
pub struct ErrorPage<'s> {
    base: BasePage<'s>,
}

impl PageObject for ErrorPage<'_> {
    fn base(&self) -> &BasePage<'_> {
        &self.base
    }
}

impl<'s> ErrorPage<'s> {
    pub fn new(driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        Ok(Self {
            base: BasePage::new("Errors", driver, config)?,
        })
    }

    /// Error badges currently rendered, without waiting.
    pub async fn error_count(&self) -> Result<usize> {
        let badges = self
            .base
            .driver()
            .find_elements(&self.base.selectors().errors.error_badge)
            .await?;
        Ok(badges.len())
    }

    pub async fn has_field_error(&self) -> Result<bool> {
        self.probe(&self.base.selectors().errors.field_error, Condition::Visible)
            .await
    }

    pub async fn field_error_text(&self) -> Result<String> {
        self.require_text(&self.base.selectors().errors.field_error, "Field error message")
            .await
    }

    pub async fn is_warning_displayed(&self) -> Result<bool> {
        self.probe(&self.base.selectors().errors.warning, Condition::Visible)
            .await
    }

    pub async fn warning_text(&self) -> Result<String> {
        self.require_text(&self.base.selectors().errors.warning, "Eligibility warning")
            .await
    }

    /// Target of the FAQ link, or `None` when the link is not shown.
    pub async fn faq_link(&self) -> Result<Option<String>> {
        let locator = &self.base.selectors().errors.faq_link;
        if !self.probe(locator, Condition::Visible).await? {
            return Ok(None);
        }
        let element = self.wait_visible(locator, "FAQ link").await?;
        self.base.driver().attribute(&element, "href").await
    }

    /// Follows the FAQ link into the window it opens and returns that
    /// window's URL. The new window is closed and focus restored either way.
    pub async fn open_faq_link(&self) -> Result<String> {
        let driver = self.base.driver();
        let locator = &self.base.selectors().errors.faq_link;
        let original = driver.window_handle().await?;
        let before = driver.window_handles().await?;

        self.wait_clickable(locator, "FAQ link").await?;
        self.click(locator).await?;

        let wait = self.base.wait();
        let before = &before;
        let opened = wait
            .poll(
                "new window after FAQ link".to_string(),
                wait.timeout(),
                self.base.config().waits.poll_interval(),
                move || async move {
                    let handles = driver.window_handles().await?;
                    Ok::<_, FormError>(handles.into_iter().find(|h| !before.contains(h)))
                },
            )
            .await?;

        driver.switch_window(&opened).await?;
        let url = driver.current_url().await;
        let closed = driver.close_window().await;
        driver.switch_window(&original).await?;
        closed?;
        let url = url?;
        info!(url = %url, "FAQ link opened");
        Ok(url)
    }

    /// Texts of every visible validation indicator, read without waiting.
    pub async fn validation_messages(&self) -> Result<Vec<String>> {
        let errors = &self.base.selectors().errors;
        let mut messages = self.visible_texts(&errors.field_error).await?;
        for badge in self.visible_texts(&errors.error_badge).await? {
            messages.push(if badge.is_empty() {
                "section has errors".to_string()
            } else {
                badge
            });
        }
        Ok(messages)
    }

    async fn visible_texts(&self, locator: &Locator) -> Result<Vec<String>> {
        let driver = self.base.driver();
        let mut texts = Vec::new();
        for element in driver.find_elements(locator).await? {
            let read = async {
                if driver.is_displayed(&element).await? {
                    Ok::<_, FormError>(Some(driver.text(&element).await?.trim().to_string()))
                } else {
                    Ok(None)
                }
            };
            match read.await {
                Ok(Some(text)) => texts.push(text),
                Ok(None) => {}
                Err(e) if e.kind() == FailureKind::StaleElement => {
                    debug!(locator = %locator, "indicator went stale while reading");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::form_fixture::{self, FAQ_URL};
    use crate::testing::{MockDriver, MockElement};

    fn quick_config() -> Config {
        let mut config = Config::default();
        config.waits.explicit_timeout_ms = 1000;
        config.waits.poll_interval_ms = 100;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_faq_link_absent_is_none() {
        let config = quick_config();
        let driver = MockDriver::new();
        let page = ErrorPage::new(&driver, &config).unwrap();

        assert_eq!(page.faq_link().await.unwrap(), None);
        assert!(!page.is_warning_displayed().await.unwrap());
        assert_eq!(page.error_count().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_faq_link_returns_to_original_window() {
        let config = quick_config();
        let driver = MockDriver::new();
        let link = config.selectors.errors.faq_link.clone();
        driver.add(MockElement::new("faq", link).attr("href", FAQ_URL));
        driver.on_click("faq", |dom| {
            dom.open_window(FAQ_URL);
        });
        let page = ErrorPage::new(&driver, &config).unwrap();
        let original = driver.window_handle().await.unwrap();

        assert_eq!(page.faq_link().await.unwrap().as_deref(), Some(FAQ_URL));
        assert_eq!(page.open_faq_link().await.unwrap(), FAQ_URL);

        assert_eq!(driver.window_handle().await.unwrap(), original);
        assert_eq!(driver.window_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_that_opens_nothing_times_out() {
        let config = quick_config();
        let driver = MockDriver::new();
        driver.add(MockElement::new("faq", config.selectors.errors.faq_link.clone()));
        let page = ErrorPage::new(&driver, &config).unwrap();

        let err = page.open_faq_link().await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_messages_only_visible() {
        let config = quick_config();
        let driver = MockDriver::new();
        let errors = &config.selectors.errors;
        driver.add(
            MockElement::new("err-0", errors.field_error.clone())
                .text(form_fixture::FIELD_REQUIRED_MESSAGE),
        );
        driver.add(MockElement::new("err-1", errors.field_error.clone()).text("hidden").hidden());
        driver.add(MockElement::new("badge", errors.error_badge.clone()));
        let page = ErrorPage::new(&driver, &config).unwrap();

        let messages = page.validation_messages().await.unwrap();
        assert_eq!(
            messages,
            vec![
                form_fixture::FIELD_REQUIRED_MESSAGE.to_string(),
                "section has errors".to_string()
            ]
        );
        assert_eq!(page.error_count().await.unwrap(), 1);
    }
}
