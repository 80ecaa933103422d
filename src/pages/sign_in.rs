use crate::browser::wait::Condition;
use crate::core::{Config, Locator, SessionDriver};
use crate::errors::{FailureKind, Result};
use crate::pages::base::{BasePage, PageObject};
use crate::types::Credentials;
use crate::utils::javascript;
use std::time::Duration;
use tracing::{debug, info};

/// Hosted sign-in form. Its inputs are populated by script so the page's own
/// input listeners see the change.
pub struct SignInPage<'s> {
    base: BasePage<'s>,
}

impl PageObject for SignInPage<'_> {
    fn base(&self) -> &BasePage<'_> {
        &self.base
    }
}

impl<'s> SignInPage<'s> {
    pub fn new(driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        Ok(Self {
            base: BasePage::new("Sign In", driver, config)?,
        })
    }

    /// Signs in and continues past the login button shown on success.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        self.submit(credentials).await?;
        let selectors = &self.base.selectors().sign_in;
        self.wait_clickable(&selectors.login_button, "Login button")
            .await?;
        self.click(&selectors.login_button).await?;
        info!(user = %credentials.username, "signed in");
        Ok(())
    }

    /// Submits credentials without expecting them to be accepted.
    pub async fn invalid_login(&self, credentials: &Credentials) -> Result<()> {
        self.submit(credentials).await
    }

    pub async fn is_login_successful(&self) -> Result<bool> {
        self.probe(&self.base.selectors().sign_in.login_button, Condition::Visible)
            .await
    }

    /// Polls the error element a bounded number of times for `expected`,
    /// compared case-insensitively. `false` when it never matches.
    pub async fn verify_error_message(&self, expected: &str) -> Result<bool> {
        let waits = &self.base.config().waits;
        let attempts = waits.login_error_attempts.max(1);
        let interval = Duration::from_millis(waits.login_error_interval_ms);
        let driver = self.base.driver();
        let locator = &self.base.selectors().sign_in.error_message;

        for attempt in 1..=attempts {
            let actual = match Self::read_text(driver, locator).await {
                Ok(text) => text,
                Err(err) if matches!(err.kind(), FailureKind::NotFound | FailureKind::StaleElement) => {
                    String::new()
                }
                Err(err) => return Err(err),
            };
            debug!(attempt, expected, actual = %actual, "login error message");
            if actual.trim().eq_ignore_ascii_case(expected) {
                return Ok(true);
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Ok(false)
    }

    async fn read_text(driver: &dyn SessionDriver, locator: &Locator) -> Result<String> {
        let element = driver.find_element(locator).await?;
        driver.text(&element).await
    }

    async fn submit(&self, credentials: &Credentials) -> Result<()> {
        let selectors = &self.base.selectors().sign_in;
        let driver = self.base.driver();
        driver
            .execute_script(
                &javascript::set_field_by_id(&selectors.username_field_id, &credentials.username),
                None,
            )
            .await?;
        driver
            .execute_script(
                &javascript::set_field_by_id(&selectors.password_field_id, &credentials.password),
                None,
            )
            .await?;
        driver
            .execute_script(&javascript::click_by_name(&selectors.submit_button_name), None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FormError;
    use crate::testing::form_fixture::{self, INVALID_CREDENTIALS_MESSAGE};
    use tokio::time::Instant;

    fn bad_user() -> Credentials {
        Credentials {
            username: "bad_user".to_string(),
            password: "bad_pw".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_login_shows_error_within_window() {
        let config = Config::default();
        let driver = form_fixture::grant_form(&config);
        let page = SignInPage::new(&driver, &config).unwrap();

        page.invalid_login(&bad_user()).await.unwrap();

        assert!(page
            .verify_error_message(&INVALID_CREDENTIALS_MESSAGE.to_uppercase())
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_check_gives_up_after_attempts() {
        let config = Config::default();
        let driver = form_fixture::grant_form(&config);
        let page = SignInPage::new(&driver, &config).unwrap();
        page.invalid_login(&bad_user()).await.unwrap();

        let started = Instant::now();
        assert!(!page.verify_error_message("Account locked").await.unwrap());
        // 10 reads, 9 pauses of 500ms between them
        assert_eq!(started.elapsed(), Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_check_surfaces_session_failure() {
        let config = Config::default();
        let driver = form_fixture::grant_form(&config);
        let page = SignInPage::new(&driver, &config).unwrap();
        page.invalid_login(&bad_user()).await.unwrap();

        driver.fail_lookups_with("session closed");

        let started = Instant::now();
        let err = page
            .verify_error_message(INVALID_CREDENTIALS_MESSAGE)
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::JavaScriptFailed(_)));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_login_reaches_manual_login() {
        let config = Config::default();
        let driver = form_fixture::grant_form(&config);
        let page = SignInPage::new(&driver, &config).unwrap();

        page.login(&form_fixture::valid_credentials()).await.unwrap();

        assert!(driver.is_visible("manual-login-header"));
        let scripts = driver.scripts();
        assert!(scripts
            .iter()
            .any(|s| s.contains("signInFormUsername") && s.contains(form_fixture::VALID_USER)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_button_absent_for_bad_credentials() {
        let mut config = Config::default();
        config.waits.explicit_timeout_ms = 1000;
        let driver = form_fixture::grant_form(&config);
        let page = SignInPage::new(&driver, &config).unwrap();

        page.invalid_login(&bad_user()).await.unwrap();
        assert!(!page.is_login_successful().await.unwrap());
    }
}
