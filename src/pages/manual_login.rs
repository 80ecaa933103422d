use crate::core::{Config, SessionDriver};
use crate::errors::{FormError, Result};
use crate::pages::base::{BasePage, PageObject};
use crate::types::ManualLoginDetails;
use tracing::info;

/// Corporate manual log-in page reached after sign-in, followed by the grant
/// picker that leads to the eligibility form.
pub struct ManualLoginPage<'s> {
    base: BasePage<'s>,
}

impl PageObject for ManualLoginPage<'_> {
    fn base(&self) -> &BasePage<'_> {
        &self.base
    }
}

impl<'s> ManualLoginPage<'s> {
    pub const CORPPASS_HEADER: &'static str = "CorpPass";
    pub const MANUAL_LOGIN_HEADER: &'static str = "Manual Log In";

    pub fn new(driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        Ok(Self {
            base: BasePage::new("Manual Login", driver, config)?,
        })
    }

    pub async fn verify_headers(&self) -> Result<()> {
        let selectors = &self.base.selectors().manual_login;
        let checks = [
            (&selectors.corppass_header, Self::CORPPASS_HEADER),
            (&selectors.manual_login_header, Self::MANUAL_LOGIN_HEADER),
        ];
        for (locator, expected) in checks {
            let label = format!("{} header", expected);
            let actual = self.require_text(locator, &label).await?;
            if actual.trim() != expected {
                return Err(FormError::Assertion(format!(
                    "{} missing or incorrect: found '{}'",
                    label,
                    actual.trim()
                )));
            }
        }
        Ok(())
    }

    pub async fn fill_login_fields(&self, details: &ManualLoginDetails) -> Result<()> {
        let selectors = &self.base.selectors().manual_login;
        let fields = [
            (&selectors.entity_id, &details.entity_id),
            (&selectors.user_id, &details.user_id),
            (&selectors.user_role, &details.role),
            (&selectors.user_full_name, &details.full_name),
        ];
        for (locator, value) in fields {
            self.type_into(locator, value).await?;
        }
        Ok(())
    }

    /// Logs in and walks the grant picker to the application form.
    pub async fn complete_and_navigate(&self) -> Result<()> {
        let selectors = &self.base.selectors().manual_login;
        self.click(&selectors.login_button).await?;
        for step in &selectors.navigation {
            self.wait_visible(&step.locator, &step.label).await?;
            self.click(&step.locator).await?;
            info!(step = %step.label, "navigation step done");
        }
        Ok(())
    }
}
