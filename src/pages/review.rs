use crate::browser::wait::Condition;
use crate::core::{Config, Locator, SessionDriver};
use crate::errors::Result;
use crate::pages::base::{BasePage, PageObject};
use crate::pages::section::FormSection;
use crate::types::{Answer, FormData};
use crate::workflow::Stage;
use async_trait::async_trait;
use tracing::{debug, info};

/// Last editable section; left through the review button instead of "next".
pub struct ReviewPage<'s> {
    base: BasePage<'s>,
}

impl PageObject for ReviewPage<'_> {
    fn base(&self) -> &BasePage<'_> {
        &self.base
    }
}

impl<'s> ReviewPage<'s> {
    pub fn new(driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        Ok(Self {
            base: BasePage::new("Review", driver, config)?,
        })
    }

    pub async fn request_review(&self) -> Result<()> {
        self.click(&self.base.selectors().form.review_button).await
    }
}

#[async_trait]
impl FormSection for ReviewPage<'_> {
    fn stage(&self) -> Stage {
        Stage::Review
    }

    fn marker(&self) -> &Locator {
        &self.base.selectors().markers.review
    }

    async fn fill(&self, data: &FormData) -> Result<()> {
        let form = &self.base.selectors().form;
        let synced = self
            .probe_within(
                &form.sync_marker,
                Condition::Visible,
                self.base.config().waits.sync_timeout(),
            )
            .await?;
        debug!(synced, "review sync marker");

        let radios = match data.review {
            Answer::Yes => &form.yes_radios,
            Answer::No => &form.no_radios,
        };
        self.select_all(radios).await?;
        self.set_all_checkboxes(&form.checkboxes, true).await?;
        Ok(())
    }

    async fn exit(&self) -> Result<()> {
        self.save().await?;
        self.request_review().await
    }
}

/// Declaration of truthfulness and the submit button.
pub struct DeclarationPage<'s> {
    base: BasePage<'s>,
}

impl PageObject for DeclarationPage<'_> {
    fn base(&self) -> &BasePage<'_> {
        &self.base
    }
}

impl<'s> DeclarationPage<'s> {
    pub fn new(driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        Ok(Self {
            base: BasePage::new("Declaration", driver, config)?,
        })
    }

    pub async fn declare(&self) -> Result<()> {
        let checkbox = &self.base.selectors().form.declaration_checkbox;
        let element = self.wait_clickable(checkbox, "Declaration checkbox").await?;
        if !self.base.driver().is_selected(&element).await? {
            self.click(checkbox).await?;
        }
        Ok(())
    }

    pub async fn submit(&self) -> Result<()> {
        let submit = &self.base.selectors().form.submit_button;
        self.wait_clickable(submit, "Submit button").await?;
        self.click(submit).await?;
        info!("application submitted");
        Ok(())
    }
}

#[async_trait]
impl FormSection for DeclarationPage<'_> {
    fn stage(&self) -> Stage {
        Stage::Declaration
    }

    fn marker(&self) -> &Locator {
        &self.base.selectors().markers.declaration
    }

    async fn fill(&self, _data: &FormData) -> Result<()> {
        self.declare().await
    }

    async fn exit(&self) -> Result<()> {
        self.submit().await
    }
}
