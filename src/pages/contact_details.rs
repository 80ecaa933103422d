use crate::core::{Config, Locator, SessionDriver};
use crate::errors::Result;
use crate::pages::base::{BasePage, PageObject};
use crate::pages::section::FormSection;
use crate::types::{ContactDetails, FormData};
use crate::workflow::Stage;
use async_trait::async_trait;

pub struct ContactDetailsPage<'s> {
    base: BasePage<'s>,
}

impl PageObject for ContactDetailsPage<'_> {
    fn base(&self) -> &BasePage<'_> {
        &self.base
    }
}

impl<'s> ContactDetailsPage<'s> {
    pub fn new(driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        Ok(Self {
            base: BasePage::new("Contact Details", driver, config)?,
        })
    }

    pub async fn enter_details(&self, contact: &ContactDetails) -> Result<()> {
        self.fill_fields(&self.base.selectors().form.text_fields, &contact.field_values())
            .await
    }

    pub async fn check_all(&self) -> Result<usize> {
        self.set_all_checkboxes(&self.base.selectors().form.checkboxes, true)
            .await
    }

    pub async fn uncheck_all(&self) -> Result<usize> {
        self.set_all_checkboxes(&self.base.selectors().form.checkboxes, false)
            .await
    }
}

#[async_trait]
impl FormSection for ContactDetailsPage<'_> {
    fn stage(&self) -> Stage {
        Stage::ContactDetails
    }

    fn marker(&self) -> &Locator {
        &self.base.selectors().markers.contact_details
    }

    async fn fill(&self, data: &FormData) -> Result<()> {
        self.enter_details(&data.contact).await?;
        self.check_all().await?;
        Ok(())
    }
}
