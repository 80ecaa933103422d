use crate::core::{Config, Locator, SessionDriver};
use crate::errors::Result;
use crate::pages::base::{BasePage, PageObject};
use crate::pages::section::FormSection;
use crate::types::FormData;
use crate::utils::dates;
use crate::workflow::Stage;
use async_trait::async_trait;

pub struct BusinessImpactPage<'s> {
    base: BasePage<'s>,
}

impl PageObject for BusinessImpactPage<'_> {
    fn base(&self) -> &BasePage<'_> {
        &self.base
    }
}

impl<'s> BusinessImpactPage<'s> {
    pub fn new(driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        Ok(Self {
            base: BasePage::new("Business Impact", driver, config)?,
        })
    }
}

#[async_trait]
impl FormSection for BusinessImpactPage<'_> {
    fn stage(&self) -> Stage {
        Stage::BusinessImpact
    }

    fn marker(&self) -> &Locator {
        &self.base.selectors().markers.business_impact
    }

    async fn fill(&self, data: &FormData) -> Result<()> {
        let form = &self.base.selectors().form;
        let financial_year_end = dates::format_form_date(dates::today());
        self.enter_date(&form.impact_date, &financial_year_end)
            .await?;
        self.fill_fields(&form.currency_fields, &data.impact.amounts)
            .await?;
        self.fill_displayed(&form.text_areas, &data.impact.details)
            .await?;
        Ok(())
    }
}
