use crate::core::{Config, Locator, SessionDriver};
use crate::errors::Result;
use crate::pages::base::{BasePage, PageObject};
use crate::pages::section::FormSection;
use crate::types::FormData;
use crate::utils::dates;
use crate::workflow::Stage;
use async_trait::async_trait;
use tracing::debug;

pub struct ProposalPage<'s> {
    base: BasePage<'s>,
}

impl PageObject for ProposalPage<'_> {
    fn base(&self) -> &BasePage<'_> {
        &self.base
    }
}

impl<'s> ProposalPage<'s> {
    pub fn new(driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        Ok(Self {
            base: BasePage::new("Proposal", driver, config)?,
        })
    }

    /// Project runs from today to tomorrow.
    pub async fn enter_project_dates(&self) -> Result<()> {
        let form = &self.base.selectors().form;
        let (start, end) = dates::start_and_next_day(dates::today());
        debug!(start = %start, end = %end, "project dates");
        self.enter_date(&form.start_date, &start).await?;
        self.enter_date(&form.end_date, &end).await
    }
}

#[async_trait]
impl FormSection for ProposalPage<'_> {
    fn stage(&self) -> Stage {
        Stage::Proposal
    }

    fn marker(&self) -> &Locator {
        &self.base.selectors().markers.proposal
    }

    async fn fill(&self, data: &FormData) -> Result<()> {
        let form = &self.base.selectors().form;
        self.fill_fields(&form.text_fields, std::slice::from_ref(&data.proposal.title))
            .await?;
        self.enter_project_dates().await?;
        self.select_first_options(&form.dropdown_arrows, &form.dropdown_option)
            .await?;
        self.select_all(&form.yes_radios).await?;
        self.fill_displayed(&form.text_areas, &data.proposal.details)
            .await?;
        Ok(())
    }
}
