use crate::core::{Config, Locator, SessionDriver};
use crate::errors::Result;
use crate::pages::base::{BasePage, PageObject};
use crate::pages::section::FormSection;
use crate::types::{Answer, FormData};
use crate::workflow::Stage;
use async_trait::async_trait;
use tracing::info;

pub struct EligibilityPage<'s> {
    base: BasePage<'s>,
}

impl PageObject for EligibilityPage<'_> {
    fn base(&self) -> &BasePage<'_> {
        &self.base
    }
}

impl<'s> EligibilityPage<'s> {
    pub fn new(driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        Ok(Self {
            base: BasePage::new("Eligibility", driver, config)?,
        })
    }

    /// Gives the same answer to every eligibility question.
    pub async fn answer_all(&self, answer: Answer) -> Result<usize> {
        let form = &self.base.selectors().form;
        let radios = match answer {
            Answer::Yes => &form.yes_radios,
            Answer::No => &form.no_radios,
        };
        let answered = self.select_all(radios).await?;
        info!(?answer, answered, "eligibility answered");
        Ok(answered)
    }
}

#[async_trait]
impl FormSection for EligibilityPage<'_> {
    fn stage(&self) -> Stage {
        Stage::Eligibility
    }

    fn marker(&self) -> &Locator {
        &self.base.selectors().markers.eligibility
    }

    async fn fill(&self, data: &FormData) -> Result<()> {
        self.answer_all(data.eligibility).await?;
        Ok(())
    }
}
