use crate::core::{Config, Locator, SessionDriver};
use crate::errors::{FormError, Result};
use crate::pages::base::PageObject;
use crate::pages::{
    BusinessImpactPage, ContactDetailsPage, CostItemsPage, DeclarationPage, EligibilityPage,
    ProposalPage, ReviewPage,
};
use crate::types::FormData;
use crate::workflow::Stage;
use async_trait::async_trait;
use tracing::debug;

/// A stage of the grant form as seen by the workflow: where it renders, how
/// its inputs are filled, and how it is left.
#[async_trait]
pub trait FormSection: PageObject {
    fn stage(&self) -> Stage;

    /// Header or control whose visibility means the section has rendered.
    fn marker(&self) -> &Locator;

    async fn fill(&self, data: &FormData) -> Result<()>;

    /// Saves and moves to the next section.
    async fn exit(&self) -> Result<()> {
        self.save().await?;
        self.next().await
    }

    async fn save(&self) -> Result<()> {
        debug!(stage = %self.stage(), "save");
        self.click(&self.base().selectors().form.save_button).await
    }

    async fn next(&self) -> Result<()> {
        debug!(stage = %self.stage(), "next");
        self.click(&self.base().selectors().form.next_button).await
    }
}

/// Page object for `stage`. The confirmation page has no inputs and no exit,
/// so it is not a section.
pub fn section_for<'s>(
    stage: Stage,
    driver: &'s dyn SessionDriver,
    config: &'s Config,
) -> Result<Box<dyn FormSection + 's>> {
    Ok(match stage {
        Stage::Eligibility => Box::new(EligibilityPage::new(driver, config)?),
        Stage::ContactDetails => Box::new(ContactDetailsPage::new(driver, config)?),
        Stage::Proposal => Box::new(ProposalPage::new(driver, config)?),
        Stage::BusinessImpact => Box::new(BusinessImpactPage::new(driver, config)?),
        Stage::CostItems => Box::new(CostItemsPage::new(driver, config)?),
        Stage::Review => Box::new(ReviewPage::new(driver, config)?),
        Stage::Declaration => Box::new(DeclarationPage::new(driver, config)?),
        Stage::Confirmation => {
            return Err(FormError::InvalidTransition {
                from: stage,
                reason: "the confirmation page has no section to complete".to_string(),
            })
        }
    })
}

/// Locator whose visibility marks `stage` as rendered.
pub fn marker_for(stage: Stage, config: &Config) -> &Locator {
    let markers = &config.selectors.markers;
    match stage {
        Stage::Eligibility => &markers.eligibility,
        Stage::ContactDetails => &markers.contact_details,
        Stage::Proposal => &markers.proposal,
        Stage::BusinessImpact => &markers.business_impact,
        Stage::CostItems => &markers.cost_items,
        Stage::Review => &markers.review,
        Stage::Declaration => &markers.declaration,
        Stage::Confirmation => &markers.confirmation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;

    #[test]
    fn test_every_section_reports_its_stage_and_marker() {
        let config = Config::default();
        let driver = MockDriver::new();
        for stage in Stage::ALL.into_iter().filter(|s| !s.is_terminal()) {
            let section = section_for(stage, &driver, &config).unwrap();
            assert_eq!(section.stage(), stage);
            assert_eq!(section.marker(), marker_for(stage, &config));
        }
        assert!(matches!(
            section_for(Stage::Confirmation, &driver, &config),
            Err(FormError::InvalidTransition { .. })
        ));
    }
}
