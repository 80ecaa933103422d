use crate::core::{Config, Locator, SessionDriver};
use crate::errors::Result;
use crate::pages::base::{BasePage, PageObject};
use crate::pages::section::FormSection;
use crate::types::{CostItem, FormData};
use crate::workflow::Stage;
use async_trait::async_trait;
use tracing::{debug, info};

pub struct CostItemsPage<'s> {
    base: BasePage<'s>,
}

impl PageObject for CostItemsPage<'_> {
    fn base(&self) -> &BasePage<'_> {
        &self.base
    }
}

impl<'s> CostItemsPage<'s> {
    pub fn new(driver: &'s dyn SessionDriver, config: &'s Config) -> Result<Self> {
        Ok(Self {
            base: BasePage::new("Cost Items", driver, config)?,
        })
    }

    /// Opens the item editor under the cost category and fills one item.
    pub async fn add_item(&self, item: &CostItem) -> Result<()> {
        let cost = &self.base.selectors().cost;
        self.click(&cost.category).await?;
        self.click(&cost.add_item).await?;

        let fields = [
            (&cost.description, "Cost item description", &item.description),
            (&cost.duration, "Rental duration", &item.duration),
            (&cost.amount, "Billing amount", &item.amount),
        ];
        for (locator, label, value) in fields {
            self.wait_visible(locator, label).await?;
            self.type_into(locator, value).await?;
        }
        info!(description = %item.description, amount = %item.amount, "cost item added");
        Ok(())
    }
}

#[async_trait]
impl FormSection for CostItemsPage<'_> {
    fn stage(&self) -> Stage {
        Stage::CostItems
    }

    fn marker(&self) -> &Locator {
        &self.base.selectors().markers.cost_items
    }

    async fn fill(&self, data: &FormData) -> Result<()> {
        match &data.cost_item {
            Some(item) => self.add_item(item).await,
            None => {
                debug!("no cost item to add");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDriver, MockElement};

    #[tokio::test(start_paused = true)]
    async fn test_add_item_waits_for_editor() {
        let config = Config::default();
        let driver = MockDriver::new();
        let cost = &config.selectors.cost;
        driver.add(MockElement::new("category", cost.category.clone()));
        driver.add(MockElement::new("add", cost.add_item.clone()).in_group("editor-button"));
        for (key, locator) in [
            ("description", &cost.description),
            ("duration", &cost.duration),
            ("amount", &cost.amount),
        ] {
            driver.add(MockElement::new(key, locator.clone()).input().in_group("editor"));
        }
        driver.on_click("category", |dom| dom.attach_group("editor-button"));
        driver.on_click("add", |dom| dom.attach_group("editor"));

        let page = CostItemsPage::new(&driver, &config).unwrap();
        page.add_item(&CostItem::default()).await.unwrap();

        assert_eq!(driver.value("description").as_deref(), Some("details1"));
        assert_eq!(driver.value("duration").as_deref(), Some("1"));
        assert_eq!(driver.value("amount").as_deref(), Some("100"));
    }
}
