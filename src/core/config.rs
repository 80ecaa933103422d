use crate::core::locator::{Locator, Strategy};
use crate::errors::{FormError, Result};
use crate::types::FormData;
use crate::workflow::Stage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub waits: WaitConfig,
    pub retry: RetryConfig,
    pub app: AppConfig,
    pub selectors: Selectors,
    pub form: FormData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub explicit_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub sync_timeout_ms: u64,
    pub login_error_attempts: u32,
    pub login_error_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub pause_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_url: String,
    pub eligibility_path: String,
    pub artifacts_dir: PathBuf,
}

/// Every locator the page objects use. These are configuration data; the
/// defaults match the grant application portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub sign_in: SignInSelectors,
    pub manual_login: ManualLoginSelectors,
    pub form: FormSelectors,
    pub markers: SectionMarkers,
    pub cost: CostSelectors,
    pub errors: ErrorSelectors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignInSelectors {
    pub username_field_id: String,
    pub password_field_id: String,
    pub submit_button_name: String,
    pub login_button: Locator,
    pub error_message: Locator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualLoginSelectors {
    pub manual_login_header: Locator,
    pub corppass_header: Locator,
    pub login_button: Locator,
    pub entity_id: Locator,
    pub user_id: Locator,
    pub user_role: Locator,
    pub user_full_name: Locator,
    /// Labelled clicks from the dashboard to the eligibility form.
    pub navigation: Vec<NavigationStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationStep {
    pub label: String,
    pub locator: Locator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuEntry {
    pub stage: Stage,
    pub locator: Locator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSelectors {
    pub yes_radios: Locator,
    pub no_radios: Locator,
    pub save_button: Locator,
    pub next_button: Locator,
    pub review_button: Locator,
    pub text_fields: Locator,
    pub checkboxes: Locator,
    pub start_date: Locator,
    pub end_date: Locator,
    pub impact_date: Locator,
    pub text_areas: Locator,
    pub dropdown_arrows: Locator,
    pub dropdown_option: Locator,
    pub currency_fields: Locator,
    pub sync_marker: Locator,
    /// Side-menu entries used to jump back to an earlier section from review.
    pub side_menu: Vec<MenuEntry>,
    pub declaration_checkbox: Locator,
    pub submit_button: Locator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionMarkers {
    pub eligibility: Locator,
    pub contact_details: Locator,
    pub proposal: Locator,
    pub business_impact: Locator,
    pub cost_items: Locator,
    pub review: Locator,
    pub declaration: Locator,
    pub confirmation: Locator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostSelectors {
    pub category: Locator,
    pub add_item: Locator,
    pub description: Locator,
    pub duration: Locator,
    pub amount: Locator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorSelectors {
    pub field_error: Locator,
    pub error_badge: Locator,
    pub warning: Locator,
    pub faq_link: Locator,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.app.app_url).map_err(|e| {
            FormError::Configuration(format!("app_url '{}': {}", self.app.app_url, e))
        })?;
        self.waits.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}

impl FormSelectors {
    pub fn menu_item(&self, stage: Stage) -> Option<&Locator> {
        self.side_menu
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| &entry.locator)
    }
}

impl WaitConfig {
    pub fn explicit_timeout(&self) -> Duration {
        Duration::from_millis(self.explicit_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.explicit_timeout_ms == 0 || self.sync_timeout_ms == 0 {
            return Err(FormError::Configuration(
                "wait timeouts must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > self.explicit_timeout_ms {
            return Err(FormError::Configuration(format!(
                "poll interval {}ms must be within (0, {}ms]",
                self.poll_interval_ms, self.explicit_timeout_ms
            )));
        }
        if self.login_error_attempts == 0 {
            return Err(FormError::Configuration(
                "login_error_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(FormError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            args: vec![
                "--disable-extensions".to_string(),
                "--disable-infobars".to_string(),
                "--disable-notifications".to_string(),
            ],
            timeout_ms: 30000,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 900,
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            explicit_timeout_ms: 30000,
            poll_interval_ms: 500,
            sync_timeout_ms: 10000,
            login_error_attempts: 10,
            login_error_interval_ms: 500,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            pause_ms: 1000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_url: "https://bgp-qa.gds-gov.tech".to_string(),
            eligibility_path: "/form/eligibility".to_string(),
            artifacts_dir: PathBuf::from("target"),
        }
    }
}

fn xpath(selector: &'static str) -> Locator {
    Locator::builtin(Strategy::XPath, selector)
}

fn id(selector: &'static str) -> Locator {
    Locator::builtin(Strategy::Id, selector)
}

fn css(selector: &'static str) -> Locator {
    Locator::builtin(Strategy::Css, selector)
}

fn menu(stage: Stage, selector: &'static str) -> MenuEntry {
    MenuEntry {
        stage,
        locator: xpath(selector),
    }
}

impl Default for SignInSelectors {
    fn default() -> Self {
        Self {
            username_field_id: "signInFormUsername".to_string(),
            password_field_id: "signInFormPassword".to_string(),
            submit_button_name: "signInSubmitButton".to_string(),
            login_button: xpath("//div[@id='login-button']"),
            error_message: id("loginErrorMessage"),
        }
    }
}

impl Default for ManualLoginSelectors {
    fn default() -> Self {
        let step = |label: &str, selector: &'static str| NavigationStep {
            label: label.to_string(),
            locator: xpath(selector),
        };
        Self {
            manual_login_header: xpath("//h1[contains(text(),'Manual Log In')]"),
            corppass_header: xpath("//h1[contains(text(),'CorpPass')]"),
            login_button: xpath("//button[contains(text(),'Log In')]"),
            entity_id: id("entityId"),
            user_id: id("userId"),
            user_role: id("userRole"),
            user_full_name: id("userFullName"),
            navigation: vec![
                step("Get New Grant", "//h4[contains(text(),'Get new grant')]"),
                step("IT Button", "//div[contains(text(),'IT')]"),
                step(
                    "Bring My Business",
                    "//div[contains(text(),'Bring my business overseas')]",
                ),
                step(
                    "Market Readiness",
                    "//div[contains(text(),'Market Readiness Assistance')]",
                ),
                step("Apply Button", "//button[contains(text(),'Apply')]"),
                step("Proceed Button", "//button[contains(text(),'Proceed')]"),
            ],
        }
    }
}

impl Default for FormSelectors {
    fn default() -> Self {
        Self {
            yes_radios: xpath("//input[@type='radio' and @value='true']"),
            no_radios: xpath("//input[@type='radio' and @value='false']"),
            save_button: xpath("//button[@id='save-btn']"),
            next_button: xpath("//button[@id='next-btn']"),
            review_button: id("review-btn"),
            text_fields: xpath(
                "//input[(@data-testid='text-field' or @data-testid='number-field') and not(@disabled)]",
            ),
            checkboxes: xpath("//input[@type='checkbox']"),
            start_date: xpath("//input[contains(@id,'react-project-start_date')]"),
            end_date: xpath("//input[contains(@id,'react-project-end_date')]"),
            impact_date: xpath("//input[contains(@id,'react-project_impact-fy_end_date_0')]"),
            text_areas: xpath("//textarea"),
            dropdown_arrows: xpath("//span[@class='Select-arrow']"),
            dropdown_option: css("div.Select-option"),
            currency_fields: xpath("//input[@class='form-control bgp-textfield ']"),
            sync_marker: xpath("//div[text()='ElementJustToWaitForSync']"),
            side_menu: vec![
                menu(
                    Stage::Eligibility,
                    "//span[@class= 'menu-text' and contains(text(), 'Eligibility')]",
                ),
                menu(
                    Stage::ContactDetails,
                    "//span[@class= 'menu-text' and contains(text(), 'Contact Details')]",
                ),
                menu(
                    Stage::Proposal,
                    "//span[@class= 'menu-text' and contains(text(), 'Proposal')]",
                ),
                menu(
                    Stage::BusinessImpact,
                    "//span[@class= 'menu-text' and contains(text(), 'Business Impact')]",
                ),
                menu(
                    Stage::CostItems,
                    "//span[@class= 'menu-text' and contains(text(), 'Cost')]",
                ),
            ],
            declaration_checkbox: xpath(
                "//input[@type='checkbox' and @id='react-declaration-info_truthfulness_check']",
            ),
            submit_button: xpath("//button[@id='submit-btn']"),
        }
    }
}

impl Default for SectionMarkers {
    fn default() -> Self {
        Self {
            eligibility: xpath("//h2[contains(text(),'Check Your Eligibility')]"),
            contact_details: xpath("//h2[contains(text(),'Provide Your Contact Details')]"),
            proposal: xpath("//h2[contains(text(),'Submit Your Proposal')]"),
            business_impact: xpath("//h2[contains(text(),'Explain The Business Impact')]"),
            cost_items: xpath("//h2[contains(text(),'Provide Details of Costs')]"),
            review: xpath("//h2[contains(text(),'Declare & Review')]"),
            declaration: xpath(
                "//input[@type='checkbox' and @id='react-declaration-info_truthfulness_check']",
            ),
            confirmation: xpath(
                "//div[contains(@class,'main summary-page')]//h3[contains(text(),'Your application has been submitted.')]",
            ),
        }
    }
}

impl Default for CostSelectors {
    fn default() -> Self {
        Self {
            category: xpath("//div[text()='Office Space Rental']"),
            add_item: xpath("//button[text()='Add New Item' and contains(@id,'office_rentals')]"),
            description: css("textarea#react-project_cost-office_rentals-0-description"),
            duration: xpath("//input[contains(@id,'rental_duration')]"),
            amount: xpath("//input[contains(@id,'amount_in_billing_currency')]"),
        }
    }
}

impl Default for ErrorSelectors {
    fn default() -> Self {
        Self {
            field_error: xpath("//p[contains(@class,'field-error-message')]"),
            error_badge: xpath("//span[contains(@class,'label-error')]"),
            warning: xpath(
                "//span[contains(text(),'The applicant may not meet the eligibility criteria')]",
            ),
            faq_link: xpath("//a[contains(text(),'FAQ')]"),
        }
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            sign_in: SignInSelectors::default(),
            manual_login: ManualLoginSelectors::default(),
            form: FormSelectors::default(),
            markers: SectionMarkers::default(),
            cost: CostSelectors::default(),
            errors: ErrorSelectors::default(),
        }
    }
}
