//! A complete simulated grant application wired to a [`Config`]'s selectors:
//! sign-in, manual log-in, grant picker and every form section.
//!
//! Node keys are stable so tests can inspect state, e.g. `"contact-box-0"`,
//! `"eligibility-header"`, `"badge-contact"`.

use super::{MockDom, MockDriver, MockElement};
use crate::core::Config;
use crate::data::MemoryDataSource;
use crate::types::{Credentials, ManualLoginDetails};
use crate::utils::javascript;
use crate::workflow::Stage;

pub const VALID_USER: &str = "qa.applicant@example.com";
pub const VALID_PASSWORD: &str = "Corr3ct-Horse";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";
pub const FIELD_REQUIRED_MESSAGE: &str = "We need a response for this field";
pub const WARNING_MESSAGE: &str =
    "The applicant may not meet the eligibility criteria for this grant";
pub const FAQ_URL: &str = "https://www.gobusiness.gov.sg/business-grants-portal-faq/";
pub const CONFIRMATION_MESSAGE: &str = "Your application has been submitted.";

pub const ELIGIBILITY_QUESTIONS: usize = 4;
pub const CONTACT_FIELDS: usize = 5;
pub const CONTACT_CHECKBOXES: usize = 3;
pub const IMPACT_AMOUNTS: usize = 8;
pub const REVIEW_QUESTIONS: usize = 3;

/// Sections reachable with "next", in order.
const FLOW: [&str; 6] = ["eligibility", "contact", "proposal", "impact", "cost", "review"];

const SECTION_GROUPS: [&str; 10] = [
    "eligibility",
    "contact",
    "proposal",
    "impact",
    "cost",
    "cost-add",
    "cost-editor",
    "review",
    "declaration",
    "confirmation",
];

pub fn valid_credentials() -> Credentials {
    Credentials {
        username: VALID_USER.to_string(),
        password: VALID_PASSWORD.to_string(),
    }
}

pub fn manual_login_details() -> ManualLoginDetails {
    ManualLoginDetails {
        entity_id: "UEN0001".to_string(),
        user_id: "S1234567A".to_string(),
        role: "Acceptor".to_string(),
        full_name: "Tan Ah Kow".to_string(),
    }
}

/// Test data matching the fixture: sign-in rows, the eligibility warning and
/// the manual login settings.
pub fn data_source() -> MemoryDataSource {
    let details = manual_login_details();
    MemoryDataSource::new()
        .with_row("ValidLogin", ["Username", "Password"])
        .with_row("ValidLogin", [VALID_USER, VALID_PASSWORD])
        .with_row("ValidLogin", [WARNING_MESSAGE])
        .with_row("InValidLogin", ["Username", "Password", "Error"])
        .with_row("InValidLogin", ["bad_user", "bad_pw", INVALID_CREDENTIALS_MESSAGE])
        .with_row("InValidLogin", [VALID_USER, "bad_pw", INVALID_CREDENTIALS_MESSAGE])
        .with_config("FAQ_URL", FAQ_URL)
        .with_config("ENTITY_ID", details.entity_id)
        .with_config("USER_ID", details.user_id)
        .with_config("ROLE", details.role)
        .with_config("FULL_NAME", details.full_name)
}

/// Group holding the nodes of `stage`.
pub fn group_for(stage: Stage) -> &'static str {
    match stage {
        Stage::Eligibility => "eligibility",
        Stage::ContactDetails => "contact",
        Stage::Proposal => "proposal",
        Stage::BusinessImpact => "impact",
        Stage::CostItems => "cost",
        Stage::Review => "review",
        Stage::Declaration => "declaration",
        Stage::Confirmation => "confirmation",
    }
}

/// Fresh session sitting on the sign-in page.
pub fn grant_form(config: &Config) -> MockDriver {
    let driver = MockDriver::new();
    add_sign_in(&driver, config);
    add_manual_login(&driver, config);
    add_form_chrome(&driver, config);
    add_eligibility(&driver, config);
    add_contact(&driver, config);
    add_proposal(&driver, config);
    add_impact(&driver, config);
    add_cost(&driver, config);
    add_review(&driver, config);
    add_declaration(&driver, config);
    driver.with_dom(|dom| dom.attach_group("sign-in"));
    driver
}

/// Session already logged in and showing the eligibility section.
pub fn grant_form_at_eligibility(config: &Config) -> MockDriver {
    let driver = grant_form(config);
    let url = eligibility_url(config);
    driver.with_dom(|dom| {
        dom.detach_group("sign-in");
        dom.attach_group("form");
        dom.attach_group("eligibility");
        dom.set_url(&url);
    });
    driver
}

fn eligibility_url(config: &Config) -> String {
    format!(
        "{}{}",
        config.app.app_url.trim_end_matches('/'),
        config.app.eligibility_path
    )
}

fn leave_sections(dom: &mut MockDom) {
    for group in SECTION_GROUPS {
        dom.detach_group(group);
    }
}

fn filled(dom: &MockDom, key: &str) -> bool {
    dom.value(key).map_or(false, |v| !v.is_empty())
}

fn is_complete(dom: &MockDom, section: &str) -> bool {
    match section {
        "eligibility" => (0..ELIGIBILITY_QUESTIONS).all(|i| {
            dom.is_selected(&format!("elig-yes-{i}")) || dom.is_selected(&format!("elig-no-{i}"))
        }),
        "contact" => {
            (0..CONTACT_FIELDS).all(|i| filled(dom, &format!("contact-field-{i}")))
                && (0..CONTACT_CHECKBOXES).any(|i| dom.is_selected(&format!("contact-box-{i}")))
        }
        "proposal" => filled(dom, "proposal-title") && filled(dom, "start-date"),
        "impact" => (0..IMPACT_AMOUNTS).all(|i| filled(dom, &format!("impact-amount-{i}"))),
        _ => true,
    }
}

fn add_sign_in(driver: &MockDriver, config: &Config) {
    let sign_in = &config.selectors.sign_in;
    driver.add(
        MockElement::new("login-error", sign_in.error_message.clone())
            .label()
            .in_group("sign-in"),
    );
    driver.add(MockElement::new("login-button", sign_in.login_button.clone()).in_group("sign-in-success"));

    let expected_user = javascript::set_field_by_id(&sign_in.username_field_id, VALID_USER);
    let expected_password = javascript::set_field_by_id(&sign_in.password_field_id, VALID_PASSWORD);
    let user_fragment = javascript::json_string(&sign_in.username_field_id);
    let password_fragment = javascript::json_string(&sign_in.password_field_id);
    driver.on_script(javascript::click_by_name(&sign_in.submit_button_name), move |dom| {
        let last = |fragment: &str| {
            dom.scripts()
                .iter()
                .rev()
                .find(|s| s.contains("getElementById") && s.contains(fragment))
                .cloned()
        };
        let accepted = last(user_fragment.as_str()).as_deref() == Some(expected_user.as_str())
            && last(password_fragment.as_str()).as_deref() == Some(expected_password.as_str());
        if accepted {
            dom.set_text("login-error", "");
            dom.attach_group("sign-in-success");
        } else {
            dom.set_text("login-error", INVALID_CREDENTIALS_MESSAGE);
        }
    });
    driver.on_click("login-button", |dom| {
        dom.detach_group("sign-in");
        dom.detach_group("sign-in-success");
        dom.attach_group("manual-login");
    });
}

fn add_manual_login(driver: &MockDriver, config: &Config) {
    let manual = &config.selectors.manual_login;
    driver.add(
        MockElement::new("corppass-header", manual.corppass_header.clone())
            .label()
            .text("CorpPass")
            .in_group("manual-login"),
    );
    driver.add(
        MockElement::new("manual-login-header", manual.manual_login_header.clone())
            .label()
            .text("Manual Log In")
            .in_group("manual-login"),
    );
    for (key, locator) in [
        ("entity-id", &manual.entity_id),
        ("user-id", &manual.user_id),
        ("user-role", &manual.user_role),
        ("user-full-name", &manual.user_full_name),
    ] {
        driver.add(MockElement::new(key, locator.clone()).input().in_group("manual-login"));
    }
    driver.add(MockElement::new("manual-login-button", manual.login_button.clone()).in_group("manual-login"));

    let steps = manual.navigation.len();
    driver.on_click("manual-login-button", move |dom| {
        dom.detach_group("manual-login");
        if steps > 0 {
            dom.attach_group("nav-0");
        }
    });

    let url = eligibility_url(config);
    for (i, step) in manual.navigation.iter().enumerate() {
        let group = format!("nav-{i}");
        driver.add(
            MockElement::new(group.clone(), step.locator.clone())
                .text(step.label.clone())
                .in_group(group.clone()),
        );
        let url = url.clone();
        driver.on_click(&group.clone(), move |dom| {
            dom.detach_group(&group);
            if i + 1 < steps {
                dom.attach_group(&format!("nav-{}", i + 1));
            } else {
                dom.attach_group("form");
                dom.attach_group("eligibility");
                dom.set_url(&url);
            }
        });
    }
}

fn add_form_chrome(driver: &MockDriver, config: &Config) {
    let form = &config.selectors.form;
    driver.add(MockElement::new("save", form.save_button.clone()).in_group("form"));
    driver.add(MockElement::new("next", form.next_button.clone()).in_group("form"));
    driver.add(MockElement::new("review", form.review_button.clone()).in_group("form"));
    for section in &FLOW[..5] {
        driver.add(
            MockElement::new(format!("badge-{section}"), config.selectors.errors.error_badge.clone())
                .label()
                .text("Incomplete")
                .detached(),
        );
    }

    driver.on_click("next", |dom| {
        let Some(position) = FLOW.iter().position(|g| dom.is_group_attached(g)) else {
            return;
        };
        let Some(following) = FLOW.get(position + 1) else {
            return;
        };
        let section = FLOW[position];
        let badge = format!("badge-{section}");
        if is_complete(dom, section) {
            dom.detach(&badge);
        } else {
            dom.attach(&badge);
        }
        leave_sections(dom);
        dom.attach_group(following);
    });

    driver.on_click("review", |dom| {
        if !dom.is_group_attached("review") {
            return;
        }
        let outstanding = FLOW[..5]
            .iter()
            .any(|section| dom.is_attached(&format!("badge-{section}")));
        if !outstanding {
            leave_sections(dom);
            dom.attach_group("declaration");
        }
    });

    for entry in &form.side_menu {
        let key = format!("menu-{}", group_for(entry.stage));
        driver.add(MockElement::new(key.clone(), entry.locator.clone()).in_group("form"));
        let target = group_for(entry.stage);
        driver.on_click(&key, move |dom| {
            leave_sections(dom);
            dom.attach_group(target);
        });
    }
}

fn add_eligibility(driver: &MockDriver, config: &Config) {
    let selectors = &config.selectors;
    driver.add(
        MockElement::new("eligibility-header", selectors.markers.eligibility.clone())
            .label()
            .text("Check Your Eligibility")
            .in_group("eligibility"),
    );
    for i in 0..ELIGIBILITY_QUESTIONS {
        driver.add(MockElement::new(format!("elig-yes-{i}"), selectors.form.yes_radios.clone()).radio().in_group("eligibility"));
        driver.add(MockElement::new(format!("elig-no-{i}"), selectors.form.no_radios.clone()).radio().in_group("eligibility"));
    }
    driver.add(
        MockElement::new("warning", selectors.errors.warning.clone())
            .label()
            .text(WARNING_MESSAGE)
            .hidden()
            .in_group("eligibility"),
    );
    driver.add(
        MockElement::new("faq-link", selectors.errors.faq_link.clone())
            .text("FAQ")
            .attr("href", FAQ_URL)
            .hidden()
            .in_group("eligibility"),
    );

    for i in 0..ELIGIBILITY_QUESTIONS {
        let yes = format!("elig-yes-{i}");
        let no = format!("elig-no-{i}");
        let (other_no, other_yes) = (no.clone(), yes.clone());
        driver.on_click(&yes, move |dom| {
            dom.set_selected(&other_no, false);
            refresh_warning(dom);
        });
        driver.on_click(&no, move |dom| {
            dom.set_selected(&other_yes, false);
            refresh_warning(dom);
        });
    }
    driver.on_click("faq-link", |dom| {
        dom.open_window(FAQ_URL);
    });
}

fn refresh_warning(dom: &mut MockDom) {
    let any_no = (0..ELIGIBILITY_QUESTIONS).any(|i| dom.is_selected(&format!("elig-no-{i}")));
    dom.set_displayed("warning", any_no);
    dom.set_displayed("faq-link", any_no);
}

fn add_contact(driver: &MockDriver, config: &Config) {
    let selectors = &config.selectors;
    driver.add(
        MockElement::new("contact-header", selectors.markers.contact_details.clone())
            .label()
            .text("Provide Your Contact Details")
            .in_group("contact"),
    );
    for i in 0..CONTACT_FIELDS {
        driver.add(MockElement::new(format!("contact-field-{i}"), selectors.form.text_fields.clone()).input().in_group("contact"));
    }
    for i in 0..CONTACT_CHECKBOXES {
        driver.add(MockElement::new(format!("contact-box-{i}"), selectors.form.checkboxes.clone()).checkbox().in_group("contact"));
    }
    driver.add(
        MockElement::new("contact-error", selectors.errors.field_error.clone())
            .label()
            .text(FIELD_REQUIRED_MESSAGE)
            .hidden()
            .in_group("contact"),
    );
    driver.on_click("save", |dom| {
        if dom.is_group_attached("contact") {
            let any_checked =
                (0..CONTACT_CHECKBOXES).any(|i| dom.is_selected(&format!("contact-box-{i}")));
            dom.set_displayed("contact-error", !any_checked);
        }
    });
    for i in 0..CONTACT_CHECKBOXES {
        driver.on_click(&format!("contact-box-{i}"), |dom| {
            let any_checked =
                (0..CONTACT_CHECKBOXES).any(|i| dom.is_selected(&format!("contact-box-{i}")));
            dom.set_displayed("contact-error", !any_checked);
        });
    }
}

fn add_proposal(driver: &MockDriver, config: &Config) {
    let selectors = &config.selectors;
    let form = &selectors.form;
    driver.add(
        MockElement::new("proposal-header", selectors.markers.proposal.clone())
            .label()
            .text("Submit Your Proposal")
            .in_group("proposal"),
    );
    driver.add(MockElement::new("proposal-title", form.text_fields.clone()).input().in_group("proposal"));
    driver.add(MockElement::new("start-date", form.start_date.clone()).input().in_group("proposal"));
    driver.add(MockElement::new("end-date", form.end_date.clone()).input().in_group("proposal"));
    driver.add(MockElement::new("dropdown-arrow", form.dropdown_arrows.clone()).in_group("proposal"));
    driver.add(MockElement::new("dropdown-option", form.dropdown_option.clone()).text("Singapore").detached());
    for i in 0..2 {
        driver.add(MockElement::new(format!("proposal-yes-{i}"), form.yes_radios.clone()).radio().in_group("proposal"));
        driver.add(MockElement::new(format!("proposal-no-{i}"), form.no_radios.clone()).radio().in_group("proposal"));
        driver.add(MockElement::new(format!("proposal-text-{i}"), form.text_areas.clone()).input().in_group("proposal"));
    }
    driver.add(
        MockElement::new("proposal-text-hidden", form.text_areas.clone())
            .input()
            .hidden()
            .in_group("proposal"),
    );
    driver.on_click("dropdown-arrow", |dom| dom.attach("dropdown-option"));
    driver.on_click("dropdown-option", |dom| dom.detach("dropdown-option"));
}

fn add_impact(driver: &MockDriver, config: &Config) {
    let selectors = &config.selectors;
    let form = &selectors.form;
    driver.add(
        MockElement::new("impact-header", selectors.markers.business_impact.clone())
            .label()
            .text("Explain The Business Impact")
            .in_group("impact"),
    );
    driver.add(MockElement::new("impact-date", form.impact_date.clone()).input().in_group("impact"));
    for i in 0..IMPACT_AMOUNTS {
        driver.add(MockElement::new(format!("impact-amount-{i}"), form.currency_fields.clone()).input().in_group("impact"));
    }
    for i in 0..2 {
        driver.add(MockElement::new(format!("impact-text-{i}"), form.text_areas.clone()).input().in_group("impact"));
    }
}

fn add_cost(driver: &MockDriver, config: &Config) {
    let selectors = &config.selectors;
    let cost = &selectors.cost;
    driver.add(
        MockElement::new("cost-header", selectors.markers.cost_items.clone())
            .label()
            .text("Provide Details of Costs")
            .in_group("cost"),
    );
    driver.add(MockElement::new("cost-category", cost.category.clone()).in_group("cost"));
    driver.add(MockElement::new("cost-add", cost.add_item.clone()).in_group("cost-add"));
    for (key, locator) in [
        ("cost-description", &cost.description),
        ("cost-duration", &cost.duration),
        ("cost-amount", &cost.amount),
    ] {
        driver.add(MockElement::new(key, locator.clone()).input().in_group("cost-editor"));
    }
    driver.on_click("cost-category", |dom| dom.attach_group("cost-add"));
    driver.on_click("cost-add", |dom| dom.attach_group("cost-editor"));
}

fn add_review(driver: &MockDriver, config: &Config) {
    let selectors = &config.selectors;
    let form = &selectors.form;
    driver.add(
        MockElement::new("review-header", selectors.markers.review.clone())
            .label()
            .text("Declare & Review")
            .in_group("review"),
    );
    driver.add(
        MockElement::new("sync-marker", form.sync_marker.clone())
            .label()
            .text("ElementJustToWaitForSync")
            .in_group("review"),
    );
    for i in 0..REVIEW_QUESTIONS {
        driver.add(MockElement::new(format!("review-yes-{i}"), form.yes_radios.clone()).radio().in_group("review"));
        driver.add(MockElement::new(format!("review-no-{i}"), form.no_radios.clone()).radio().in_group("review"));
    }
    for i in 0..2 {
        driver.add(MockElement::new(format!("review-box-{i}"), form.checkboxes.clone()).checkbox().in_group("review"));
    }
}

fn add_declaration(driver: &MockDriver, config: &Config) {
    let selectors = &config.selectors;
    driver.add(
        MockElement::new("declaration-checkbox", selectors.form.declaration_checkbox.clone())
            .checkbox()
            .in_group("declaration"),
    );
    driver.add(MockElement::new("submit", selectors.form.submit_button.clone()).in_group("declaration"));
    driver.add(
        MockElement::new("confirmation-message", selectors.markers.confirmation.clone())
            .label()
            .text(CONFIRMATION_MESSAGE)
            .in_group("confirmation"),
    );
    driver.on_click("submit", |dom| {
        if dom.is_selected("declaration-checkbox") {
            leave_sections(dom);
            dom.attach_group("confirmation");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_starts_on_sign_in() {
        let config = Config::default();
        let driver = grant_form(&config);
        assert!(driver.is_visible("login-error"));
        assert!(!driver.is_visible("login-button"));
        assert!(!driver.is_visible("eligibility-header"));

        let driver = grant_form_at_eligibility(&config);
        assert!(driver.is_visible("eligibility-header"));
        assert!(driver.is_visible("next"));
        assert!(!driver.is_visible("warning"));
    }
}
