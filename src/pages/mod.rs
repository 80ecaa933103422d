pub mod base;
pub mod business_impact;
pub mod contact_details;
pub mod cost_items;
pub mod eligibility;
pub mod errors;
pub mod manual_login;
pub mod proposal;
pub mod review;
pub mod section;
pub mod sign_in;

pub use base::{BasePage, PageObject};
pub use business_impact::BusinessImpactPage;
pub use contact_details::ContactDetailsPage;
pub use cost_items::CostItemsPage;
pub use eligibility::EligibilityPage;
pub use errors::ErrorPage;
pub use manual_login::ManualLoginPage;
pub use proposal::ProposalPage;
pub use review::{DeclarationPage, ReviewPage};
pub use section::{marker_for, section_for, FormSection};
pub use sign_in::SignInPage;
