use serde::{Deserialize, Serialize};
use std::fmt;

/// One section of the grant form, in the order the form presents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Eligibility,
    ContactDetails,
    Proposal,
    BusinessImpact,
    CostItems,
    Review,
    Declaration,
    Confirmation,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Eligibility,
        Stage::ContactDetails,
        Stage::Proposal,
        Stage::BusinessImpact,
        Stage::CostItems,
        Stage::Review,
        Stage::Declaration,
        Stage::Confirmation,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Stages the form may show after this one's exit action, most likely
    /// first. Business impact branches: the form either opens the cost
    /// section or goes straight to review.
    pub fn successors(self) -> &'static [Stage] {
        match self {
            Stage::Eligibility => &[Stage::ContactDetails],
            Stage::ContactDetails => &[Stage::Proposal],
            Stage::Proposal => &[Stage::BusinessImpact],
            Stage::BusinessImpact => &[Stage::CostItems, Stage::Review],
            Stage::CostItems => &[Stage::Review],
            Stage::Review => &[Stage::Declaration],
            Stage::Declaration => &[Stage::Confirmation],
            Stage::Confirmation => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Confirmation
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Eligibility => "Eligibility",
            Stage::ContactDetails => "Contact Details",
            Stage::Proposal => "Proposal",
            Stage::BusinessImpact => "Business Impact",
            Stage::CostItems => "Cost Items",
            Stage::Review => "Review",
            Stage::Declaration => "Declaration",
            Stage::Confirmation => "Confirmation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
