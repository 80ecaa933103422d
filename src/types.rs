use serde::{Deserialize, Serialize};

/// Uniform answer applied to every yes/no question of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub job_title: String,
    pub phone: String,
    pub email: String,
    pub alternate_email: String,
}

impl ContactDetails {
    /// Values in the order the contact text fields are rendered.
    pub fn field_values(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.job_title.clone(),
            self.phone.clone(),
            self.email.clone(),
            self.alternate_email.clone(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalDetails {
    pub title: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessImpactDetails {
    pub amounts: Vec<String>,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostItem {
    pub description: String,
    pub duration: String,
    pub amount: String,
}

/// Input values for every section of the grant form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormData {
    pub eligibility: Answer,
    pub contact: ContactDetails,
    pub proposal: ProposalDetails,
    pub impact: BusinessImpactDetails,
    /// When absent the cost section is passed through without adding an item.
    pub cost_item: Option<CostItem>,
    pub review: Answer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualLoginDetails {
    pub entity_id: String,
    pub user_id: String,
    pub role: String,
    pub full_name: String,
}

impl Default for ContactDetails {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            job_title: "title".to_string(),
            phone: "12345678".to_string(),
            email: "abc@gmail.com".to_string(),
            alternate_email: "xyz@gmail.com".to_string(),
        }
    }
}

impl Default for ProposalDetails {
    fn default() -> Self {
        Self {
            title: "Project Title".to_string(),
            details: vec!["details1".to_string(), "details2".to_string()],
        }
    }
}

impl Default for BusinessImpactDetails {
    fn default() -> Self {
        Self {
            amounts: vec!["100".to_string(); 8],
            details: vec!["details1".to_string(), "details2".to_string()],
        }
    }
}

impl Default for CostItem {
    fn default() -> Self {
        Self {
            description: "details1".to_string(),
            duration: "1".to_string(),
            amount: "100".to_string(),
        }
    }
}

impl Default for FormData {
    fn default() -> Self {
        Self {
            eligibility: Answer::Yes,
            contact: ContactDetails::default(),
            proposal: ProposalDetails::default(),
            impact: BusinessImpactDetails::default(),
            cost_item: Some(CostItem::default()),
            review: Answer::No,
        }
    }
}
