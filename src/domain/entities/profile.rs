use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name_surname: String,
    pub age: u32,
    pub email: String,
    pub gender: String,
    #[serde(alias = "martial_status")]
    pub marital_status: String,
    pub number_of_children: u32,
    pub education_level: String,
    pub occupation: String,
    #[serde(alias = "anual_working_hours")]
    pub annual_working_hours: u32,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub debt: f64,
    pub assets: String,
    pub location: String,
    #[serde(default)]
    pub chronic_diseases: Option<String>,
    #[serde(default)]
    pub lifestyle_habits: Option<String>,
    #[serde(default)]
    pub family_health_history: Option<String>,
    pub target_retirement_age: u32,
    pub target_retirement_income: f64,
}

impl UserProfile {
    /// Parses a profile from a model reply.
    pub fn from_reply(reply: &str) -> Option<Self> {
        let body = fenced_json(reply).or_else(|| bare_object(reply))?;
        serde_json::from_str(body).ok()
    }

    pub fn summary(&self) -> String {
        let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "none".to_string());
        [
            format!("Name: {}", self.name_surname),
            format!("Age: {}", self.age),
            format!("Gender: {}", self.gender),
            format!("Marital status: {}", self.marital_status),
            format!("Children: {}", self.number_of_children),
            format!("Education: {}", self.education_level),
            format!(
                "Occupation: {} ({} h/week)",
                self.occupation, self.annual_working_hours
            ),
            format!(
                "Monthly income / expenses: {:.0} / {:.0}",
                self.monthly_income, self.monthly_expenses
            ),
            format!("Debt: {:.0}", self.debt),
            format!("Assets: {}", self.assets),
            format!("Location: {}", self.location),
            format!("Chronic diseases: {}", optional(&self.chronic_diseases)),
            format!("Lifestyle: {}", optional(&self.lifestyle_habits)),
            format!("Family history: {}", optional(&self.family_health_history)),
            format!(
                "Target retirement: age {} with {:.0}/month",
                self.target_retirement_age, self.target_retirement_income
            ),
        ]
        .join("\n")
    }
}

fn fenced_json(reply: &str) -> Option<&str> {
    let start = reply.find("```json")? + "```json".len();
    let end = reply[start..].find("```")? + start;
    Some(reply[start..end].trim())
}

fn bare_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Profile-completion state of a session. `Collecting` only ever moves to
/// `Complete`, on the first reply that parses into a [`UserProfile`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProfileState {
    #[default]
    Collecting,
    Complete { profile: UserProfile },
}

impl ProfileState {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Complete { profile } => Some(profile),
            Self::Collecting => None,
        }
    }

    pub fn advance(&mut self, reply: &str) -> bool {
        if self.is_complete() {
            return false;
        }
        match UserProfile::from_reply(reply) {
            Some(profile) => {
                *self = Self::Complete { profile };
                true
            }
            None => false,
        }
    }
}
