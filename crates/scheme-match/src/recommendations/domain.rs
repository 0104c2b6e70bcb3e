use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifier wrapper for citizens owning a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for catalog schemes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemeId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SchemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier assigned by the recommendation store when a row is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecommendationId(pub String);

/// Demographic and socio-economic attributes of a citizen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenProfile {
    pub user_id: UserId,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    pub state: String,
    #[serde(default)]
    pub annual_income: Option<u64>,
    #[serde(default)]
    pub has_disability: bool,
    #[serde(default)]
    pub family_size: Option<u32>,
    #[serde(default)]
    pub education: Option<String>,
}

/// A welfare scheme together with the predicates a citizen must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheme {
    pub id: SchemeId,
    pub name: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub max_income: Option<u64>,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    #[serde(default)]
    pub target_categories: Vec<String>,
    #[serde(default)]
    pub target_occupations: Vec<String>,
    /// `None` means the scheme is available nationwide.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub eligibility_criteria: Option<EligibilityCriteria>,
}

/// Scheme-specific predicates beyond the common income/age/category fields.
///
/// Unknown keys are rejected so every new criterion has to be modelled here;
/// [`EligibilityCriteria::from_legacy`] accepts the older free-form shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EligibilityCriteria {
    #[serde(default)]
    pub farmer_type: Option<String>,
    #[serde(default)]
    pub housing: Option<HousingRequirement>,
}

impl EligibilityCriteria {
    /// Convert a loosely typed key/value bag, ignoring keys that carry no rule.
    pub fn from_legacy(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut criteria = EligibilityCriteria::default();

        for (key, raw) in object {
            match key.as_str() {
                "farmerType" | "farmer_type" => {
                    criteria.farmer_type = raw
                        .as_str()
                        .map(str::to_string)
                        .filter(|value| !value.trim().is_empty());
                }
                "housing" => {
                    criteria.housing = raw.as_str().map(HousingRequirement::from_description);
                }
                other => debug!(key = other, "ignoring legacy eligibility criterion"),
            }
        }

        if criteria.is_empty() {
            None
        } else {
            Some(criteria)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.farmer_type.is_none() && self.housing.is_none()
    }
}

/// Housing condition attached to a scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HousingRequirement {
    /// Applicant must not own a house; verified when the application is filed.
    MustNotOwnHouse,
    /// Informational housing note with no rule attached.
    Other(String),
}

impl HousingRequirement {
    /// Only the lowercase phrase "not own" marks the ownership rule.
    pub fn from_description(description: &str) -> Self {
        if description.contains("not own") {
            HousingRequirement::MustNotOwnHouse
        } else {
            HousingRequirement::Other(description.to_string())
        }
    }
}

/// Eligibility label shared by the rule evaluator, the AI scorer and persisted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    Eligible,
    PartiallyEligible,
    NotEligible,
}

impl EligibilityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EligibilityStatus::Eligible => "eligible",
            EligibilityStatus::PartiallyEligible => "partially_eligible",
            EligibilityStatus::NotEligible => "not_eligible",
        }
    }

    pub const fn priority(self) -> u8 {
        match self {
            EligibilityStatus::Eligible => 3,
            EligibilityStatus::PartiallyEligible => 2,
            EligibilityStatus::NotEligible => 1,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "eligible" => Some(EligibilityStatus::Eligible),
            "partially_eligible" | "partially eligible" => {
                Some(EligibilityStatus::PartiallyEligible)
            }
            "not_eligible" | "not eligible" => Some(EligibilityStatus::NotEligible),
            _ => None,
        }
    }
}

/// Row handed to the recommendation store; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecommendation {
    pub user_id: UserId,
    pub scheme_id: SchemeId,
    pub score: f64,
    pub reasoning: String,
    pub eligibility_status: EligibilityStatus,
}

/// Persisted recommendation owned by the recommendation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: RecommendationId,
    pub user_id: UserId,
    pub scheme_id: SchemeId,
    pub score: f64,
    pub reasoning: String,
    pub eligibility_status: EligibilityStatus,
    pub generated_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn with_scheme(self, scheme: Scheme) -> RecommendationWithScheme {
        RecommendationWithScheme {
            id: self.id,
            user_id: self.user_id,
            scheme,
            score: self.score,
            reasoning: self.reasoning,
            eligibility_status: self.eligibility_status,
            generated_at: self.generated_at,
        }
    }
}

/// Recommendation with its catalog entry re-attached for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationWithScheme {
    pub id: RecommendationId,
    pub user_id: UserId,
    pub scheme: Scheme,
    pub score: f64,
    pub reasoning: String,
    pub eligibility_status: EligibilityStatus,
    pub generated_at: DateTime<Utc>,
}
