use chrono::NaiveDate;

use super::super::domain::{CitizenProfile, HousingRequirement, Scheme};
use super::age::age_on;
use serde::{Deserialize, Serialize};

const FARMER_OCCUPATION: &str = "Farmer";

/// Constraint families a scheme may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    Income,
    Age,
    Category,
    Occupation,
    State,
    FarmerType,
    Housing,
}

/// Result of one applicable check, kept in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionCheck {
    pub criterion: CriterionKind,
    pub satisfied: bool,
    pub message: String,
}

impl CriterionCheck {
    fn met(criterion: CriterionKind, message: String) -> Self {
        Self {
            criterion,
            satisfied: true,
            message,
        }
    }

    fn missed(criterion: CriterionKind, message: String) -> Self {
        Self {
            criterion,
            satisfied: false,
            message,
        }
    }
}

/// Run every check the scheme declares. Constraints the scheme leaves unset produce no entry.
pub(crate) fn applicable_checks(
    profile: &CitizenProfile,
    scheme: &Scheme,
    today: NaiveDate,
) -> Vec<CriterionCheck> {
    let mut checks = Vec::new();

    if let Some(max_income) = scheme.max_income {
        checks.push(match profile.annual_income {
            Some(income) if income <= max_income => CriterionCheck::met(
                CriterionKind::Income,
                format!("Annual income ₹{income} is within the limit of ₹{max_income}"),
            ),
            _ => CriterionCheck::missed(
                CriterionKind::Income,
                format!("Annual income should be below ₹{max_income}"),
            ),
        });
    }

    if scheme.min_age.is_some() || scheme.max_age.is_some() {
        checks.push(age_check(profile, scheme, today));
    }

    if !scheme.target_categories.is_empty() {
        checks.push(match profile.category.as_deref() {
            Some(category) if scheme.target_categories.iter().any(|c| c == category) => {
                CriterionCheck::met(
                    CriterionKind::Category,
                    format!("Category {category} is eligible"),
                )
            }
            _ => CriterionCheck::missed(
                CriterionKind::Category,
                format!(
                    "Category should be one of: {}",
                    scheme.target_categories.join(", ")
                ),
            ),
        });
    }

    if !scheme.target_occupations.is_empty() {
        checks.push(match profile.occupation.as_deref() {
            Some(occupation) if scheme.target_occupations.iter().any(|o| o == occupation) => {
                CriterionCheck::met(
                    CriterionKind::Occupation,
                    format!("Occupation {occupation} is eligible"),
                )
            }
            _ => CriterionCheck::missed(
                CriterionKind::Occupation,
                format!(
                    "Occupation should be one of: {}",
                    scheme.target_occupations.join(", ")
                ),
            ),
        });
    }

    if let Some(state) = scheme.state.as_deref() {
        checks.push(if profile.state == state {
            CriterionCheck::met(
                CriterionKind::State,
                format!("State {} matches scheme requirement", profile.state),
            )
        } else {
            CriterionCheck::missed(
                CriterionKind::State,
                format!("Scheme is only for residents of {state}"),
            )
        });
    }

    if let Some(criteria) = &scheme.eligibility_criteria {
        if criteria.farmer_type.is_some() {
            checks.push(if profile.occupation.as_deref() == Some(FARMER_OCCUPATION) {
                CriterionCheck::met(
                    CriterionKind::FarmerType,
                    "Occupation as farmer meets the requirement".to_string(),
                )
            } else {
                CriterionCheck::missed(CriterionKind::FarmerType, "Must be a farmer".to_string())
            });
        }

        // Ownership cannot be verified from the profile; credited until the application is filed.
        if criteria.housing == Some(HousingRequirement::MustNotOwnHouse) {
            checks.push(CriterionCheck::met(
                CriterionKind::Housing,
                "Housing eligibility check required (to be verified during application)"
                    .to_string(),
            ));
        }
    }

    checks
}

fn age_check(profile: &CitizenProfile, scheme: &Scheme, today: NaiveDate) -> CriterionCheck {
    let Some(age) = profile
        .date_of_birth
        .and_then(|date_of_birth| age_on(date_of_birth, today))
    else {
        return CriterionCheck::missed(
            CriterionKind::Age,
            "Date of birth required for age verification".to_string(),
        );
    };

    let above_minimum = scheme.min_age.map_or(true, |min| age >= min);
    let below_maximum = scheme.max_age.map_or(true, |max| age <= max);

    if above_minimum && below_maximum {
        CriterionCheck::met(CriterionKind::Age, format!("Age {age} meets the requirement"))
    } else {
        let upper = scheme
            .max_age
            .map(|max| max.to_string())
            .unwrap_or_else(|| "any".to_string());
        CriterionCheck::missed(
            CriterionKind::Age,
            format!(
                "Age should be between {} and {}",
                scheme.min_age.unwrap_or(0),
                upper
            ),
        )
    }
}
