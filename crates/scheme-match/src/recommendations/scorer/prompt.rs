use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use super::super::domain::{CitizenProfile, EligibilityStatus, Scheme};
use super::super::eligibility::age_on;
use super::{AiRecommendation, OracleError};

const NOT_SPECIFIED: &str = "Not specified";

/// Render the oracle prompt. Schemes are enumerated from index 0 and the reply must use
/// those indices.
pub fn build_prompt(profile: &CitizenProfile, schemes: &[Scheme], today: NaiveDate) -> String {
    let age = profile
        .date_of_birth
        .and_then(|dob| age_on(dob, today))
        .map(|age| age.to_string());

    let mut prompt = String::from(
        "As an expert in Indian government welfare schemes, assess how well the citizen \
         below matches each listed scheme.\n\nCitizen profile:\n",
    );

    let _ = writeln!(
        prompt,
        "- Annual income: {}",
        profile
            .annual_income
            .map(|income| format!("₹{income}"))
            .unwrap_or_else(|| NOT_SPECIFIED.to_string())
    );
    let _ = writeln!(
        prompt,
        "- Category: {}",
        profile.category.as_deref().unwrap_or("General")
    );
    let _ = writeln!(prompt, "- State: {}", profile.state);
    let _ = writeln!(
        prompt,
        "- Occupation: {}",
        profile.occupation.as_deref().unwrap_or(NOT_SPECIFIED)
    );
    let _ = writeln!(prompt, "- Age: {}", age.as_deref().unwrap_or(NOT_SPECIFIED));
    let _ = writeln!(
        prompt,
        "- Has disability: {}",
        if profile.has_disability { "Yes" } else { "No" }
    );
    let _ = writeln!(
        prompt,
        "- Family size: {}",
        profile
            .family_size
            .map(|size| size.to_string())
            .unwrap_or_else(|| NOT_SPECIFIED.to_string())
    );
    let _ = writeln!(
        prompt,
        "- Education: {}",
        profile.education.as_deref().unwrap_or(NOT_SPECIFIED)
    );

    prompt.push_str("\nAvailable schemes:\n");
    for (index, scheme) in schemes.iter().enumerate() {
        let _ = writeln!(prompt, "[{index}] {}", scheme.name);
        let _ = writeln!(prompt, "    Category: {}", scheme.category);
        let _ = writeln!(
            prompt,
            "    Max income: {}",
            scheme
                .max_income
                .map(|max| format!("₹{max}"))
                .unwrap_or_else(|| "No limit".to_string())
        );
        let _ = writeln!(
            prompt,
            "    Target categories: {}",
            list_or_any(&scheme.target_categories)
        );
        let _ = writeln!(
            prompt,
            "    Target occupations: {}",
            list_or_any(&scheme.target_occupations)
        );
        let _ = writeln!(
            prompt,
            "    Age range: {} to {}",
            scheme
                .min_age
                .map(|min| min.to_string())
                .unwrap_or_else(|| "no minimum".to_string()),
            scheme
                .max_age
                .map(|max| max.to_string())
                .unwrap_or_else(|| "no maximum".to_string())
        );
        let _ = writeln!(
            prompt,
            "    State: {}",
            scheme.state.as_deref().unwrap_or("All India")
        );
    }

    prompt.push_str(
        "\nFor each scheme give an eligibility assessment (eligible, partially_eligible or \
         not_eligible), a score between 0.0 and 1.0 for how well the citizen matches, and \
         short reasoning in simple language.\n\nRespond with a JSON object only:\n\
         {\"recommendations\": [{\"schemeIndex\": 0, \"score\": 0.85, \
         \"eligibilityStatus\": \"eligible\", \"reasoning\": \"You are eligible because...\"}]}\n",
    );

    prompt
}

fn list_or_any(values: &[String]) -> String {
    if values.is_empty() {
        "Any".to_string()
    } else {
        values.join(", ")
    }
}

/// Validate an oracle reply against the schemes that were sent.
///
/// Fails only when the body is not a JSON object with a `recommendations` array; entries
/// with an unknown index, a non-numeric score or an unknown status are dropped one by one.
pub fn parse_response(
    raw: &str,
    schemes: &[Scheme],
) -> Result<Vec<AiRecommendation>, OracleError> {
    let body = json_object_slice(raw)
        .ok_or_else(|| OracleError::Malformed("no JSON object in response".to_string()))?;
    let value: Value =
        serde_json::from_str(body).map_err(|err| OracleError::Malformed(err.to_string()))?;
    let entries = value
        .get("recommendations")
        .and_then(Value::as_array)
        .ok_or_else(|| OracleError::Malformed("missing recommendations array".to_string()))?;

    let mut seen = HashSet::new();
    let mut recommendations = Vec::with_capacity(entries.len());

    for entry in entries {
        match parse_entry(entry, schemes) {
            Some(recommendation) => {
                if seen.insert(recommendation.scheme_id.clone()) {
                    recommendations.push(recommendation);
                } else {
                    debug!(scheme_id = %recommendation.scheme_id, "dropping duplicate AI entry");
                }
            }
            None => debug!(%entry, "dropping malformed AI entry"),
        }
    }

    Ok(recommendations)
}

fn parse_entry(entry: &Value, schemes: &[Scheme]) -> Option<AiRecommendation> {
    let index = usize::try_from(entry.get("schemeIndex")?.as_u64()?).ok()?;
    let scheme = schemes.get(index)?;
    let score = entry.get("score")?.as_f64()?;
    let eligibility_status = EligibilityStatus::parse(entry.get("eligibilityStatus")?.as_str()?)?;
    let reasoning = entry
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    Some(AiRecommendation {
        scheme_id: scheme.id.clone(),
        score: score.clamp(0.0, 1.0),
        eligibility_status,
        reasoning,
    })
}

/// Models occasionally wrap JSON in prose or code fences.
fn json_object_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}
