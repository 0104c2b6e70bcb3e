use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::recommendations::domain::{
    EligibilityCriteria, HousingRequirement, Scheme, SchemeId,
};

const LIST_SEPARATOR: char = ';';

#[derive(Debug)]
pub enum SchemeImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, message: String },
    DuplicateId(SchemeId),
}

impl std::fmt::Display for SchemeImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemeImportError::Io(err) => write!(f, "failed to read scheme catalog: {}", err),
            SchemeImportError::Csv(err) => write!(f, "invalid scheme catalog CSV: {}", err),
            SchemeImportError::InvalidRow { line, message } => {
                write!(f, "invalid scheme on line {}: {}", line, message)
            }
            SchemeImportError::DuplicateId(id) => {
                write!(f, "scheme id '{}' appears more than once", id)
            }
        }
    }
}

impl std::error::Error for SchemeImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemeImportError::Io(err) => Some(err),
            SchemeImportError::Csv(err) => Some(err),
            SchemeImportError::InvalidRow { .. } | SchemeImportError::DuplicateId(_) => None,
        }
    }
}

impl From<std::io::Error> for SchemeImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SchemeImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads a scheme catalog from a CSV export.
///
/// Expected header: `id,name,category,description,max_income,min_age,max_age,
/// target_categories,target_occupations,state,farmer_type,housing`. List columns use `;`
/// as separator and empty cells mean "no constraint".
pub struct SchemeCatalogImporter;

impl SchemeCatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Scheme>, SchemeImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Scheme>, SchemeImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut seen = HashSet::new();
        let mut schemes = Vec::new();

        for result in csv_reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |position| position.line());
            let row: SchemeRow = record.deserialize(Some(&headers))?;
            let scheme = row.into_scheme(line)?;
            if !seen.insert(scheme.id.clone()) {
                return Err(SchemeImportError::DuplicateId(scheme.id));
            }
            schemes.push(scheme);
        }

        Ok(schemes)
    }
}

#[derive(Debug, Deserialize)]
struct SchemeRow {
    id: String,
    name: String,
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    max_income: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    min_age: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    max_age: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    target_categories: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    target_occupations: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    state: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    farmer_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    housing: Option<String>,
}

impl SchemeRow {
    fn into_scheme(self, line: u64) -> Result<Scheme, SchemeImportError> {
        if self.id.trim().is_empty() {
            return Err(invalid(line, "id must not be empty"));
        }

        let max_income = number::<u64>(line, "max_income", self.max_income.as_deref())?;
        let min_age = number::<u32>(line, "min_age", self.min_age.as_deref())?;
        let max_age = number::<u32>(line, "max_age", self.max_age.as_deref())?;

        if let (Some(min), Some(max)) = (min_age, max_age) {
            if min > max {
                return Err(invalid(line, &format!("min_age {min} exceeds max_age {max}")));
            }
        }

        let criteria = EligibilityCriteria {
            farmer_type: self.farmer_type,
            housing: self
                .housing
                .as_deref()
                .map(HousingRequirement::from_description),
        };

        Ok(Scheme {
            id: SchemeId(self.id),
            name: self.name,
            category: self.category,
            description: self.description,
            max_income,
            min_age,
            max_age,
            target_categories: split_list(self.target_categories.as_deref()),
            target_occupations: split_list(self.target_occupations.as_deref()),
            state: self.state,
            eligibility_criteria: (!criteria.is_empty()).then_some(criteria),
        })
    }
}

fn number<T: FromStr>(
    line: u64,
    field: &str,
    raw: Option<&str>,
) -> Result<Option<T>, SchemeImportError> {
    raw.map(|value| {
        value
            .replace(',', "")
            .parse::<T>()
            .map_err(|_| invalid(line, &format!("{field} '{value}' is not a whole number")))
    })
    .transpose()
}

fn invalid(line: u64, message: &str) -> SchemeImportError {
    SchemeImportError::InvalidRow {
        line,
        message: message.to_string(),
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
