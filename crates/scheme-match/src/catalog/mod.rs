//! Browsing and importing the scheme catalog.

mod import;

pub use import::{SchemeCatalogImporter, SchemeImportError};

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::recommendations::domain::Scheme;
use crate::recommendations::repository::{RepositoryError, SchemeCatalog};

pub const DEFAULT_POPULAR_LIMIT: usize = 10;

const SAMPLE_CATALOG_CSV: &[u8] = include_bytes!("../../data/schemes.csv");

/// Small central and state scheme catalog bundled for demos and local runs.
pub fn sample_catalog() -> Result<Vec<Scheme>, SchemeImportError> {
    SchemeCatalogImporter::from_reader(SAMPLE_CATALOG_CSV)
}

/// Optional narrowing applied when listing schemes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeFilters {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub max_income: Option<u64>,
    #[serde(default)]
    pub search: Option<String>,
}

/// List schemes matching the filters.
///
/// A non-empty `search` term delegates to the catalog's own search and takes precedence
/// over the other filters.
pub fn filter_schemes<C>(
    catalog: &C,
    filters: &SchemeFilters,
) -> Result<Vec<Scheme>, RepositoryError>
where
    C: SchemeCatalog + ?Sized,
{
    if let Some(query) = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty())
    {
        return catalog.search(query);
    }

    let mut schemes = catalog.get_all()?;

    if let Some(category) = filters.category.as_deref() {
        schemes.retain(|scheme| scheme.category.eq_ignore_ascii_case(category));
    }

    if let Some(state) = filters.state.as_deref() {
        schemes.retain(|scheme| scheme.state.as_deref().map_or(true, |s| s == state));
    }

    if let Some(income) = filters.max_income {
        schemes.retain(|scheme| scheme.max_income.map_or(true, |max| max >= income));
    }

    Ok(schemes)
}

/// Distinct scheme categories in sorted order.
pub fn categories<C>(catalog: &C) -> Result<Vec<String>, RepositoryError>
where
    C: SchemeCatalog + ?Sized,
{
    let categories: BTreeSet<String> = catalog
        .get_all()?
        .into_iter()
        .map(|scheme| scheme.category)
        .collect();
    Ok(categories.into_iter().collect())
}

/// Leading catalog entries; catalog order stands in for popularity until application
/// counts are tracked.
pub fn popular<C>(catalog: &C, limit: usize) -> Result<Vec<Scheme>, RepositoryError>
where
    C: SchemeCatalog + ?Sized,
{
    let mut schemes = catalog.get_all()?;
    schemes.truncate(limit);
    Ok(schemes)
}

/// Case-insensitive match on name, description and category.
pub fn matches_query(scheme: &Scheme, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }

    [&scheme.name, &scheme.description, &scheme.category]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}
