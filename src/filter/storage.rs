//! Named, pooled saved filters and their JSON form.
//!
//! A filter name is unique within its pool. The JSON layout keeps row order,
//! so a filter reloads exactly as it was edited.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Criteria, FilterExpression, Predicate, Rule};
use crate::entry::EntryStatus;
use crate::error::{CoreResult, ValidationError};
use crate::field_registry::FieldType;
use crate::filter::Operand;

/// Where a saved filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPool {
    /// Stored inside the database file
    #[default]
    Database,
    /// Loaded automatically from the user's settings
    Autoload,
    /// Imported from a filter file
    Imported,
    /// Created in this session only
    Session,
}

/// A named filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFilter {
    pub name: String,
    #[serde(default)]
    pub pool: FilterPool,
    pub expression: FilterExpression,
}

impl StoredFilter {
    pub fn new(name: &str, pool: FilterPool, expression: FilterExpression) -> Self {
        StoredFilter {
            name: name.to_string(),
            pool,
            expression,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyFilterName);
        }
        self.expression.validate()
    }
}

/// Saved filters across all pools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStore {
    #[serde(default)]
    filters: Vec<StoredFilter>,
}

impl FilterStore {
    pub fn new() -> Self {
        FilterStore::default()
    }

    /// Add a filter, replacing one with the same pool and name.
    ///
    /// Returns the replaced filter.
    pub fn insert(
        &mut self,
        filter: StoredFilter,
    ) -> Result<Option<StoredFilter>, ValidationError> {
        filter.validate()?;
        match self.position(filter.pool, &filter.name) {
            Some(i) => Ok(Some(std::mem::replace(&mut self.filters[i], filter))),
            None => {
                self.filters.push(filter);
                Ok(None)
            }
        }
    }

    pub fn get(&self, pool: FilterPool, name: &str) -> Option<&StoredFilter> {
        self.position(pool, name).map(|i| &self.filters[i])
    }

    pub fn remove(&mut self, pool: FilterPool, name: &str) -> Option<StoredFilter> {
        self.position(pool, name).map(|i| self.filters.remove(i))
    }

    /// Filters of one pool, in insertion order.
    pub fn pool(&self, pool: FilterPool) -> impl Iterator<Item = &StoredFilter> {
        self.filters.iter().filter(move |f| f.pool == pool)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    fn position(&self, pool: FilterPool, name: &str) -> Option<usize> {
        self.filters
            .iter()
            .position(|f| f.pool == pool && f.name == name)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate every filter.
    ///
    /// A later filter with the same pool and name replaces the earlier one,
    /// as with [`FilterStore::insert`].
    pub fn from_json(json: &str) -> CoreResult<FilterStore> {
        let parsed: FilterStore = serde_json::from_str(json)?;
        let mut store = FilterStore::new();
        for filter in parsed.filters {
            let name = filter.name.clone();
            match store.insert(filter) {
                Ok(Some(_)) => debug!(name = %name, "duplicate stored filter replaced"),
                Ok(None) => {}
                Err(e) => {
                    debug!(name = %name, error = %e, "rejected stored filter");
                    return Err(e.into());
                }
            }
        }
        Ok(store)
    }
}

/// Filters every front-end offers without the user writing them.
pub mod predefined {
    use super::*;

    /// Passwords that have expired or expire within `days` days.
    pub fn expired_or_expiring(days: i64) -> Result<FilterExpression, ValidationError> {
        FilterExpression::builder()
            .and(Predicate::unary(FieldType::Password, Rule::Expired))
            .or(Predicate::will_expire_within(days))
            .build()
    }

    /// Entries added or modified since the database was last saved.
    pub fn unsaved_changes() -> FilterExpression {
        let status = |value| {
            Predicate::new(
                FieldType::EntryStatus,
                Rule::Is,
                Operand::EntryStatus { value },
            )
        };
        let mut expression = FilterExpression::pass_all();
        *expression.criteria_mut() = Criteria::new()
            .and(status(EntryStatus::Added))
            .or(status(EntryStatus::Modified));
        expression
    }
}
