//! Filter expressions: ordered criteria plus at most one nested criteria
//! list per nested kind (password history, password policy, attachment).

use serde::{Deserialize, Serialize};

use super::{LogicOp, Predicate, Term};
use crate::error::ValidationError;
use crate::field_registry::{FieldType, FilterScope};

/// Ordered criteria joined left to right by their [`LogicOp`]s.
///
/// Rows can be inserted and removed at any position, as a filter editor does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criteria {
    terms: Vec<Term>,
}

impl Criteria {
    pub fn new() -> Self {
        Criteria::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.push(LogicOp::And, predicate);
        self
    }

    pub fn or(mut self, predicate: Predicate) -> Self {
        self.push(LogicOp::Or, predicate);
        self
    }

    pub fn push(&mut self, logic: LogicOp, predicate: Predicate) {
        self.terms.push(Term { logic, predicate });
    }

    /// Insert a row before `index` (or at the end when `index == len`).
    pub fn insert(&mut self, index: usize, logic: LogicOp, predicate: Predicate) {
        let index = index.min(self.terms.len());
        self.terms.insert(index, Term { logic, predicate });
    }

    pub fn remove(&mut self, index: usize) -> Option<Term> {
        if index < self.terms.len() {
            Some(self.terms.remove(index))
        } else {
            None
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn terms_mut(&mut self) -> &mut [Term] {
        &mut self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Active rows, in order.
    pub fn active(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter().filter(|t| t.predicate.active)
    }

    /// Number of rows that are active and complete.
    pub fn effective_count(&self) -> usize {
        self.active().filter(|t| t.predicate.is_complete()).count()
    }

    fn validate(&self, scope: FilterScope) -> Result<(), ValidationError> {
        for term in &self.terms {
            let field = term.predicate.field;
            if field.scope() != scope {
                return Err(ValidationError::FieldOutOfScope { field, scope });
            }
            term.predicate.validate()?;
        }
        Ok(())
    }
}

/// A complete filter: main criteria plus optional nested criteria.
///
/// Build one with [`FilterExpression::builder`]. After editing through
/// [`FilterExpression::criteria_mut`] or [`FilterExpression::set_nested`],
/// call [`FilterExpression::validate`] before evaluating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpression {
    #[serde(default)]
    criteria: Criteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    history: Option<Criteria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    policy: Option<Criteria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attachment: Option<Criteria>,
}

impl FilterExpression {
    pub fn builder() -> FilterBuilder {
        FilterBuilder::default()
    }

    /// A filter that every entry passes.
    pub fn pass_all() -> Self {
        FilterExpression::default()
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn criteria_mut(&mut self) -> &mut Criteria {
        &mut self.criteria
    }

    /// Nested criteria of a kind; `None` for the main scope.
    pub fn nested(&self, scope: FilterScope) -> Option<&Criteria> {
        match scope {
            FilterScope::Main => None,
            FilterScope::History => self.history.as_ref(),
            FilterScope::Policy => self.policy.as_ref(),
            FilterScope::Attachment => self.attachment.as_ref(),
        }
    }

    /// Replace (or clear) the nested criteria of a kind.
    pub fn set_nested(&mut self, scope: FilterScope, criteria: Option<Criteria>) {
        match scope {
            FilterScope::Main => {}
            FilterScope::History => self.history = criteria,
            FilterScope::Policy => self.policy = criteria,
            FilterScope::Attachment => self.attachment = criteria,
        }
    }

    /// Whether any active row is left to evaluate.
    pub fn is_pass_all(&self) -> bool {
        self.criteria.active().next().is_none()
    }

    /// Check every row and the nested-slot constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.criteria.validate(FilterScope::Main)?;

        for (field, scope) in [
            (FieldType::PasswordHistory, FilterScope::History),
            (FieldType::Policy, FilterScope::Policy),
            (FieldType::Attachment, FilterScope::Attachment),
        ] {
            let rows: Vec<&Predicate> = self
                .criteria
                .terms()
                .iter()
                .map(|t| &t.predicate)
                .filter(|p| p.field == field)
                .collect();
            if rows.len() > 1 {
                return Err(ValidationError::DuplicateNestedSlot { scope });
            }

            match (rows.first(), self.nested(scope)) {
                (None, Some(_)) => {
                    return Err(ValidationError::UnreferencedNestedFilter { scope });
                }
                (Some(row), None) if row.active => {
                    return Err(ValidationError::MissingNestedFilter { scope });
                }
                (_, Some(nested)) => {
                    nested.validate(scope)?;
                    if nested.effective_count() == 0 {
                        return Err(ValidationError::EmptyNestedFilter { scope });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Builds and validates a [`FilterExpression`].
///
/// The operator passed with the first row is ignored.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    expression: FilterExpression,
    duplicate: Option<FilterScope>,
}

impl FilterBuilder {
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.expression.criteria.push(LogicOp::And, predicate);
        self
    }

    pub fn or(mut self, predicate: Predicate) -> Self {
        self.expression.criteria.push(LogicOp::Or, predicate);
        self
    }

    pub fn history(self, criteria: Criteria) -> Self {
        self.nested(FilterScope::History, criteria)
    }

    pub fn policy(self, criteria: Criteria) -> Self {
        self.nested(FilterScope::Policy, criteria)
    }

    pub fn attachment(self, criteria: Criteria) -> Self {
        self.nested(FilterScope::Attachment, criteria)
    }

    fn nested(mut self, scope: FilterScope, criteria: Criteria) -> Self {
        if self.expression.nested(scope).is_some() {
            self.duplicate.get_or_insert(scope);
        }
        self.expression.set_nested(scope, Some(criteria));
        self
    }

    pub fn build(self) -> Result<FilterExpression, ValidationError> {
        if let Some(scope) = self.duplicate {
            return Err(ValidationError::DuplicateNestedSlot { scope });
        }
        self.expression.validate()?;
        Ok(self.expression)
    }
}
