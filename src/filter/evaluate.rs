//! Applies a [`FilterExpression`] to entries.
//!
//! Criteria are folded strictly left to right: `((P0 op1 P1) op2 P2) ...`,
//! with no AND-over-OR precedence. Inactive rows are dropped before folding
//! and an expression without active rows passes every entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::matching::{
    match_bool, match_date, match_date_list, match_expiry, match_integer, match_optional_integer,
    match_text, match_text_list,
};
use super::predicate::{operand_kind, scale_size, OperandKind};
use super::{Criteria, FilterExpression, LogicOp, Operand, Predicate, Rule};
use crate::entry::{data_source, index_by_uuid, Dca, Entry};
use crate::field_registry::{FieldType, FilterScope, MatchType};

fn default_now() -> DateTime<Utc> {
    Utc::now()
}

fn default_dca() -> Dca {
    Dca::CopyPassword
}

fn default_shift_dca() -> Dca {
    Dca::Autotype
}

/// Inputs to evaluation that do not come from the entry itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalContext {
    /// Reference time for relative dates and expiry rules (defaults to now)
    #[serde(default = "default_now")]
    pub now: DateTime<Utc>,
    /// Action used for entries without their own double-click action
    #[serde(default = "default_dca")]
    pub default_dca: Dca,
    /// Action used for entries without their own shift-double-click action
    #[serde(default = "default_shift_dca")]
    pub default_shift_dca: Dca,
}

impl EvalContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        EvalContext {
            now,
            ..Default::default()
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        EvalContext {
            now: default_now(),
            default_dca: default_dca(),
            default_shift_dca: default_shift_dca(),
        }
    }
}

/// Left fold over the active rows of `criteria`.
pub(crate) fn fold_criteria(criteria: &Criteria, mut eval: impl FnMut(&Predicate) -> bool) -> bool {
    let mut active = criteria.active();
    let Some(first) = active.next() else {
        return true;
    };
    let mut result = eval(&first.predicate);
    for term in active {
        result = match term.logic {
            LogicOp::And => result && eval(&term.predicate),
            LogicOp::Or => result || eval(&term.predicate),
        };
    }
    result
}

/// Evaluates one expression against many entries.
///
/// Aliases and shortcuts are resolved through the bases registered with
/// [`FilterEvaluator::with_bases`]; without them they are matched on their
/// own fields.
pub struct FilterEvaluator<'a> {
    expression: &'a FilterExpression,
    context: &'a EvalContext,
    bases: HashMap<Uuid, &'a Entry>,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(expression: &'a FilterExpression, context: &'a EvalContext) -> Self {
        FilterEvaluator {
            expression,
            context,
            bases: HashMap::new(),
        }
    }

    pub fn with_bases(mut self, entries: &'a [Entry]) -> Self {
        self.bases = index_by_uuid(entries);
        self
    }

    /// # Panics
    ///
    /// If a row carries an operand of the wrong kind, which
    /// [`FilterExpression::validate`] rejects.
    pub fn matches(&self, entry: &Entry) -> bool {
        fold_criteria(self.expression.criteria(), |p| self.eval_main(entry, p))
    }

    /// Entry whose data a row on `field` reads.
    fn source<'e>(&'e self, entry: &'e Entry, field: FieldType) -> &'e Entry {
        data_source(entry, field, &self.bases)
    }

    /// Rule of a complete row whose operand fits; `None` for incomplete rows.
    fn checked_rule(predicate: &Predicate) -> Option<Rule> {
        if !predicate.is_complete() {
            return None;
        }
        let rule = predicate.rule?;
        let kind = operand_kind(predicate.field, rule);
        if kind != OperandKind::None && !kind.accepts(&predicate.operand) {
            panic!(
                "operand {:?} does not fit field {}; validate the filter before evaluating",
                predicate.operand, predicate.field
            );
        }
        Some(rule)
    }

    fn eval_main(&self, entry: &Entry, predicate: &Predicate) -> bool {
        let field = predicate.field;
        let entry = self.source(entry, field);

        if let Some(scope) = predicate.match_type().nested_scope() {
            return self.eval_nested(entry, scope);
        }
        let Some(rule) = Self::checked_rule(predicate) else {
            return false;
        };
        let operand = &predicate.operand;
        let now = self.context.now;

        match predicate.match_type() {
            MatchType::String => match_text(&main_text(entry, field), rule, operand),
            MatchType::Password => match rule {
                Rule::Expired | Rule::WillExpire => {
                    match_expiry(entry.expiry(), rule, operand, now)
                }
                _ => match_text(&entry.password, rule, operand),
            },
            MatchType::Integer => match field {
                FieldType::ExpiryInterval => {
                    let days = entry.expiry_interval.filter(|d| *d > 0).map(i64::from);
                    match_optional_integer(days, rule, operand)
                }
                _ => integer_rule(entry.password_len() as i64, rule, operand),
            },
            MatchType::EntrySize => match operand {
                Operand::Size { num1, num2, unit } => match_integer(
                    entry.size() as i64,
                    rule,
                    scale_size(*num1, *unit),
                    num2.map(|n| scale_size(n, *unit)),
                ),
                _ => false,
            },
            MatchType::Date => match_date(main_date(entry, field), rule, operand, now),
            MatchType::Bool => match_bool(main_flag(entry, field), rule),
            MatchType::EntryType => match operand {
                Operand::EntryType { value } => is_rule(rule, entry.entry_type == *value),
                _ => false,
            },
            MatchType::EntryStatus => match operand {
                Operand::EntryStatus { value } => is_rule(rule, entry.status == *value),
                _ => false,
            },
            MatchType::Dca => match_dca(entry.dca, self.context.default_dca, rule, operand),
            MatchType::ShiftDca => {
                match_dca(entry.shift_dca, self.context.default_shift_dca, rule, operand)
            }
            MatchType::PasswordHistory
            | MatchType::PasswordPolicy
            | MatchType::Attachment
            | MatchType::MediaType => false,
        }
    }

    fn eval_nested(&self, entry: &Entry, scope: FilterScope) -> bool {
        match self.expression.nested(scope) {
            Some(criteria) => fold_criteria(criteria, |p| self.eval_sub(entry, p)),
            None => false,
        }
    }

    fn eval_sub(&self, entry: &Entry, predicate: &Predicate) -> bool {
        let Some(rule) = Self::checked_rule(predicate) else {
            return false;
        };
        let operand = &predicate.operand;
        let now = self.context.now;
        let history = &entry.history;

        match predicate.field {
            FieldType::HistoryPresent => match_bool(history.is_present(), rule),
            FieldType::HistoryActive => match_bool(history.active, rule),
            FieldType::HistoryCount => integer_rule(history.items.len() as i64, rule, operand),
            FieldType::HistoryMax => integer_rule(i64::from(history.max_size), rule, operand),
            FieldType::HistoryChangeDate => {
                match_date_list(history.items.iter().map(|h| h.changed_at), rule, operand, now)
            }
            FieldType::HistoryPasswords => {
                match_text_list(history.items.iter().map(|h| h.password.as_str()), rule, operand)
            }

            FieldType::PolicyPresent => match_bool(entry.policy.is_some(), rule),
            field if field.scope() == FilterScope::Policy => {
                let Some(policy) = &entry.policy else {
                    return false;
                };
                let count = |n: u32| integer_rule(i64::from(n), rule, operand);
                match field {
                    FieldType::PolicyLength => count(policy.length),
                    FieldType::PolicyLowercase => count(policy.lowercase_min),
                    FieldType::PolicyUppercase => count(policy.uppercase_min),
                    FieldType::PolicyDigits => count(policy.digit_min),
                    FieldType::PolicySymbols => count(policy.symbol_min),
                    FieldType::PolicyEasyVision => match_bool(policy.use_easy_vision, rule),
                    FieldType::PolicyPronounceable => match_bool(policy.make_pronounceable, rule),
                    FieldType::PolicyHexadecimal => match_bool(policy.use_hex_digits, rule),
                    _ => false,
                }
            }

            FieldType::AttachmentPresent => match_bool(entry.attachment.is_some(), rule),
            field if field.scope() == FilterScope::Attachment => {
                let Some(att) = &entry.attachment else {
                    return false;
                };
                match field {
                    FieldType::AttachmentTitle => match_text(&att.title, rule, operand),
                    FieldType::AttachmentFilename => match_text(&att.filename, rule, operand),
                    FieldType::AttachmentPath => match_text(&att.path, rule, operand),
                    FieldType::AttachmentMediaType => match_text(&att.media_type, rule, operand),
                    FieldType::AttachmentCreated => match_date(att.created, rule, operand, now),
                    FieldType::AttachmentFileCreated => {
                        match_date(att.file_created, rule, operand, now)
                    }
                    FieldType::AttachmentFileModified => {
                        match_date(att.file_modified, rule, operand, now)
                    }
                    FieldType::AttachmentFileAccessed => {
                        match_date(att.file_accessed, rule, operand, now)
                    }
                    _ => false,
                }
            }

            _ => false,
        }
    }
}

fn main_text(entry: &Entry, field: FieldType) -> Cow<'_, str> {
    let value = match field {
        FieldType::GroupTitle => return Cow::Owned(entry.group_title()),
        FieldType::Group => &entry.group,
        FieldType::Title => &entry.title,
        FieldType::User => &entry.user,
        FieldType::Notes => &entry.notes,
        FieldType::Url => &entry.url,
        FieldType::Autotype => &entry.autotype,
        FieldType::RunCommand => &entry.run_command,
        FieldType::Email => &entry.email,
        FieldType::Symbols => &entry.symbols,
        FieldType::PolicyName => &entry.policy_name,
        FieldType::KbShortcut => &entry.kb_shortcut,
        _ => "",
    };
    Cow::Borrowed(value)
}

fn main_date(entry: &Entry, field: FieldType) -> Option<DateTime<Utc>> {
    match field {
        FieldType::Created => entry.created,
        FieldType::PasswordModified => entry.password_modified,
        FieldType::LastAccessed => entry.last_accessed,
        FieldType::Expiry => entry.expiry(),
        FieldType::RecordModified => entry.record_modified,
        _ => None,
    }
}

fn main_flag(entry: &Entry, field: FieldType) -> bool {
    match field {
        FieldType::Protected => entry.protected,
        FieldType::UnknownFields => entry.has_unknown_fields(),
        _ => false,
    }
}

fn integer_rule(value: i64, rule: Rule, operand: &Operand) -> bool {
    match operand {
        Operand::Integer { num1, num2 } => match_integer(value, rule, *num1, *num2),
        _ => false,
    }
}

fn is_rule(rule: Rule, equal: bool) -> bool {
    match rule {
        Rule::Is => equal,
        Rule::IsNot => !equal,
        _ => false,
    }
}

fn match_dca(value: Option<Dca>, default: Dca, rule: Rule, operand: &Operand) -> bool {
    match operand {
        Operand::Dca { value: wanted } => {
            is_rule(rule, value.unwrap_or(default) == wanted.unwrap_or(default))
        }
        _ => false,
    }
}

/// Whether `entry` passes `expression`.
///
/// Aliases and shortcuts are matched on their own fields; use
/// [`filter_collection`] to resolve them against their bases.
pub fn evaluate_filter(
    expression: &FilterExpression,
    entry: &Entry,
    context: &EvalContext,
) -> bool {
    FilterEvaluator::new(expression, context).matches(entry)
}

/// Entries of `entries` that pass `expression`, in their original order.
pub fn filter_collection<'e>(
    expression: &FilterExpression,
    entries: &'e [Entry],
    context: &EvalContext,
) -> Vec<&'e Entry> {
    let evaluator = FilterEvaluator::new(expression, context).with_bases(entries);
    let matched: Vec<&Entry> = entries.iter().filter(|e| evaluator.matches(e)).collect();
    debug!(
        entries = entries.len(),
        matched = matched.len(),
        "filtered entry collection"
    );
    matched
}
