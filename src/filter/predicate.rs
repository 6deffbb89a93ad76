//! A single filter criterion and its operand payload.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Rule;
use crate::entry::{Dca, EntryStatus, EntryType};
use crate::error::ValidationError;
use crate::field_registry::{rule_permitted, FieldType, MatchType, SizeUnit};

/// Largest magnitude of a relative date offset, in days; larger offsets are clamped.
pub const MAX_RELATIVE_DAYS: i64 = 3650;

/// Allowed window for the will-expire rule, in days.
pub const EXPIRY_DAYS_RANGE: (i64, i64) = (1, 3650);

/// How consecutive criteria are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOp {
    #[default]
    And,
    Or,
}

/// Operand payload of a criterion. Which variant is valid depends on the
/// field's match type and the rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
    /// No operand (unary rules, or not yet filled in)
    #[default]
    None,
    Text {
        value: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    /// Day window of the will-expire rule
    ExpiresWithin { days: i64 },
    /// `num2` is only used by `between`
    Integer {
        num1: i64,
        #[serde(default)]
        num2: Option<i64>,
    },
    /// Entry size in `unit`s; compared in bytes
    Size {
        num1: i64,
        #[serde(default)]
        num2: Option<i64>,
        #[serde(default)]
        unit: SizeUnit,
    },
    /// Calendar dates
    DateAbsolute {
        date1: NaiveDate,
        #[serde(default)]
        date2: Option<NaiveDate>,
    },
    /// Signed day offsets from "now"
    DateRelative {
        days1: i64,
        #[serde(default)]
        days2: Option<i64>,
    },
    EntryType { value: EntryType },
    EntryStatus { value: EntryStatus },
    /// `None` stands for the configured default action
    Dca {
        #[serde(default)]
        value: Option<Dca>,
    },
}

/// Operand kind a (field, rule) pair needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperandKind {
    None,
    Text,
    ExpiresWithin,
    Integer,
    Size,
    Date,
    EntryType,
    EntryStatus,
    Dca,
}

pub(crate) fn operand_kind(field: FieldType, rule: Rule) -> OperandKind {
    if rule.is_unary() {
        return OperandKind::None;
    }
    if rule == Rule::WillExpire {
        return OperandKind::ExpiresWithin;
    }
    match field.match_type() {
        MatchType::String | MatchType::Password | MatchType::MediaType => OperandKind::Text,
        MatchType::Integer => OperandKind::Integer,
        MatchType::EntrySize => OperandKind::Size,
        MatchType::Date => OperandKind::Date,
        MatchType::EntryType => OperandKind::EntryType,
        MatchType::EntryStatus => OperandKind::EntryStatus,
        MatchType::Dca | MatchType::ShiftDca => OperandKind::Dca,
        MatchType::Bool
        | MatchType::PasswordHistory
        | MatchType::PasswordPolicy
        | MatchType::Attachment => OperandKind::None,
    }
}

fn default_active() -> bool {
    true
}

/// One criterion: field, rule, operand and an active flag.
///
/// Rows on the nested fields (password history, policy, attachment) carry no
/// rule; they evaluate the expression's nested criteria of that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: FieldType,
    #[serde(default)]
    pub rule: Option<Rule>,
    #[serde(default)]
    pub operand: Operand,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Predicate {
    pub fn new(field: FieldType, rule: Rule, operand: Operand) -> Self {
        Predicate {
            field,
            rule: Some(rule),
            operand,
            active: true,
        }
    }

    /// Rule without an operand (present, set, expired, boolean is/is-not).
    pub fn unary(field: FieldType, rule: Rule) -> Self {
        Predicate::new(field, rule, Operand::None)
    }

    /// Case-insensitive text criterion.
    pub fn text(field: FieldType, rule: Rule, value: &str) -> Self {
        Predicate::new(
            field,
            rule,
            Operand::Text {
                value: value.to_string(),
                case_sensitive: false,
            },
        )
    }

    pub fn text_case_sensitive(field: FieldType, rule: Rule, value: &str) -> Self {
        Predicate::new(
            field,
            rule,
            Operand::Text {
                value: value.to_string(),
                case_sensitive: true,
            },
        )
    }

    pub fn integer(field: FieldType, rule: Rule, num: i64) -> Self {
        Predicate::new(field, rule, Operand::Integer { num1: num, num2: None })
    }

    pub fn integer_between(field: FieldType, low: i64, high: i64) -> Self {
        Predicate::new(
            field,
            Rule::Between,
            Operand::Integer {
                num1: low,
                num2: Some(high),
            },
        )
    }

    pub fn date(field: FieldType, rule: Rule, date: NaiveDate) -> Self {
        Predicate::new(field, rule, Operand::DateAbsolute { date1: date, date2: None })
    }

    /// Date criterion relative to "now", in days.
    pub fn relative_date(field: FieldType, rule: Rule, days: i64) -> Self {
        Predicate::new(field, rule, Operand::DateRelative { days1: days, days2: None })
    }

    pub fn will_expire_within(days: i64) -> Self {
        Predicate::new(FieldType::Password, Rule::WillExpire, Operand::ExpiresWithin { days })
    }

    /// Row that delegates to the expression's nested criteria for `field`.
    pub fn nested(field: FieldType) -> Self {
        Predicate {
            field,
            rule: None,
            operand: Operand::None,
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn match_type(&self) -> MatchType {
        self.field.match_type()
    }

    pub fn is_nested(&self) -> bool {
        self.match_type().nested_scope().is_some()
    }

    /// Whether the row has everything it needs to be evaluated.
    ///
    /// Incomplete rows are kept but never match.
    pub fn is_complete(&self) -> bool {
        if self.is_nested() {
            return self.rule.is_none();
        }
        match self.rule {
            None => false,
            Some(rule) => {
                operand_kind(self.field, rule) == OperandKind::None
                    || self.operand != Operand::None
            }
        }
    }

    /// Check the rule and operand against the field's declared constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let field = self.field;
        if self.is_nested() {
            if let Some(rule) = self.rule {
                return Err(ValidationError::RuleNotPermitted { field, rule });
            }
            return Ok(());
        }

        let Some(rule) = self.rule else {
            return Ok(());
        };
        if !rule_permitted(field, rule) {
            return Err(ValidationError::RuleNotPermitted { field, rule });
        }

        let kind = operand_kind(field, rule);
        if kind == OperandKind::None || self.operand == Operand::None {
            return Ok(());
        }
        let between = rule == Rule::Between;

        match (kind, &self.operand) {
            (OperandKind::Text, Operand::Text { .. }) => Ok(()),
            (OperandKind::ExpiresWithin, Operand::ExpiresWithin { days }) => {
                let (min, max) = EXPIRY_DAYS_RANGE;
                if *days < min || *days > max {
                    return Err(ValidationError::ExpiryDaysOutOfRange { days: *days });
                }
                Ok(())
            }
            (OperandKind::Integer, Operand::Integer { num1, num2 }) => {
                check_pair(field, between, *num1, *num2, |n| check_bounds(field, n))
            }
            (OperandKind::Size, Operand::Size { num1, num2, unit }) => {
                check_pair(field, between, *num1, *num2, |n| {
                    check_bounds(field, n)?;
                    check_bounds(field, scale_size(n, *unit))
                })
            }
            (OperandKind::Date, Operand::DateAbsolute { date1, date2 }) => {
                check_pair(field, between, *date1, *date2, |_| Ok(()))
            }
            (OperandKind::Date, Operand::DateRelative { days1, days2 }) => {
                let clamp = |d: i64| d.clamp(-MAX_RELATIVE_DAYS, MAX_RELATIVE_DAYS);
                check_pair(field, between, clamp(*days1), days2.map(clamp), |_| Ok(()))
            }
            (OperandKind::EntryType, Operand::EntryType { .. })
            | (OperandKind::EntryStatus, Operand::EntryStatus { .. })
            | (OperandKind::Dca, Operand::Dca { .. }) => Ok(()),
            (kind, _) => Err(ValidationError::OperandMismatch {
                field,
                reason: kind.expected(),
            }),
        }
    }
}

impl OperandKind {
    pub(crate) fn accepts(self, operand: &Operand) -> bool {
        matches!(
            (self, operand),
            (OperandKind::None, Operand::None)
                | (OperandKind::Text, Operand::Text { .. })
                | (OperandKind::ExpiresWithin, Operand::ExpiresWithin { .. })
                | (OperandKind::Integer, Operand::Integer { .. })
                | (OperandKind::Size, Operand::Size { .. })
                | (OperandKind::Date, Operand::DateAbsolute { .. })
                | (OperandKind::Date, Operand::DateRelative { .. })
                | (OperandKind::EntryType, Operand::EntryType { .. })
                | (OperandKind::EntryStatus, Operand::EntryStatus { .. })
                | (OperandKind::Dca, Operand::Dca { .. })
        )
    }

    fn expected(self) -> &'static str {
        match self {
            OperandKind::None => "no operand expected",
            OperandKind::Text => "expected a text operand",
            OperandKind::ExpiresWithin => "expected a day count",
            OperandKind::Integer => "expected an integer operand",
            OperandKind::Size => "expected a size operand",
            OperandKind::Date => "expected a date operand",
            OperandKind::EntryType => "expected an entry type",
            OperandKind::EntryStatus => "expected an entry status",
            OperandKind::Dca => "expected a double-click action",
        }
    }
}

/// Size operand in bytes.
pub(crate) fn scale_size(num: i64, unit: SizeUnit) -> i64 {
    num.saturating_mul(1i64 << unit.shift())
}

fn check_bounds(field: FieldType, value: i64) -> Result<(), ValidationError> {
    if let Some((min, max)) = field.integer_bounds() {
        if value < min || value > max {
            return Err(ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
            });
        }
    }
    Ok(())
}

/// Validate each value and, for `between`, that both exist and are ordered.
fn check_pair<T: PartialOrd + Copy>(
    field: FieldType,
    between: bool,
    first: T,
    second: Option<T>,
    check: impl Fn(T) -> Result<(), ValidationError>,
) -> Result<(), ValidationError> {
    check(first)?;
    if !between {
        return Ok(());
    }
    let Some(second) = second else {
        return Err(ValidationError::OperandMismatch {
            field,
            reason: "between needs two values",
        });
    };
    check(second)?;
    if first >= second {
        return Err(ValidationError::InvertedRange { field });
    }
    Ok(())
}

/// A criterion together with the operator joining it to the ones before.
///
/// The operator of the first active term is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    #[serde(default)]
    pub logic: LogicOp,
    #[serde(flatten)]
    pub predicate: Predicate,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Text {
                value,
                case_sensitive,
            } => {
                let case = if *case_sensitive {
                    "case-sensitive"
                } else {
                    "case-insensitive"
                };
                write!(f, "\"{}\" ({})", value, case)
            }
            Operand::ExpiresWithin { days } => write!(f, "{} days", days),
            Operand::Integer { num1, num2 } => match num2 {
                Some(num2) => write!(f, "{} and {}", num1, num2),
                None => write!(f, "{}", num1),
            },
            Operand::Size { num1, num2, unit } => match num2 {
                Some(num2) => write!(f, "{}{} and {}{}", num1, unit.suffix(), num2, unit.suffix()),
                None => write!(f, "{}{}", num1, unit.suffix()),
            },
            Operand::DateAbsolute { date1, date2 } => match date2 {
                Some(date2) => write!(f, "{} and {}", date1, date2),
                None => write!(f, "{}", date1),
            },
            Operand::DateRelative { days1, days2 } => match days2 {
                Some(days2) => write!(f, "today{:+} and today{:+} days", days1, days2),
                None => write!(f, "today{:+} days", days1),
            },
            Operand::EntryType { value } => write!(f, "{:?}", value),
            Operand::EntryStatus { value } => write!(f, "{:?}", value),
            Operand::Dca { value } => match value {
                Some(dca) => write!(f, "{}", dca),
                None => f.write_str("the default action"),
            },
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.active {
            f.write_str("[inactive] ")?;
        }
        if self.is_nested() {
            return write!(f, "{} matches its nested filter", self.field);
        }
        match self.rule {
            None => write!(f, "{} (incomplete)", self.field),
            Some(rule) if self.operand == Operand::None => {
                write!(f, "{} {}", self.field, rule.phrase())
            }
            Some(rule) => write!(f, "{} {} {}", self.field, rule.phrase(), self.operand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completeness() {
        assert!(Predicate::text(FieldType::Title, Rule::Contains, "vpn").is_complete());
        assert!(Predicate::unary(FieldType::Notes, Rule::Present).is_complete());
        assert!(Predicate::unary(FieldType::Protected, Rule::Is).is_complete());
        assert!(!Predicate::new(FieldType::Title, Rule::Contains, Operand::None).is_complete());
        assert!(Predicate::nested(FieldType::PasswordHistory).is_complete());

        let mut no_rule = Predicate::text(FieldType::Title, Rule::Contains, "x");
        no_rule.rule = None;
        assert!(!no_rule.is_complete());
        assert!(no_rule.validate().is_ok());
    }

    #[test]
    fn test_rule_not_permitted() {
        let p = Predicate::unary(FieldType::Title, Rule::Present);
        assert_eq!(
            p.validate(),
            Err(ValidationError::RuleNotPermitted {
                field: FieldType::Title,
                rule: Rule::Present
            })
        );

        let mut nested = Predicate::nested(FieldType::Policy);
        nested.rule = Some(Rule::Is);
        assert!(matches!(
            nested.validate(),
            Err(ValidationError::RuleNotPermitted { .. })
        ));
    }

    #[test]
    fn test_between_needs_ordered_values() {
        let ok = Predicate::integer_between(FieldType::PasswordLength, 8, 16);
        assert!(ok.validate().is_ok());

        let inverted = Predicate::integer_between(FieldType::PasswordLength, 16, 8);
        assert_eq!(
            inverted.validate(),
            Err(ValidationError::InvertedRange {
                field: FieldType::PasswordLength
            })
        );

        let equal = Predicate::integer_between(FieldType::PasswordLength, 8, 8);
        assert!(equal.validate().is_err());

        let missing = Predicate::integer(FieldType::PasswordLength, Rule::Between, 8);
        assert!(matches!(
            missing.validate(),
            Err(ValidationError::OperandMismatch { .. })
        ));
    }

    #[test]
    fn test_integer_bounds() {
        let p = Predicate::integer(FieldType::PasswordLength, Rule::Less, 2000);
        assert_eq!(
            p.validate(),
            Err(ValidationError::OutOfRange {
                field: FieldType::PasswordLength,
                value: 2000,
                min: 4,
                max: 1024
            })
        );
        assert!(Predicate::integer(FieldType::HistoryMax, Rule::Equals, 255)
            .validate()
            .is_ok());
        assert!(Predicate::integer(FieldType::HistoryMax, Rule::Equals, 256)
            .validate()
            .is_err());
    }

    #[test]
    fn test_size_bounds_after_scaling() {
        let fits = Predicate::new(
            FieldType::EntrySize,
            Rule::Greater,
            Operand::Size {
                num1: 2,
                num2: None,
                unit: SizeUnit::Megabytes,
            },
        );
        assert!(fits.validate().is_ok());

        let too_big = Predicate::new(
            FieldType::EntrySize,
            Rule::Greater,
            Operand::Size {
                num1: 4096,
                num2: None,
                unit: SizeUnit::Megabytes,
            },
        );
        assert!(matches!(
            too_big.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_expiry_window_range() {
        assert!(Predicate::will_expire_within(1).validate().is_ok());
        assert!(Predicate::will_expire_within(3650).validate().is_ok());
        assert_eq!(
            Predicate::will_expire_within(0).validate(),
            Err(ValidationError::ExpiryDaysOutOfRange { days: 0 })
        );
        assert_eq!(
            Predicate::will_expire_within(3651).validate(),
            Err(ValidationError::ExpiryDaysOutOfRange { days: 3651 })
        );
    }

    #[test]
    fn test_relative_date_offsets_clamp() {
        let p = Predicate::relative_date(FieldType::Created, Rule::Less, -5000);
        assert!(p.validate().is_ok());
        let p = Predicate::relative_date(FieldType::Created, Rule::After, -30);
        assert!(p.validate().is_ok());

        // Both ends clamp to the same day, so the range is empty
        let p = Predicate::new(
            FieldType::Created,
            Rule::Between,
            Operand::DateRelative {
                days1: -5000,
                days2: Some(-4000),
            },
        );
        assert_eq!(
            p.validate(),
            Err(ValidationError::InvertedRange {
                field: FieldType::Created
            })
        );
    }

    #[test]
    fn test_operand_kind_mismatch() {
        let p = Predicate::new(
            FieldType::Title,
            Rule::Contains,
            Operand::Integer { num1: 3, num2: None },
        );
        assert!(matches!(
            p.validate(),
            Err(ValidationError::OperandMismatch { .. })
        ));
    }

    #[test]
    fn test_term_json_layout() {
        let json = r#"{"logic":"or","field":"title","rule":"CO","operand":{"kind":"text","value":"vpn"},"active":true}"#;
        let term: Term = serde_json::from_str(json).unwrap();
        assert_eq!(term.logic, LogicOp::Or);
        assert_eq!(term.predicate, Predicate::text(FieldType::Title, Rule::Contains, "vpn"));
    }

    #[test]
    fn test_display() {
        let p = Predicate::text(FieldType::Title, Rule::Contains, "vpn");
        assert_eq!(p.to_string(), "title contains \"vpn\" (case-insensitive)");
        let p = Predicate::unary(FieldType::Notes, Rule::Present).inactive();
        assert_eq!(p.to_string(), "[inactive] notes is present");
    }
}
