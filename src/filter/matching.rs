//! Value matchers, one per match type family.
//!
//! These take plain values so they can be shared by main rows and nested rows.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::borrow::Cow;
use std::collections::HashSet;

use super::{Operand, Rule, MAX_RELATIVE_DAYS};

/// Operand tokens for the contains-any/none/all rules are whitespace separated.
fn tokens(s: &str) -> HashSet<&str> {
    s.split_whitespace().collect()
}

fn fold_case(s: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.to_lowercase())
    }
}

/// Match a text value. Present/not-present test for a non-empty value.
pub(crate) fn match_text(value: &str, rule: Rule, operand: &Operand) -> bool {
    match rule {
        Rule::Present => return !value.is_empty(),
        Rule::NotPresent => return value.is_empty(),
        _ => {}
    }
    let Operand::Text {
        value: pattern,
        case_sensitive,
    } = operand
    else {
        return false;
    };

    let value = fold_case(value, *case_sensitive);
    let pattern = fold_case(pattern, *case_sensitive);
    let (value, pattern): (&str, &str) = (&value, &pattern);

    match rule {
        Rule::Equals => value == pattern,
        Rule::NotEqual => value != pattern,
        Rule::Begins => value.starts_with(pattern),
        Rule::NotBegins => !value.starts_with(pattern),
        Rule::Ends => value.ends_with(pattern),
        Rule::NotEnds => !value.ends_with(pattern),
        Rule::Contains => value.contains(pattern),
        Rule::NotContains => !value.contains(pattern),
        Rule::ContainsAny => contains_any(value, pattern),
        Rule::ContainsNone => !contains_any(value, pattern),
        Rule::ContainsAll => contains_all(value, pattern),
        Rule::NotContainsAll => !contains_all(value, pattern),
        _ => false,
    }
}

fn contains_any(value: &str, pattern: &str) -> bool {
    let have = tokens(value);
    tokens(pattern).iter().any(|t| have.contains(t))
}

fn contains_all(value: &str, pattern: &str) -> bool {
    let have = tokens(value);
    tokens(pattern).iter().all(|t| have.contains(t))
}

/// Match a list of text values: positive rules need one item to match,
/// negative rules need no item to match the positive form.
pub(crate) fn match_text_list<'a>(
    values: impl Iterator<Item = &'a str>,
    rule: Rule,
    operand: &Operand,
) -> bool {
    let mut values = values.peekable();
    match rule {
        Rule::Present => values.peek().is_some(),
        Rule::NotPresent => values.peek().is_none(),
        _ => match rule.negated_positive() {
            Some(positive) => !values.any(|v| match_text(v, positive, operand)),
            None => values.any(|v| match_text(v, rule, operand)),
        },
    }
}

pub(crate) fn match_integer(value: i64, rule: Rule, num1: i64, num2: Option<i64>) -> bool {
    match rule {
        Rule::Equals => value == num1,
        Rule::NotEqual => value != num1,
        Rule::Less => value < num1,
        Rule::LessEqual => value <= num1,
        Rule::Greater => value > num1,
        Rule::GreaterEqual => value >= num1,
        Rule::Between => num2.is_some_and(|num2| num1 <= value && value <= num2),
        _ => false,
    }
}

/// Optional integers: an unset value only matches not-present.
pub(crate) fn match_optional_integer(value: Option<i64>, rule: Rule, operand: &Operand) -> bool {
    match (rule, value) {
        (Rule::Present, v) => v.is_some(),
        (Rule::NotPresent, v) => v.is_none(),
        (_, None) => false,
        (_, Some(v)) => match operand {
            Operand::Integer { num1, num2 } => match_integer(v, rule, *num1, *num2),
            _ => false,
        },
    }
}

pub(crate) fn match_bool(value: bool, rule: Rule) -> bool {
    match rule {
        Rule::Is | Rule::Present | Rule::Active | Rule::Set => value,
        Rule::IsNot | Rule::NotPresent | Rule::Inactive | Rule::NotSet => !value,
        _ => false,
    }
}

/// Resolve a date operand to calendar days, relative offsets counted from `now`.
///
/// Relative offsets are clamped to [-MAX_RELATIVE_DAYS, MAX_RELATIVE_DAYS].
fn operand_days(operand: &Operand, now: DateTime<Utc>) -> Option<(NaiveDate, Option<NaiveDate>)> {
    let today = now.date_naive();
    let shift = |days: i64| {
        let days = days.clamp(-MAX_RELATIVE_DAYS, MAX_RELATIVE_DAYS);
        Duration::try_days(days).and_then(|d| today.checked_add_signed(d))
    };
    match operand {
        Operand::DateAbsolute { date1, date2 } => Some((*date1, *date2)),
        Operand::DateRelative { days1, days2 } => {
            let first = shift(*days1)?;
            let second = match days2 {
                Some(days) => Some(shift(*days)?),
                None => None,
            };
            Some((first, second))
        }
        _ => None,
    }
}

/// Match a timestamp by calendar day (UTC). A missing date only matches not-present.
pub(crate) fn match_date(
    value: Option<DateTime<Utc>>,
    rule: Rule,
    operand: &Operand,
    now: DateTime<Utc>,
) -> bool {
    let value = match (rule, value) {
        (Rule::Present, v) => return v.is_some(),
        (Rule::NotPresent, v) => return v.is_none(),
        (_, None) => return false,
        (_, Some(v)) => v.date_naive(),
    };
    let Some((first, second)) = operand_days(operand, now) else {
        return false;
    };
    match rule {
        Rule::Equals => value == first,
        Rule::NotEqual => value != first,
        Rule::Before | Rule::Less => value < first,
        Rule::LessEqual => value <= first,
        Rule::After | Rule::Greater => value > first,
        Rule::GreaterEqual => value >= first,
        Rule::Between => second.is_some_and(|second| first <= value && value <= second),
        _ => false,
    }
}

/// Match a list of timestamps with the same any/none semantics as text lists.
pub(crate) fn match_date_list(
    values: impl Iterator<Item = DateTime<Utc>>,
    rule: Rule,
    operand: &Operand,
    now: DateTime<Utc>,
) -> bool {
    let mut values = values.peekable();
    match rule {
        Rule::Present => values.peek().is_some(),
        Rule::NotPresent => values.peek().is_none(),
        Rule::NotEqual => !values.any(|v| match_date(Some(v), Rule::Equals, operand, now)),
        _ => values.any(|v| match_date(Some(v), rule, operand, now)),
    }
}

/// Password expiry rules. Entries without an expiry never match.
pub(crate) fn match_expiry(
    expiry: Option<DateTime<Utc>>,
    rule: Rule,
    operand: &Operand,
    now: DateTime<Utc>,
) -> bool {
    let Some(expiry) = expiry else {
        return false;
    };
    match (rule, operand) {
        (Rule::Expired, _) => expiry <= now,
        (Rule::WillExpire, Operand::ExpiresWithin { days }) => Duration::try_days(*days)
            .and_then(|window| now.checked_add_signed(window))
            .is_some_and(|end| now <= expiry && expiry <= end),
        _ => false,
    }
}
