use serde::{Deserialize, Serialize};
use std::fmt;

/// Match rule of a filter row. Serialized as its two-letter mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    #[serde(rename = "EQ")]
    Equals,
    #[serde(rename = "NE")]
    NotEqual,
    #[serde(rename = "BE")]
    Begins,
    #[serde(rename = "NB")]
    NotBegins,
    #[serde(rename = "EN")]
    Ends,
    #[serde(rename = "ND")]
    NotEnds,
    #[serde(rename = "CO")]
    Contains,
    #[serde(rename = "NC")]
    NotContains,
    #[serde(rename = "CY")]
    ContainsAny,
    #[serde(rename = "NY")]
    ContainsNone,
    #[serde(rename = "CA")]
    ContainsAll,
    #[serde(rename = "NA")]
    NotContainsAll,
    #[serde(rename = "LT")]
    Less,
    #[serde(rename = "LE")]
    LessEqual,
    #[serde(rename = "GT")]
    Greater,
    #[serde(rename = "GE")]
    GreaterEqual,
    #[serde(rename = "BT")]
    Between,
    #[serde(rename = "BF")]
    Before,
    #[serde(rename = "AF")]
    After,
    #[serde(rename = "IS")]
    Is,
    #[serde(rename = "NI")]
    IsNot,
    #[serde(rename = "PR")]
    Present,
    #[serde(rename = "NP")]
    NotPresent,
    #[serde(rename = "AC")]
    Active,
    #[serde(rename = "IA")]
    Inactive,
    #[serde(rename = "SE")]
    Set,
    #[serde(rename = "NS")]
    NotSet,
    #[serde(rename = "EX")]
    Expired,
    #[serde(rename = "WX")]
    WillExpire,
}

impl Rule {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Rule::Equals => "EQ",
            Rule::NotEqual => "NE",
            Rule::Begins => "BE",
            Rule::NotBegins => "NB",
            Rule::Ends => "EN",
            Rule::NotEnds => "ND",
            Rule::Contains => "CO",
            Rule::NotContains => "NC",
            Rule::ContainsAny => "CY",
            Rule::ContainsNone => "NY",
            Rule::ContainsAll => "CA",
            Rule::NotContainsAll => "NA",
            Rule::Less => "LT",
            Rule::LessEqual => "LE",
            Rule::Greater => "GT",
            Rule::GreaterEqual => "GE",
            Rule::Between => "BT",
            Rule::Before => "BF",
            Rule::After => "AF",
            Rule::Is => "IS",
            Rule::IsNot => "NI",
            Rule::Present => "PR",
            Rule::NotPresent => "NP",
            Rule::Active => "AC",
            Rule::Inactive => "IA",
            Rule::Set => "SE",
            Rule::NotSet => "NS",
            Rule::Expired => "EX",
            Rule::WillExpire => "WX",
        }
    }

    /// Human-readable phrase, e.g. "does not contain".
    pub fn phrase(self) -> &'static str {
        match self {
            Rule::Equals => "equals",
            Rule::NotEqual => "does not equal",
            Rule::Begins => "begins with",
            Rule::NotBegins => "does not begin with",
            Rule::Ends => "ends with",
            Rule::NotEnds => "does not end with",
            Rule::Contains => "contains",
            Rule::NotContains => "does not contain",
            Rule::ContainsAny => "contains any of",
            Rule::ContainsNone => "contains none of",
            Rule::ContainsAll => "contains all of",
            Rule::NotContainsAll => "does not contain all of",
            Rule::Less => "is less than",
            Rule::LessEqual => "is less than or equal to",
            Rule::Greater => "is greater than",
            Rule::GreaterEqual => "is greater than or equal to",
            Rule::Between => "is between",
            Rule::Before => "is before",
            Rule::After => "is after",
            Rule::Is => "is",
            Rule::IsNot => "is not",
            Rule::Present => "is present",
            Rule::NotPresent => "is not present",
            Rule::Active => "is active",
            Rule::Inactive => "is inactive",
            Rule::Set => "is set",
            Rule::NotSet => "is not set",
            Rule::Expired => "has expired",
            Rule::WillExpire => "will expire within",
        }
    }

    /// Rules that are decided without looking at an operand.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            Rule::Present
                | Rule::NotPresent
                | Rule::Active
                | Rule::Inactive
                | Rule::Set
                | Rule::NotSet
                | Rule::Expired
        )
    }

    /// The positive rule a negative rule inverts.
    ///
    /// Used for list-valued fields, where "does not contain" means no item
    /// contains the operand.
    pub fn negated_positive(self) -> Option<Rule> {
        match self {
            Rule::NotEqual => Some(Rule::Equals),
            Rule::NotBegins => Some(Rule::Begins),
            Rule::NotEnds => Some(Rule::Ends),
            Rule::NotContains => Some(Rule::Contains),
            Rule::ContainsNone => Some(Rule::ContainsAny),
            Rule::NotContainsAll => Some(Rule::ContainsAll),
            _ => None,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
