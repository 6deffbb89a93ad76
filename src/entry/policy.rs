use serde::{Deserialize, Serialize};

/// Password generation policy, either inline on an entry or named in a database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub length: u32,
    pub use_lowercase: bool,
    pub use_uppercase: bool,
    pub use_digits: bool,
    pub use_symbols: bool,
    pub use_hex_digits: bool,
    pub use_easy_vision: bool,
    pub make_pronounceable: bool,
    pub lowercase_min: u32,
    pub uppercase_min: u32,
    pub digit_min: u32,
    pub symbol_min: u32,
    /// Symbols allowed when `use_symbols` is set; empty means the default set
    pub symbols: String,
}
