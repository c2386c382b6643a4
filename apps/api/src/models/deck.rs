use serde::{Deserialize, Serialize};

/// One parsed line of a deck list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckEntry {
    pub qty: u32,
    pub name: String,
    /// Lowercased set code, present only together with `set_num`.
    pub set_code: Option<String>,
    pub set_num: Option<String>,
}

/// A single physical copy of a deck entry.
///
/// `suffix` is `" (n)"` when the entry asks for more than one copy so that
/// archive file names stay unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardCopy {
    pub name: String,
    pub set_code: Option<String>,
    pub set_num: Option<String>,
    pub suffix: String,
}
