//! Name-prefix indexing.
//!
//! Every whitespace-delimited word of a contact name contributes each
//! non-empty prefix of its lowercased letters to the contact's prefix set.
//! Search prefixes go through the same normalization, so `"O'Br"` finds
//! `"Mary O'Brien"` via the key `"obr"`.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Lowercased letters of `text`, everything else dropped.
pub fn letter_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Derive the prefix set for `name`.
pub fn name_prefixes(name: &str) -> BTreeSet<String> {
    let mut prefixes = BTreeSet::new();
    for word in name.split_whitespace() {
        let mut prefix = String::new();
        for ch in letter_key(word).chars() {
            prefix.push(ch);
            prefixes.insert(prefix.clone());
        }
    }
    prefixes
}

/// Key used to look a search prefix up in a prefix set.
///
/// An empty key never matches anything.
pub fn prefix_key(prefix: &str) -> String {
    letter_key(prefix)
}

/// Case-insensitive key for an email address.
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Sort key for a contact name.
pub fn name_sort_key(name: &str) -> String {
    name.to_lowercase()
}

/// A name must contain at least one word with at least one letter.
pub fn validate_name(name: &str) -> Result<()> {
    let has_word = name
        .split_whitespace()
        .any(|word| word.chars().any(char::is_alphabetic));
    if has_word {
        Ok(())
    } else {
        Err(Error::BadValue(format!(
            "name \"{}\" must contain at least one word containing a letter",
            name
        )))
    }
}
