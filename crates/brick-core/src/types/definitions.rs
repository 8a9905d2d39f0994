//! Preprocessor definitions.
//!
//! A definition is written `KEY` or `KEY=VALUE`. Lists are split into a
//! public half (propagated to consumers) and a private half.

use serde::{Deserialize, Serialize};

/// Definitions split by visibility
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Definitions {
    pub public: Vec<String>,
    pub private: Vec<String>,
}

impl Definitions {
    pub fn new(public: Vec<String>, private: Vec<String>) -> Self {
        Self { public, private }
    }

    pub fn is_empty(&self) -> bool {
        self.public.is_empty() && self.private.is_empty()
    }

    /// Append both halves of another list
    pub fn extend(&mut self, other: &Definitions) {
        self.public.extend(other.public.iter().cloned());
        self.private.extend(other.private.iter().cloned());
    }

    /// Private definitions followed by public ones
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.private.iter().chain(self.public.iter())
    }

    /// Look up the definition for `key` across both halves; the last one wins
    pub fn find(&self, key: &str) -> Option<&String> {
        find_definition(self.all(), key)
    }
}

/// Key part of a definition (`FOO` for `FOO=1`)
pub fn definition_key(definition: &str) -> &str {
    match definition.split_once('=') {
        Some((key, _)) => key.trim(),
        None => definition.trim(),
    }
}

/// Value part of a definition; a bare `FOO` is defined as `1`
pub fn definition_value(definition: &str) -> &str {
    match definition.split_once('=') {
        Some((_, value)) => value,
        None => "1",
    }
}

/// Whether the definition carries an explicit value
pub fn has_value(definition: &str) -> bool {
    definition.contains('=')
}

/// Find the last definition with the given key
pub fn find_definition<'a, I>(definitions: I, key: &str) -> Option<&'a String>
where
    I: IntoIterator<Item = &'a String>,
{
    definitions
        .into_iter()
        .filter(|definition| definition_key(definition) == key)
        .last()
}

/// Replace every `${TOKEN}` in `definition` with the value `lookup` yields.
///
/// Returns the first token without a value as the error.
pub fn substitute_placeholders<'a, F>(definition: &str, lookup: F) -> Result<String, String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut output = String::with_capacity(definition.len());
    let mut rest = definition;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| after.to_string())?;
        let token = &after[..end];
        let value = lookup(token).ok_or_else(|| token.to_string())?;
        output.push_str(value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);

    Ok(output)
}
