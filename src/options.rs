use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::ffi::OsString;
use std::sync::LazyLock;

use crate::error::{DevError, Result};

// --key=value
static KEY_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^--([A-Za-z0-9][A-Za-z0-9_-]*)=(.*)$").expect("key/value pattern is valid")
});

// --key value
static KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^--([A-Za-z0-9][A-Za-z0-9_-]*)$").expect("key pattern is valid")
});

// -flag; `--` and `-5` are plain tokens
static FLAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-([A-Za-z][A-Za-z0-9_-]*)$").expect("flag pattern is valid")
});

const RESERVED_WORD: &str = "args";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// `-flag`
    Flag,
    /// `--key=value` or `--key value`
    Value(String),
    /// `--key` with no value following it
    Missing,
}

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Flag => serializer.serialize_bool(true),
            Self::Value(value) => serializer.serialize_str(value),
            Self::Missing => serializer.serialize_none(),
        }
    }
}

/// Positional arguments plus lower-cased option keys, built from a raw token list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    args: Vec<String>,
    values: BTreeMap<String, OptionValue>,
}

impl ParsedOptions {
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    // Lookup is case-insensitive since keys are stored lower-cased
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(&key.to_lowercase())
    }

    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(OptionValue::Flag))
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(OptionValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_missing(&self, key: &str) -> bool {
        matches!(self.get(key), Some(OptionValue::Missing))
    }

    #[must_use]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl Serialize for ParsedOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry(RESERVED_WORD, &self.args)?;
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn option_key(raw: &str) -> Result<String> {
    let key = raw.to_lowercase();
    if key == RESERVED_WORD {
        return Err(DevError::ReservedWord(raw.to_string()));
    }
    Ok(key)
}

/// Turn a token list into [`ParsedOptions`].
///
/// Each token is matched against `--key=value`, `--key`, `-flag` in that
/// order. A `--key` waits in a FIFO queue for the next token that matches
/// none of those forms; keys still waiting at the end are set to
/// [`OptionValue::Missing`].
///
/// # Errors
///
/// Returns [`DevError::ReservedWord`] if a token, or a key derived from one,
/// is `args` in any letter case.
pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<ParsedOptions> {
    let mut options = ParsedOptions::default();
    let mut pending: VecDeque<String> = VecDeque::new();

    for token in tokens {
        let token = token.as_ref();

        if token.to_lowercase() == RESERVED_WORD {
            return Err(DevError::ReservedWord(token.to_string()));
        }

        if let Some(captures) = KEY_VALUE_REGEX.captures(token) {
            let key = option_key(&captures[1])?;
            options
                .values
                .insert(key, OptionValue::Value(captures[2].to_string()));
            continue;
        }

        if let Some(captures) = KEY_REGEX.captures(token) {
            pending.push_back(option_key(&captures[1])?);
            continue;
        }

        if let Some(captures) = FLAG_REGEX.captures(token) {
            let key = option_key(&captures[1])?;
            options.values.insert(key, OptionValue::Flag);
            continue;
        }

        match pending.pop_front() {
            Some(key) => {
                options
                    .values
                    .insert(key, OptionValue::Value(token.to_string()));
            }
            None => options.args.push(token.to_string()),
        }
    }

    for key in pending {
        options.values.insert(key, OptionValue::Missing);
    }

    Ok(options)
}

/// Parse tokens taken straight from the process arguments.
///
/// # Errors
///
/// Returns [`DevError::InvalidInput`] if a token is not valid UTF-8, and
/// anything [`parse`] returns.
pub fn parse_os(tokens: &[OsString]) -> Result<ParsedOptions> {
    let tokens = tokens
        .iter()
        .map(|token| {
            token.to_str().ok_or_else(|| {
                DevError::InvalidInput(format!(
                    "argument {} is not a valid string",
                    token.to_string_lossy()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    parse(&tokens)
}
