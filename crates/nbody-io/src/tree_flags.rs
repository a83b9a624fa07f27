//! gbpTrees merger-tree flags.
//!
//! The flag names and bit positions live in a C header (`tree_flags.h`) as
//! lines of the form:
//!
//! ```text
//! #define TREE_CASE_MAIN_PROGENITOR  TTTP02
//! ```
//!
//! where `TTTPnn` expands to `1 << nn`. The `TTTPnn` macros themselves are
//! skipped.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{NbodyIoError, Result};

const BIT_MACRO_PREFIX: &str = "TTTP";

/// Flag names and values in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeFlags {
    flags: Vec<(String, u64)>,
}

impl TreeFlags {
    /// Parse a `tree_flags.h` file.
    pub fn from_header_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    /// Parse header text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut flags = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (name, value) = match tokens.as_slice() {
                [first, ..] if first.starts_with("//") => continue,
                ["#define", name, value, ..] => (*name, *value),
                _ => continue,
            };
            if name.starts_with(BIT_MACRO_PREFIX) {
                continue;
            }
            let Some(bit) = value.strip_prefix(BIT_MACRO_PREFIX) else {
                debug!(line = line_no + 1, name, "Skipping non-flag define");
                continue;
            };
            let bit: u32 = bit
                .parse()
                .ok()
                .filter(|&b| b < u64::BITS)
                .ok_or_else(|| {
                    NbodyIoError::invalid_header(format!(
                        "tree flag {name} has invalid bit '{value}' on line {}",
                        line_no + 1
                    ))
                })?;
            flags.push((name.to_string(), 1u64 << bit));
        }

        Ok(Self { flags })
    }

    /// All flags in header order.
    pub fn flags(&self) -> &[(String, u64)] {
        &self.flags
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.flags
            .iter()
            .find(|(flag, _)| flag == name)
            .map(|(_, value)| *value)
    }

    /// Names of every flag fully set in `value`.
    pub fn matching(&self, value: u64) -> Vec<&str> {
        self.flags
            .iter()
            .filter(|(_, flag)| value & flag == *flag)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// `|`-separated names of every flag set in `value`.
    pub fn describe(&self, value: u64) -> String {
        self.matching(value).join("|")
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
