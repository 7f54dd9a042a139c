//! Natural-language instruction cleanup.
//!
//! Each dataset supplies a [`ReplacementTable`] that strips its own filename and
//! hash artifacts; [`normalize_instruction`] is the normalization shared by all
//! datasets.

use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};

/// Ordered literal `(pattern, replacement)` pairs.
///
/// Pairs are applied one after another, each on the output of the previous
/// one, so earlier entries win where patterns overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(String, String)>", into = "Vec<(String, String)>")]
pub struct ReplacementTable(Vec<(String, String)>);

impl ReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from pairs, rejecting empty patterns.
    pub fn from_pairs<I, P, R>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, R)>,
        P: Into<String>,
        R: Into<String>,
    {
        let mut table = Self::new();
        for (pattern, replacement) in pairs {
            table.push(pattern, replacement)?;
        }
        Ok(table)
    }

    /// Builds a table from compile-time literals without validation.
    ///
    /// Every pattern must be non-empty.
    pub(crate) fn from_literals(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(pairs.iter().all(|(pattern, _)| !pattern.is_empty()));
        Self(
            pairs
                .iter()
                .map(|&(pattern, replacement)| (pattern.to_owned(), replacement.to_owned()))
                .collect(),
        )
    }

    pub fn push(
        &mut self,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<()> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(PreprocessError::helper(
                "clean_task_instruction",
                "replacement pattern must not be empty",
            ));
        }
        self.0.push((pattern, replacement.into()));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, r)| (p.as_str(), r.as_str()))
    }

    /// Applies every replacement in order.
    pub fn apply(&self, text: &str) -> String {
        self.0
            .iter()
            .fold(text.to_owned(), |acc, (pattern, replacement)| {
                acc.replace(pattern.as_str(), replacement)
            })
    }
}

impl TryFrom<Vec<(String, String)>> for ReplacementTable {
    type Error = PreprocessError;

    fn try_from(pairs: Vec<(String, String)>) -> Result<Self> {
        Self::from_pairs(pairs)
    }
}

impl From<ReplacementTable> for Vec<(String, String)> {
    fn from(table: ReplacementTable) -> Self {
        table.0
    }
}

/// Lower-cases, collapses whitespace runs to one space and trims.
pub fn normalize_instruction(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Applies `replacements`, then [`normalize_instruction`].
pub fn clean_task_instruction(text: &str, replacements: &ReplacementTable) -> String {
    normalize_instruction(&replacements.apply(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> ReplacementTable {
        ReplacementTable::from_pairs(pairs.iter().copied()).expect("valid table")
    }

    #[test]
    fn replacements_apply_sequentially() {
        // `ab` -> `b` runs first, so the second pass sees its output.
        let t = table(&[("ab", "b"), ("bb", "X")]);
        assert_eq!(t.apply("abb"), "X");

        let reversed = table(&[("bb", "X"), ("ab", "b")]);
        assert_eq!(reversed.apply("abb"), "aX");
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let err = ReplacementTable::from_pairs([("", " ")]).expect_err("empty pattern");
        assert!(matches!(err, PreprocessError::Helper { .. }));
    }

    #[test]
    fn normalize_collapses_and_trims() {
        assert_eq!(normalize_instruction("  Pick up the   BLOCK \n"), "pick up the block");
        assert_eq!(normalize_instruction("   "), "");
    }

    #[test]
    fn clean_runs_table_then_normalizer() {
        let t = table(&[("_", " ")]);
        assert_eq!(clean_task_instruction("Open_the__Drawer_", &t), "open the drawer");
    }

    #[test]
    fn deserializes_from_pair_list() {
        let t: ReplacementTable = serde_json::from_str(r#"[["_", " "], ["-", " "]]"#).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.iter().next(), Some(("_", " ")));

        let bad = serde_json::from_str::<ReplacementTable>(r#"[["", " "]]"#);
        assert!(bad.is_err());
    }
}
