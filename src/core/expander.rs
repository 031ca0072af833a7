//! Marker expansion engine.
//!
//! Replaces short marker tokens in free-form text with their configured
//! replacements. A marker preceded by an odd-length run of escape characters
//! stays literal; every pair of escape characters collapses to one.
//!
//! | input     | output       |
//! |-----------|--------------|
//! | `-e`      | `expanded`   |
//! | `\-e`     | `-e`         |
//! | `\\-e`    | `\expanded`  |
//! | `\\\-e`   | `\-e`        |
//! | `\\\\-e`  | `\\expanded` |
//!
//! The scan is a single left-to-right pass over the input. Emitted text is
//! never scanned again, so a replacement that contains another marker is left
//! as-is. At each position the earliest match wins; [`MatchOrder`] only
//! decides between markers matching at the same position.
//!
//! Markers glued together with no separator form a chain. Repeats of the
//! marker that started the chain expand (`-e-e`), any other marker in the
//! chain stays literal (`-e-v` gives `expanded-v`).

use crate::core::error::{Error, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Escape character used when none is configured.
pub const DEFAULT_ESCAPE_CHAR: char = '\\';

/// Ordered marker to replacement mapping.
///
/// Declaration order is significant: it breaks ties between markers that
/// match at the same position under [`MatchOrder::Declaration`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerTable {
    entries: Vec<(String, String)>,
}

impl MarkerTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from pairs, keeping their order.
    ///
    /// A repeated marker replaces the earlier replacement in place.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::new();
        for (marker, replacement) in pairs {
            table.insert(marker, replacement)?;
        }
        Ok(table)
    }

    /// Inserts a mapping and returns the previous replacement, if any.
    ///
    /// New markers go to the end; existing markers keep their position.
    pub fn insert(
        &mut self,
        marker: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<Option<String>> {
        let marker = marker.into();
        let replacement = replacement.into();

        if marker.is_empty() {
            return Err(Error::invalid_marker(marker, "marker must not be empty"));
        }

        if let Some(slot) = self.entries.iter_mut().find(|(m, _)| *m == marker) {
            return Ok(Some(std::mem::replace(&mut slot.1, replacement)));
        }

        self.entries.push((marker, replacement));
        Ok(None)
    }

    /// Removes a mapping and returns its replacement.
    pub fn remove(&mut self, marker: &str) -> Option<String> {
        let index = self.entries.iter().position(|(m, _)| m == marker)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns the replacement for a marker.
    #[must_use]
    pub fn get(&self, marker: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(m, _)| m == marker)
            .map(|(_, r)| r.as_str())
    }

    /// Returns true if the marker is present.
    #[must_use]
    pub fn contains(&self, marker: &str) -> bool {
        self.get(marker).is_some()
    }

    /// Number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(marker, replacement)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(m, r)| (m.as_str(), r.as_str()))
    }
}

impl Serialize for MarkerTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (marker, replacement) in &self.entries {
            map.serialize_entry(marker, replacement)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MarkerTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = MarkerTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of marker strings to replacement strings")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut table = MarkerTable::new();
                while let Some((marker, replacement)) = access.next_entry::<String, String>()? {
                    if table.contains(&marker) {
                        return Err(de::Error::custom(format!("duplicate marker '{marker}'")));
                    }
                    table.insert(marker, replacement).map_err(de::Error::custom)?;
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Which marker wins when several match at the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrder {
    /// First declared marker wins.
    #[default]
    Declaration,
    /// Longest marker wins; equal lengths fall back to declaration order.
    LongestFirst,
}

impl MatchOrder {
    /// Returns the configuration name of the policy.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Declaration => "declaration",
            Self::LongestFirst => "longest_first",
        }
    }
}

impl fmt::Display for MatchOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for MatchOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "declaration" => Ok(Self::Declaration),
            "longest_first" => Ok(Self::LongestFirst),
            _ => Err(format!(
                "Invalid match order: {s}. Expected: declaration or longest_first"
            )),
        }
    }
}

/// Result of expanding one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// The rewritten text.
    pub text: String,
    /// Whether `text` differs from the input.
    pub changed: bool,
}

impl Expansion {
    /// Consumes the expansion, returning the text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Expander bound to one table, escape character and match order.
#[derive(Debug, Clone)]
pub struct Expander {
    table: MarkerTable,
    escape: char,
    order: MatchOrder,
    /// Indices into `table` in match priority. Markers starting with the
    /// escape character are left out: the escape run would always swallow
    /// their first character.
    ranking: Vec<usize>,
}

impl Expander {
    /// Creates an expander using declaration order.
    #[must_use]
    pub fn new(table: MarkerTable, escape: char) -> Self {
        let ranking = rank(&table, escape, MatchOrder::Declaration);
        Self {
            table,
            escape,
            order: MatchOrder::Declaration,
            ranking,
        }
    }

    /// Sets the match order.
    #[must_use]
    pub fn with_order(mut self, order: MatchOrder) -> Self {
        self.order = order;
        self.ranking = rank(&self.table, self.escape, order);
        self
    }

    /// Returns the mapping table.
    #[must_use]
    pub fn table(&self) -> &MarkerTable {
        &self.table
    }

    /// Returns the escape character.
    #[must_use]
    pub fn escape_char(&self) -> char {
        self.escape
    }

    /// Returns the match order.
    #[must_use]
    pub fn order(&self) -> MatchOrder {
        self.order
    }

    /// Expands all markers in `text`.
    #[must_use]
    pub fn expand(&self, text: &str) -> Expansion {
        if text.is_empty() || self.ranking.is_empty() {
            return Expansion {
                text: text.to_string(),
                changed: false,
            };
        }

        let expanded = scan(text, &self.table, self.escape, &self.ranking);
        let changed = expanded != text;

        tracing::trace!(
            markers = self.ranking.len(),
            changed,
            "Expanded text"
        );

        Expansion {
            text: expanded,
            changed,
        }
    }
}

/// Expands `text` with `table` in declaration order.
#[must_use]
pub fn expand(text: &str, table: &MarkerTable, escape: char) -> String {
    if text.is_empty() || table.is_empty() {
        return text.to_string();
    }

    let ranking = rank(table, escape, MatchOrder::Declaration);
    scan(text, table, escape, &ranking)
}

fn rank(table: &MarkerTable, escape: char, order: MatchOrder) -> Vec<usize> {
    let mut ranking: Vec<usize> = table
        .iter()
        .enumerate()
        .filter(|(_, (marker, _))| !marker.starts_with(escape))
        .map(|(index, _)| index)
        .collect();

    if order == MatchOrder::LongestFirst {
        // Stable sort, so equal lengths keep declaration order.
        ranking.sort_by_key(|&index| std::cmp::Reverse(table.entries[index].0.chars().count()));
    }

    ranking
}

fn find_marker<'t>(
    table: &'t MarkerTable,
    ranking: &[usize],
    text: &str,
) -> Option<&'t (String, String)> {
    ranking
        .iter()
        .map(|&index| &table.entries[index])
        .find(|(marker, _)| text.starts_with(marker.as_str()))
}

fn scan(text: &str, table: &MarkerTable, escape: char, ranking: &[usize]) -> String {
    let escape_len = escape.len_utf8();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    // Byte offset where the last marker token ended, and the marker that
    // started the run of tokens glued together up to there.
    let mut chain: Option<(usize, &str)> = None;

    while pos < text.len() {
        let rest = &text[pos..];
        let run = rest.chars().take_while(|&c| c == escape).count();
        let run_len = run * escape_len;

        if let Some((marker, replacement)) = find_marker(table, ranking, &rest[run_len..]) {
            let head = match chain {
                Some((end, head)) if run == 0 && end == pos => head,
                _ => marker.as_str(),
            };

            if head != marker {
                out.push_str(marker);
            } else {
                for _ in 0..run / 2 {
                    out.push(escape);
                }
                out.push_str(if run % 2 == 0 { replacement } else { marker });
            }
            pos += run_len + marker.len();
            chain = Some((pos, head));
            continue;
        }

        if run > 0 {
            out.push_str(&rest[..run_len]);
            pos += run_len;
            continue;
        }

        match rest.chars().next() {
            Some(c) => {
                out.push(c);
                pos += c.len_utf8();
            },
            None => break,
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn table() -> MarkerTable {
        MarkerTable::from_pairs([("-e", "expanded"), ("-d", "debug mode"), ("-v", "verbose")])
            .expect("valid table")
    }

    fn e(text: &str) -> String {
        expand(text, &table(), DEFAULT_ESCAPE_CHAR)
    }

    // =========================================================================
    // Escape parity
    // =========================================================================

    #[rstest]
    #[case("-e", "expanded")]
    #[case("hello -e world", "hello expanded world")]
    #[case(r"\-e", "-e")]
    #[case(r"hello \-e world", "hello -e world")]
    #[case(r"\\-e", r"\expanded")]
    #[case(r"hello \\-e world", r"hello \expanded world")]
    #[case(r"\\\-e", r"\-e")]
    #[case(r"hello \\\-e world", r"hello \-e world")]
    #[case(r"\\\\-e", r"\\expanded")]
    #[case(r"hello \\\\-e world", r"hello \\expanded world")]
    #[case(r"\\\\\-e", r"\\-e")]
    fn test_escape_parity(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(e(input), expected);
    }

    #[rstest]
    #[case("-e and -v", "expanded and verbose")]
    #[case(r"\-e and -v", "-e and verbose")]
    #[case(r"\-e and \-v", "-e and -v")]
    #[case("-e-v", "expanded-v")]
    #[case("no markers here", "no markers here")]
    #[case("", "")]
    fn test_mixed_markers(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(e(input), expected);
    }

    #[test]
    fn test_marker_inside_word() {
        assert_eq!(e("a-eb"), "aexpandedb");
    }

    #[test]
    fn test_empty_table_is_noop() {
        let text = r"anything \-e at all";
        assert_eq!(expand(text, &MarkerTable::new(), '\\'), text);
    }

    #[test]
    fn test_escape_run_without_marker_is_verbatim() {
        assert_eq!(e(r"C:\\path\to -e"), r"C:\\path\to expanded");
        assert_eq!(e(r"trailing \\"), r"trailing \\");
    }

    // =========================================================================
    // Adjacent markers
    // =========================================================================

    #[test]
    fn test_glued_chain_other_markers_stay_literal() {
        assert_eq!(e("-e-v-d"), "expanded-v-d");
        assert_eq!(e("-e-v-v"), "expanded-v-v");
    }

    #[test]
    fn test_repeated_marker_expands_every_time() {
        assert_eq!(e("-e-e"), "expandedexpanded");
        assert_eq!(e("-e-v-e"), "expanded-vexpanded");

        let table = MarkerTable::from_pairs([("ha", "HA!")]).expect("table");
        assert_eq!(expand("hahaha", &table, '\\'), "HA!HA!HA!");

        let table = MarkerTable::from_pairs([("!", "please")]).expect("table");
        assert_eq!(expand("go!!", &table, '\\'), "gopleaseplease");
    }

    #[test]
    fn test_escaped_marker_starts_chain() {
        assert_eq!(e(r"\-e-v"), "-e-v");
        assert_eq!(e(r"\-e-e"), "-eexpanded");
    }

    #[test]
    fn test_escape_run_breaks_chain() {
        assert_eq!(e(r"-e\\-v"), r"expanded\verbose");
        assert_eq!(e(r"-e\-v"), "expanded-v");
    }

    #[test]
    fn test_separator_breaks_chain() {
        assert_eq!(e("-e -v"), "expanded verbose");
        assert_eq!(e("-e,-v"), "expanded,verbose");
    }

    // =========================================================================
    // Freeze policy and ordering
    // =========================================================================

    #[test]
    fn test_replacement_is_not_rescanned() {
        let table = MarkerTable::from_pairs([("-a", "x -b"), ("-b", "y")]).expect("table");
        let once = expand("-a", &table, '\\');
        assert_eq!(once, "x -b");

        // Not idempotent: a second pass expands the marker the first one inserted.
        let twice = expand(&once, &table, '\\');
        assert_eq!(twice, "x y");
    }

    #[test]
    fn test_replacement_containing_own_marker_terminates() {
        let table = MarkerTable::from_pairs([("-r", "again -r")]).expect("table");
        assert_eq!(expand("-r", &table, '\\'), "again -r");
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let table = MarkerTable::from_pairs([("-v", "short"), ("-verbose", "long")]).expect("table");
        assert_eq!(expand("-verbose", &table, '\\'), "shorterbose");
    }

    #[test]
    fn test_earliest_position_beats_declaration_order() {
        let table = MarkerTable::from_pairs([("b", "B"), ("ab", "AB")]).expect("table");
        assert_eq!(expand("ab", &table, '\\'), "AB");
        assert_eq!(expand("b ab", &table, '\\'), "B AB");
    }

    #[test]
    fn test_longest_first_breaks_ties() {
        let table = MarkerTable::from_pairs([("-v", "short"), ("-verbose", "long")]).expect("table");
        let expander = Expander::new(table, '\\').with_order(MatchOrder::LongestFirst);
        assert_eq!(expander.expand("-verbose -v").text, "long short");
    }

    #[test]
    fn test_longest_first_equal_lengths_keep_declaration_order() {
        let table = MarkerTable::from_pairs([("ab", "first"), ("a", "x"), ("ab", "second")])
            .expect("table");
        let expander = Expander::new(table, '\\').with_order(MatchOrder::LongestFirst);
        assert_eq!(expander.expand("ab").text, "second");
    }

    // =========================================================================
    // Escape character and unicode
    // =========================================================================

    #[test]
    fn test_custom_escape_char() {
        let table = table();
        assert_eq!(expand("^-e", &table, '^'), "-e");
        assert_eq!(expand("^^-e", &table, '^'), "^expanded");
        assert_eq!(expand(r"\-e", &table, '^'), r"\expanded");
    }

    #[test]
    fn test_multibyte_escape_and_markers() {
        let table = MarkerTable::from_pairs([("-d", "该睡觉了"), ("→", "arrow")]).expect("table");
        assert_eq!(expand("¦-d ¦¦→", &table, '¦'), "-d ¦arrow");
        assert_eq!(expand("说 -d 吧", &table, '\\'), "说 该睡觉了 吧");
    }

    #[test]
    fn test_marker_starting_with_escape_is_skipped() {
        let table = MarkerTable::from_pairs([(r"\x", "never"), ("-e", "expanded")]).expect("table");
        assert_eq!(expand(r"\x -e", &table, '\\'), r"\x expanded");
    }

    // =========================================================================
    // Expander / Expansion
    // =========================================================================

    #[test]
    fn test_expansion_changed_flag() {
        let expander = Expander::new(table(), '\\');
        assert!(expander.expand("-e").changed);
        assert!(!expander.expand("plain").changed);
        assert!(!expander.expand("").changed);
    }

    #[test]
    fn test_escaped_marker_reports_changed() {
        // The escape character is consumed, so the text differs.
        let expansion = Expander::new(table(), '\\').expand(r"\-e");
        assert_eq!(expansion.text, "-e");
        assert!(expansion.changed);
    }

    #[test]
    fn test_expander_accessors() {
        let expander = Expander::new(table(), '^').with_order(MatchOrder::LongestFirst);
        assert_eq!(expander.escape_char(), '^');
        assert_eq!(expander.order(), MatchOrder::LongestFirst);
        assert_eq!(expander.table().len(), 3);
        assert_eq!(expander.expand("-v").into_text(), "verbose");
    }

    // =========================================================================
    // MarkerTable
    // =========================================================================

    #[test]
    fn test_table_rejects_empty_marker() {
        let err = MarkerTable::new().insert("", "x").expect_err("empty marker");
        assert!(matches!(err, Error::InvalidMarker { .. }));
    }

    #[test]
    fn test_table_insert_replaces_in_place() {
        let mut table = table();
        let previous = table.insert("-e", "EXPANDED").expect("insert");
        assert_eq!(previous.as_deref(), Some("expanded"));
        let markers: Vec<&str> = table.iter().map(|(m, _)| m).collect();
        assert_eq!(markers, vec!["-e", "-d", "-v"]);
        assert_eq!(table.get("-e"), Some("EXPANDED"));
    }

    #[test]
    fn test_table_remove() {
        let mut table = table();
        assert_eq!(table.remove("-d").as_deref(), Some("debug mode"));
        assert_eq!(table.remove("-d"), None);
        assert_eq!(table.len(), 2);
        assert!(!table.contains("-d"));
    }

    #[test]
    fn test_table_json_preserves_order() {
        let json = r#"{"-z":"zulu","-a":"alpha","-m":"mike"}"#;
        let table: MarkerTable = serde_json::from_str(json).expect("parse");
        let markers: Vec<&str> = table.iter().map(|(m, _)| m).collect();
        assert_eq!(markers, vec!["-z", "-a", "-m"]);
        assert_eq!(serde_json::to_string(&table).expect("serialize"), json);
    }

    #[test]
    fn test_table_json_rejects_duplicates() {
        let err = serde_json::from_str::<MarkerTable>(r#"{"-a":"x","-a":"y"}"#)
            .expect_err("duplicate");
        assert!(err.to_string().contains("duplicate marker '-a'"));
    }

    #[test]
    fn test_table_json_rejects_empty_marker() {
        assert!(serde_json::from_str::<MarkerTable>(r#"{"":"x"}"#).is_err());
    }

    // =========================================================================
    // MatchOrder
    // =========================================================================

    #[test]
    fn test_match_order_parse() {
        assert_eq!(
            "declaration".parse::<MatchOrder>(),
            Ok(MatchOrder::Declaration)
        );
        assert_eq!(
            "longest-first".parse::<MatchOrder>(),
            Ok(MatchOrder::LongestFirst)
        );
        assert_eq!(
            "LONGEST_FIRST".parse::<MatchOrder>(),
            Ok(MatchOrder::LongestFirst)
        );
        assert!("random".parse::<MatchOrder>().is_err());
    }

    #[test]
    fn test_match_order_serde_names() {
        assert_eq!(
            serde_json::to_string(&MatchOrder::LongestFirst).expect("serialize"),
            "\"longest_first\""
        );
        assert_eq!(MatchOrder::default().to_string(), "declaration");
    }
}
