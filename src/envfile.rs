//! The flat `KEY=VALUE` text format used by the working file, backup
//! captures and remote snapshot plaintext.
//!
//! Parsing is deliberately forgiving: blank lines and `#` comments are
//! skipped, lines without `=` are ignored, and a single matching pair of
//! surrounding quotes is stripped without any escape processing. Keys and
//! values are trimmed, so the codec is not lossless for values that need
//! significant leading/trailing whitespace — a documented limitation of
//! the format, not something to patch around.
//!
//! Output is canonical: keys sorted ascending, values quoted only when
//! they contain whitespace or `#`, exactly one trailing newline.

use std::collections::HashMap;

/// In-memory representation of an environment-variable set. Used for
/// working-file content, snapshot plaintext and merge results alike.
pub type EnvMapping = HashMap<String, String>;

/// Parse env-file text into a mapping. Last occurrence of a duplicate
/// key wins.
pub fn parse(text: &str) -> EnvMapping {
    let mut vars = EnvMapping::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    vars
}

/// Strip one matching pair of surrounding `"` or `'`. No escape
/// processing happens inside the quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Serialize a mapping to canonical env-file text: keys sorted ascending
/// by ordinal comparison, one trailing newline. An empty mapping
/// serializes to a single newline.
pub fn format(vars: &EnvMapping) -> String {
    let mut keys: Vec<&String> = vars.keys().collect();
    keys.sort();

    let mut lines = Vec::with_capacity(keys.len());
    for key in keys {
        let value = &vars[key];
        if value.chars().any(char::is_whitespace) || value.contains('#') {
            lines.push(format!("{}=\"{}\"", key, value));
        } else {
            lines.push(format!("{}={}", key, value));
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> EnvMapping {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let parsed = parse("# comment\n\n  \nFOO=bar\n   # indented comment\n");
        assert_eq!(parsed, mapping(&[("FOO", "bar")]));
    }

    #[test]
    fn parse_ignores_lines_without_equals() {
        let parsed = parse("JUSTAWORD\nFOO=bar\n");
        assert_eq!(parsed, mapping(&[("FOO", "bar")]));
    }

    #[test]
    fn parse_splits_on_first_equals_and_trims() {
        let parsed = parse("  DATABASE_URL = postgres://localhost?a=b \n");
        assert_eq!(
            parsed,
            mapping(&[("DATABASE_URL", "postgres://localhost?a=b")])
        );
    }

    #[test]
    fn parse_strips_one_matching_quote_pair() {
        let parsed = parse("A=\"hello world\"\nB='single'\nC=\"mismatched'\nD=\"\"nested\"\"\n");
        assert_eq!(parsed["A"], "hello world");
        assert_eq!(parsed["B"], "single");
        assert_eq!(parsed["C"], "\"mismatched'");
        // only the outermost pair is stripped
        assert_eq!(parsed["D"], "\"nested\"");
    }

    #[test]
    fn parse_last_duplicate_wins() {
        let parsed = parse("KEY=first\nKEY=second\n");
        assert_eq!(parsed, mapping(&[("KEY", "second")]));
    }

    #[test]
    fn parse_allows_empty_values() {
        let parsed = parse("EMPTY=\n");
        assert_eq!(parsed, mapping(&[("EMPTY", "")]));
    }

    #[test]
    fn format_sorts_keys_and_ends_with_single_newline() {
        let out = format(&mapping(&[("B", "2"), ("A", "1"), ("C", "3")]));
        assert_eq!(out, "A=1\nB=2\nC=3\n");
    }

    #[test]
    fn format_quotes_whitespace_and_hash_values() {
        let out = format(&mapping(&[("MSG", "hello world"), ("TAG", "a#b")]));
        assert_eq!(out, "MSG=\"hello world\"\nTAG=\"a#b\"\n");
    }

    #[test]
    fn format_empty_mapping_is_single_newline() {
        assert_eq!(format(&EnvMapping::new()), "\n");
    }

    #[test]
    fn round_trip_preserves_plain_mappings() {
        let original = mapping(&[
            ("API_KEY", "abc123"),
            ("MESSAGE", "hello world"),
            ("EMPTY", ""),
            ("URL", "https://example.com/path?x=1#frag"),
        ]);
        assert_eq!(parse(&format(&original)), original);
    }
}
