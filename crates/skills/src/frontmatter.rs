//! Front-matter parser (component D): a narrow, line-oriented YAML subset,
//! implemented explicitly rather than via a full YAML library, since the
//! subset's dedent-termination behavior is exactly what callers depend on.

use std::collections::HashMap;

/// Parses `text` for a leading `---`-delimited front-matter block.
///
/// Returns `(None, text)` unchanged when no front-matter block is present,
/// and `(Some(fields), body)` — with `body` being everything after the
/// closing `---` line — otherwise. A present-but-empty block (no non-blank
/// lines between the delimiters) yields `(None, body)`.
pub fn parse(text: &str) -> (Option<HashMap<String, String>>, String) {
    let trimmed = text.trim_start();

    if !trimmed.starts_with("---") {
        return (None, text.to_string());
    }

    let after_marker = &trimmed[3..];
    match after_marker.chars().next() {
        None | Some('\n') | Some('\r') => {}
        _ => return (None, text.to_string()),
    }

    let rest = after_marker.strip_prefix("\r\n").or_else(|| after_marker.strip_prefix('\n')).unwrap_or(after_marker);

    let mut fm_lines: Vec<&str> = Vec::new();
    let mut remaining = rest;
    let mut closed = false;

    while !remaining.is_empty() {
        let (raw_line, next, had_newline) = match remaining.find('\n') {
            Some(pos) => (&remaining[..pos], &remaining[pos + 1..], true),
            None => (remaining, "", false),
        };
        let line = raw_line.trim_end_matches('\r');

        if line == "---" {
            closed = true;
            remaining = next;
            break;
        }

        fm_lines.push(line);
        remaining = next;

        if !had_newline {
            break;
        }
    }

    if !closed {
        return (None, text.to_string());
    }

    let body = remaining.to_string();
    let fields = parse_fields(&fm_lines);
    (fields, body)
}

fn parse_fields(lines: &[&str]) -> Option<HashMap<String, String>> {
    if lines.iter().all(|l| l.trim().is_empty()) {
        return None;
    }

    let mut map = HashMap::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            // Not a column-0 key; outside the subset this parser models.
            i += 1;
            continue;
        }

        let Some(colon) = line.find(':') else {
            i += 1;
            continue;
        };

        let key = line[..colon].trim().to_string();
        let value_part = line[colon + 1..].trim();

        if matches!(value_part, "|" | "|-" | ">" | ">-") {
            i += 1;
            let (value, consumed) = parse_block_scalar(value_part, &lines[i..]);
            i += consumed;
            map.insert(key, value);
        } else {
            map.insert(key, strip_quotes(value_part));
            i += 1;
        }
    }

    Some(map)
}

fn parse_block_scalar(marker: &str, lines: &[&str]) -> (String, usize) {
    let mut base_indent: Option<usize> = None;
    let mut collected: Vec<&str> = Vec::new();
    let mut consumed = 0;

    for line in lines {
        if line.trim().is_empty() {
            collected.push("");
            consumed += 1;
            continue;
        }

        let indent = line.len() - line.trim_start().len();
        let base = *base_indent.get_or_insert(indent);

        if indent < base {
            break;
        }

        collected.push(&line[base..]);
        consumed += 1;
    }

    let joined = if marker.starts_with('|') {
        collected.join("\n")
    } else {
        collected.join(" ")
    };

    let value = match marker {
        "|" | ">" => joined.trim_end().to_string(),
        _ => joined.trim().to_string(),
    };

    (value, consumed)
}

fn strip_quotes(s: &str) -> String {
    let bytes = s.as_bytes();
    if s.len() >= 2 {
        let first = bytes[0];
        let last = bytes[s.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// Whether `fields` has the shape required of a skill (§4.D): non-empty
/// `name` and non-empty `description`.
pub fn is_valid_skill(fields: &HashMap<String, String>) -> bool {
    fields.get("name").is_some_and(|v| !v.is_empty()) && fields.get("description").is_some_and(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_front_matter_returns_none_and_original_text() {
        let (fm, body) = parse("# just a heading\ntext");
        assert!(fm.is_none());
        assert_eq!(body, "# just a heading\ntext");
    }

    #[test]
    fn empty_block_yields_none() {
        let (fm, body) = parse("---\n---\nbody text");
        assert!(fm.is_none());
        assert_eq!(body, "body text");
    }

    #[test]
    fn simple_key_values_with_quote_stripping() {
        let (fm, body) = parse("---\nname: pdf-reader\ndescription: \"Reads PDFs\"\n---\nThe body.");
        let fm = fm.unwrap();
        assert_eq!(fm["name"], "pdf-reader");
        assert_eq!(fm["description"], "Reads PDFs");
        assert_eq!(body, "The body.");
    }

    #[test]
    fn literal_block_preserves_newlines_and_right_trims() {
        let text = "---\nname: x\ninstructions: |\n  line one\n  line two\n\n  line three\nnext: value\n---\nbody";
        let (fm, _) = parse(text);
        let fm = fm.unwrap();
        assert_eq!(fm["instructions"], "line one\nline two\n\nline three");
        assert_eq!(fm["next"], "value");
    }

    #[test]
    fn literal_block_strip_variant_fully_trims() {
        let text = "---\ninstructions: |-\n  line one\n  line two\n---\nbody";
        let (fm, _) = parse(text);
        assert_eq!(fm.unwrap()["instructions"], "line one\nline two");
    }

    #[test]
    fn folded_block_joins_with_spaces() {
        let text = "---\ninstructions: >\n  line one\n  line two\n---\nbody";
        let (fm, _) = parse(text);
        assert_eq!(fm.unwrap()["instructions"], "line one line two");
    }

    #[test]
    fn folded_block_strip_variant_fully_trims() {
        let text = "---\ninstructions: >-\n  line one\n  line two\n---\nbody";
        let (fm, _) = parse(text);
        assert_eq!(fm.unwrap()["instructions"], "line one line two");
    }

    #[test]
    fn block_terminates_on_dedented_line() {
        let text = "---\ninstructions: |\n  inner line\nafter: plain\n---\nbody";
        let (fm, _) = parse(text);
        let fm = fm.unwrap();
        assert_eq!(fm["instructions"], "inner line");
        assert_eq!(fm["after"], "plain");
    }

    #[test]
    fn valid_skill_requires_name_and_description() {
        let mut fm = HashMap::new();
        assert!(!is_valid_skill(&fm));
        fm.insert("name".to_string(), "x".to_string());
        assert!(!is_valid_skill(&fm));
        fm.insert("description".to_string(), "y".to_string());
        assert!(is_valid_skill(&fm));
    }

    #[test]
    fn unterminated_front_matter_is_treated_as_absent() {
        let (fm, body) = parse("---\nname: x\nno closing delimiter");
        assert!(fm.is_none());
        assert_eq!(body, "---\nname: x\nno closing delimiter");
    }
}
