//! Name-resolution utility (component F): the single rule used to split a
//! flat catalog name back into its server (or skill) origin.

/// Result of splitting a requested name on the first `__`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedName<'a> {
    /// The prefix before the first `__`, when one exists at position > 0.
    pub server: Option<&'a str>,
    /// Everything else: the suffix after the prefix, or the whole name.
    pub actual: &'a str,
}

/// Splits `name` at the first `__` occurrence (§4.F). A `__` at position 0
/// or absent entirely means there is no server prefix.
pub fn parse(name: &str) -> ParsedName<'_> {
    if let Some(pos) = name.find("__") {
        if pos > 0 {
            return ParsedName {
                server: Some(&name[..pos]),
                actual: &name[pos + 2..],
            };
        }
    }

    ParsedName { server: None, actual: name }
}

/// Builds the `{server}__{native}` display form.
pub fn prefixed(server: &str, native: &str) -> String {
    format!("{server}__{native}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_has_no_server() {
        let parsed = parse("");
        assert_eq!(parsed, ParsedName { server: None, actual: "" });
    }

    #[test]
    fn leading_separator_has_no_server() {
        let parsed = parse("__x");
        assert_eq!(parsed, ParsedName { server: None, actual: "__x" });
    }

    #[test]
    fn splits_at_first_separator_only() {
        let parsed = parse("a__b__c");
        assert_eq!(parsed, ParsedName { server: Some("a"), actual: "b__c" });
    }

    #[test]
    fn name_without_separator_has_no_server() {
        let parsed = parse("plain");
        assert_eq!(parsed, ParsedName { server: None, actual: "plain" });
    }

    #[test]
    fn prefixed_builds_expected_form() {
        assert_eq!(prefixed("A", "shared"), "A__shared");
    }
}
