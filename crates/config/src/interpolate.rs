//! `${VAR}` environment-variable interpolation (§4.A).
//!
//! Undefined variables are left verbatim in the output and a warning is
//! logged; this mirrors the teacher's `expand_dynamic_strings` walk in
//! `jrmatherly-nexus/crates/config/src/loader.rs`, but with `${VAR}`
//! syntax instead of `{{ env.VAR }}`, since that's what §4.A specifies.

use std::env;

/// Interpolates every `${VAR}` occurrence in `input` using environment
/// variables, via `lookup`. Variables not found in `lookup` are left as the
/// literal `${VAR}` text and a warning is logged with `context` describing
/// where the value came from (for diagnostics).
pub fn interpolate_with(input: &str, context: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = input[i + 2..].find('}') {
                let name = &input[i + 2..i + 2 + end];

                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        log::warn!("undefined environment variable '${{{name}}}' in {context}, leaving literal");
                        out.push_str(&input[i..i + 2 + end + 1]);
                    }
                }

                i += 2 + end + 1;
                continue;
            }
        }

        let ch_len = input[i..].chars().next().map(char::len_utf8).unwrap_or(1);
        out.push_str(&input[i..i + ch_len]);
        i += ch_len;
    }

    out
}

/// Interpolates using the real process environment.
pub fn interpolate(input: &str, context: &str) -> String {
    interpolate_with(input, context, |name| env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_map(map: &HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> + '_ {
        move |name| map.get(name).map(|v| v.to_string())
    }

    #[test]
    fn substitutes_known_variable() {
        let mut map = HashMap::new();
        map.insert("FOO", "bar");

        let result = interpolate_with("value=${FOO}!", "test", with_map(&map));
        assert_eq!(result, "value=bar!");
    }

    #[test]
    fn leaves_unknown_variable_literal() {
        let map = HashMap::new();
        let result = interpolate_with("value=${MISSING}", "test", with_map(&map));
        assert_eq!(result, "value=${MISSING}");
    }

    #[test]
    fn handles_multiple_and_adjacent_placeholders() {
        let mut map = HashMap::new();
        map.insert("A", "1");
        map.insert("B", "2");

        let result = interpolate_with("${A}${B}-${A}", "test", with_map(&map));
        assert_eq!(result, "12-1");
    }

    #[test]
    fn ignores_unterminated_placeholder() {
        let map = HashMap::new();
        let result = interpolate_with("value=${OPEN", "test", with_map(&map));
        assert_eq!(result, "value=${OPEN");
    }
}
