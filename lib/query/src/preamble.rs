use regex::Regex;
use std::sync::LazyLock;

/// Matches the leading run of `define ...` directives and blank lines.
static PREAMBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\A(?:(?:define\b.*)?\n)*").unwrap());

/// Splits `raw` into the leading directive lines the SPARQL parser cannot consume and the
/// remaining query text.
///
/// The preamble is returned verbatim (including its line breaks) so it can be prepended to any
/// regenerated query text.
pub fn split_preamble(raw: &str) -> (&str, &str) {
    let end = PREAMBLE.find(raw).map_or(0, |m| m.end());
    raw.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_preamble() {
        let (preamble, query) = split_preamble("SELECT * { ?s ?p ?o }");
        assert_eq!(preamble, "");
        assert_eq!(query, "SELECT * { ?s ?p ?o }");
    }

    #[test]
    fn define_lines_are_split_off() {
        let raw = "define sql:select-option \"order\"\nDEFINE input:inference \"x\"\n\nSELECT * { ?s ?p ?o }";
        let (preamble, query) = split_preamble(raw);
        assert_eq!(
            preamble,
            "define sql:select-option \"order\"\nDEFINE input:inference \"x\"\n\n"
        );
        assert_eq!(query, "SELECT * { ?s ?p ?o }");
    }

    #[test]
    fn define_inside_query_is_kept() {
        let raw = "SELECT * {\ndefine\n}";
        let (preamble, query) = split_preamble(raw);
        assert_eq!(preamble, "");
        assert_eq!(query, raw);
    }

    #[test]
    fn word_starting_with_define_is_not_a_directive() {
        let raw = "defined\nSELECT * { ?s ?p ?o }";
        let (preamble, _) = split_preamble(raw);
        assert_eq!(preamble, "");
    }
}
