//! Character escaping shared by serialization and canonicalization.
//!
//! Parsing normalizes literal line breaks (and, in attribute values, tabs),
//! so any `\r`, `\n` or `\t` still present came from a character reference
//! and is written back as one.

/// Escapes character data.
pub(crate) fn text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\r', "&#xD;")
}

/// Escapes a double-quoted attribute value.
pub(crate) fn attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
        .replace('\t', "&#x9;")
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carriage_returns_become_references() {
        assert_eq!(text("a\r\nb & <c>"), "a&#xD;\nb &amp; &lt;c&gt;");
        assert_eq!(attr("a\tb\nc\"d"), "a&#x9;b&#xA;c&quot;d");
    }
}
