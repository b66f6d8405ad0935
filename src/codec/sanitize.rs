/// Substitutions applied when escaping. `&` must stay first so that the
/// entities produced by later rows are never re-escaped.
const FULL_TABLE: [(&str, &str); 5] = [
    ("&", "&amp;"),
    ("<", "&lt;"),
    (">", "&gt;"),
    ("\"", "&quot;"),
    ("'", "&apos;"),
];

/// Chevrons only, for content that may legitimately carry raw `&` and quotes.
const LIGHT_TABLE: [(&str, &str); 2] = [("<", "&lt;"), (">", "&gt;")];

/// (Un)escapes XML character entities.
///
/// Rows are applied one after the other in declaration order when escaping,
/// and in reverse order when `reverse` is set, so `&amp;` is always decoded
/// last and `&amp;lt;` comes back as `&lt;`.
pub fn sanitize(text: &str, reverse: bool, light: bool) -> String {
    let table: &[(&str, &str)] = if light { &LIGHT_TABLE } else { &FULL_TABLE };

    if reverse {
        table
            .iter()
            .rev()
            .fold(text.to_string(), |acc, (plain, entity)| acc.replace(entity, plain))
    } else {
        table
            .iter()
            .fold(text.to_string(), |acc, (plain, entity)| acc.replace(plain, entity))
    }
}

/// Escapes text content for an XML element body.
pub fn escape(text: &str) -> String {
    sanitize(text, false, false)
}
