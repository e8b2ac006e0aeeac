//! Identifier sanitization and quoting for safely generated SQL.

/// Replace every character outside `[A-Za-z0-9_]` with `_`, lower-case the
/// result, and make sure it starts with a letter so it is always a valid
/// bare identifier. Truncated to 50 characters.
pub fn sanitize(id: &str) -> String {
    let mut out: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .to_lowercase();

    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out = format!("id_{}", out);
    } else if out.starts_with('_') {
        out = format!("id{}", out);
    }

    out.truncate(50);
    out
}

/// Quote an identifier for use in generated SQL (double quotes, `""`-escaped).
pub fn quote(id: &str) -> String {
    format!("\"{}\"", id.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified name (`schema.table` -> `"schema"."table"`).
pub fn quote_qualified(id: &str) -> String {
    if let Some((schema, rest)) = id.split_once('.') {
        format!("{}.{}", quote(schema), quote(rest))
    } else {
        quote(id)
    }
}

/// Split `schema.table` into its parts, defaulting the schema to "public".
pub fn split_qualified(id: &str) -> (&str, &str) {
    if let Some((schema, table)) = id.split_once('.') {
        (schema, table)
    } else {
        ("public", id)
    }
}

/// Un-quote a previously quoted identifier, reversing [`quote`].
pub fn unquote(quoted: &str) -> String {
    let trimmed = quoted.strip_prefix('"').and_then(|s| s.strip_suffix('"'));
    match trimmed {
        Some(inner) => inner.replace("\"\"", "\""),
        None => quoted.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize("my-schema.table"), "my_schema_table");
        assert_eq!(sanitize("Public"), "public");
    }

    #[test]
    fn test_sanitize_leading_digit() {
        assert_eq!(sanitize("1abc"), "id_1abc");
    }

    #[test]
    fn test_sanitize_leading_underscore() {
        assert_eq!(sanitize("_abc"), "id_abc");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize("My Weird Table!!");
        let twice = sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(100);
        assert_eq!(sanitize(&long).len(), 50);
    }

    #[test]
    fn test_quote_roundtrip() {
        for name in ["users", "my\"table", "weird name"] {
            assert_eq!(unquote(&quote(name)), name);
        }
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(quote_qualified("public.users"), "\"public\".\"users\"");
        assert_eq!(quote_qualified("users"), "\"users\"");
    }

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("public.users"), ("public", "users"));
        assert_eq!(split_qualified("users"), ("public", "users"));
    }
}
