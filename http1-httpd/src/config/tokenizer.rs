/// Splits a directive line on whitespace. A run wrapped in double or single
/// quotes is one token with the quotes removed, so
/// `DocumentRoot "/srv/my site"` yields `["DocumentRoot", "/srv/my site"]`.
///
/// A quote with no partner is skipped.
pub fn split_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = line;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        }

        if c == '"' || c == '\'' {
            match rest[1..].find(c) {
                Some(end) => {
                    tokens.push(rest[1..end + 1].to_owned());
                    rest = &rest[end + 2..];
                }
                None => rest = &rest[1..],
            }
            continue;
        }

        let end = rest
            .find(|c: char| c.is_whitespace() || c == '"' || c == '\'')
            .unwrap_or(rest.len());
        tokens.push(rest[..end].to_owned());
        rest = &rest[end..];
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(
            split_tokens("ScriptAlias /cgi-bin/   /srv/cgi-bin/"),
            vec!["ScriptAlias", "/cgi-bin/", "/srv/cgi-bin/"]
        );
        assert!(split_tokens("   ").is_empty());
    }

    #[test]
    fn test_quoted() {
        assert_eq!(
            split_tokens(r#"DocumentRoot "/srv/my site/""#),
            vec!["DocumentRoot", "/srv/my site/"]
        );
        assert_eq!(
            split_tokens("AuthName 'This is the realm'"),
            vec!["AuthName", "This is the realm"]
        );
        assert_eq!(split_tokens(r#"A """#), vec!["A", ""]);
        assert_eq!(
            split_tokens(r#"say"it's""#),
            vec!["say", "it's"]
        );
    }

    #[test]
    fn test_unbalanced_quote_is_skipped() {
        assert_eq!(split_tokens(r#"AuthName "open"#), vec!["AuthName", "open"]);
    }
}
