//! Parsing of `WWW-Authenticate: Bearer ...` challenges.
//!
//! Servers following RFC 6750 describe a rejected token as
//! `Bearer error="invalid_token", error_description="The access token expired"`.

use std::iter::Peekable;
use std::str::Chars;

/// Auth-params of a Bearer challenge. Unknown params are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl BearerChallenge {
    /// Parse a single challenge. Returns `None` unless the scheme is Bearer.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = match header.find(char::is_whitespace) {
            Some(i) => (&header[..i], &header[i..]),
            None => (header, ""),
        };
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut challenge = Self::default();
        for (key, value) in parse_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => challenge.realm = Some(value),
                "scope" => challenge.scope = Some(value),
                "error" => challenge.error = Some(value),
                "error_description" => challenge.error_description = Some(value),
                _ => {}
            }
        }
        Some(challenge)
    }

    /// Human-readable reason: the description, else the error code.
    /// A challenge without a non-empty `error` carries no reason.
    pub fn reason(&self) -> Option<&str> {
        let code = self.error.as_deref().filter(|c| !c.is_empty())?;
        Some(
            self.error_description
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or(code),
        )
    }
}

fn skip_while(chars: &mut Peekable<Chars<'_>>, pred: impl Fn(char) -> bool) {
    while chars.peek().is_some_and(|c| pred(*c)) {
        chars.next();
    }
}

fn take_while(chars: &mut Peekable<Chars<'_>>, pred: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(c) = chars.peek().copied() {
        if !pred(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn take_quoted(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Split `key=value, key="quoted value"` into pairs, skipping anything malformed.
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        skip_while(&mut chars, |c| c.is_whitespace() || c == ',');
        if chars.peek().is_none() {
            break;
        }

        let key = take_while(&mut chars, |c| c != '=' && c != ',' && !c.is_whitespace());
        skip_while(&mut chars, char::is_whitespace);
        if chars.peek() != Some(&'=') {
            continue;
        }
        chars.next();
        skip_while(&mut chars, char::is_whitespace);

        let value = if chars.peek() == Some(&'"') {
            chars.next();
            take_quoted(&mut chars)
        } else {
            take_while(&mut chars, |c| c != ',' && !c.is_whitespace())
        };

        if !key.is_empty() {
            params.push((key, value));
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_and_description() {
        let c = BearerChallenge::parse(
            r#"Bearer error="invalid_token", error_description="Token expired""#,
        )
        .unwrap();
        assert_eq!(c.error.as_deref(), Some("invalid_token"));
        assert_eq!(c.error_description.as_deref(), Some("Token expired"));
        assert_eq!(c.reason(), Some("Token expired"));
    }

    #[test]
    fn test_reason_falls_back_to_code() {
        let c = BearerChallenge::parse(r#"Bearer error="invalid_token""#).unwrap();
        assert_eq!(c.reason(), Some("invalid_token"));
    }

    #[test]
    fn test_bare_scheme_has_no_reason() {
        let c = BearerChallenge::parse("Bearer").unwrap();
        assert_eq!(c, BearerChallenge::default());
        assert_eq!(c.reason(), None);
    }

    #[test]
    fn test_description_without_error_has_no_reason() {
        let c = BearerChallenge::parse(r#"Bearer error_description="whatever""#).unwrap();
        assert_eq!(c.reason(), None);
    }

    #[test]
    fn test_empty_description_falls_back_to_code() {
        let c = BearerChallenge::parse(r#"Bearer error="invalid_token", error_description="""#)
            .unwrap();
        assert_eq!(c.reason(), Some("invalid_token"));
    }

    #[test]
    fn test_empty_error_has_no_reason() {
        let c = BearerChallenge::parse(r#"Bearer error="""#).unwrap();
        assert_eq!(c.error.as_deref(), Some(""));
        assert_eq!(c.reason(), None);

        let c = BearerChallenge::parse(r#"Bearer error="", error_description="Token expired""#)
            .unwrap();
        assert_eq!(c.reason(), None);
    }

    #[test]
    fn test_other_schemes_ignored() {
        assert_eq!(BearerChallenge::parse(r#"Basic realm="api""#), None);
        assert_eq!(BearerChallenge::parse(""), None);
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let c = BearerChallenge::parse(r#"bearer ERROR=invalid_token"#).unwrap();
        assert_eq!(c.error.as_deref(), Some("invalid_token"));
    }

    #[test]
    fn test_quoted_values_with_commas_and_escapes() {
        let c = BearerChallenge::parse(
            r#"Bearer realm="rules, lawyer", error="invalid_token", error_description="say \"hi\"""#,
        )
        .unwrap();
        assert_eq!(c.realm.as_deref(), Some("rules, lawyer"));
        assert_eq!(c.error_description.as_deref(), Some(r#"say "hi""#));
    }

    #[test]
    fn test_malformed_params_are_skipped() {
        let c = BearerChallenge::parse(r#"Bearer junk, error = "insufficient_scope" , scope=read"#)
            .unwrap();
        assert_eq!(c.error.as_deref(), Some("insufficient_scope"));
        assert_eq!(c.scope.as_deref(), Some("read"));
    }
}
