//! Preprocessor tokens.
//!
//! The macro engine has its own token type: unlike the declaration
//! scanner it keeps whitespace (as single `Space` tokens), recognizes the
//! `#` / `##` operators and `__VA_ARGS__` / `__VA_OPT__`, and has a
//! zero-width `Placemarker` standing in for an empty argument so `#` and
//! `##` have something to consume.

use crate::diag::{Diagnostic, Loc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PTokKind {
    Ident,
    CharLit,
    NumLit,
    StrLit,
    Punct,
    Other,
    Space,
    Placemarker,
    /// `#`
    Stringify,
    /// `##`
    Concat,
    VaArgs,
    VaOpt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PToken {
    pub kind: PTokKind,
    pub text: String,
    pub loc: Loc,
    /// Produced by parameter substitution or nested expansion.
    pub is_substituted: bool,
    /// Named a macro already being expanded; will never expand again.
    pub ineligible: bool,
}

impl PToken {
    pub fn new(kind: PTokKind, text: impl Into<String>, loc: Loc) -> Self {
        PToken {
            kind,
            text: text.into(),
            loc,
            is_substituted: false,
            ineligible: false,
        }
    }

    pub fn space(loc: Loc) -> Self {
        PToken::new(PTokKind::Space, " ", loc)
    }

    pub fn placemarker(loc: Loc) -> Self {
        PToken::new(PTokKind::Placemarker, "", loc)
    }

    pub fn is_space(&self) -> bool {
        self.kind == PTokKind::Space
    }

    pub fn is_placemarker(&self) -> bool {
        self.kind == PTokKind::Placemarker
    }
}

impl fmt::Display for PToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Tokenizes preprocessor text. `base_col` offsets the recorded columns so
/// tokens lexed from the middle of a command line keep their true
/// positions.
pub fn plex(text: &str, base_col: usize) -> Result<Vec<PToken>, Diagnostic> {
    let chars: Vec<char> = text.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let col = base_col + i;

        if c.is_whitespace() {
            let start = i;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            toks.push(PToken::space(Loc::new(0, base_col + start, base_col + i - 1)));
            continue;
        }

        if c == '#' {
            if chars.get(i + 1) == Some(&'#') {
                toks.push(PToken::new(
                    PTokKind::Concat,
                    "##",
                    Loc::new(0, col, col + 1),
                ));
                i += 2;
            } else {
                toks.push(PToken::new(PTokKind::Stringify, "#", Loc::col(0, col)));
                i += 1;
            }
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let kind = match text.as_str() {
                "__VA_ARGS__" => PTokKind::VaArgs,
                "__VA_OPT__" => PTokKind::VaOpt,
                _ => PTokKind::Ident,
            };
            toks.push(PToken::new(
                kind,
                text,
                Loc::new(0, base_col + start, base_col + i - 1),
            ));
            continue;
        }

        // pp-number: digits possibly mixed with letters, dots, and
        // exponent signs.
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let start = i;
            while i < chars.len() {
                let ch = chars[i];
                if ch.is_ascii_alphanumeric() || ch == '.' || ch == '\'' {
                    i += 1;
                } else if (ch == '+' || ch == '-')
                    && matches!(chars.get(i.wrapping_sub(1)), Some('e' | 'E' | 'p' | 'P'))
                {
                    i += 1;
                } else {
                    break;
                }
            }
            toks.push(PToken::new(
                PTokKind::NumLit,
                chars[start..i].iter().collect::<String>(),
                Loc::new(0, base_col + start, base_col + i - 1),
            ));
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            let start = i;
            i += 1;
            loop {
                match chars.get(i) {
                    None => {
                        let what = if quote == '"' {
                            "unterminated string literal"
                        } else {
                            "unterminated character literal"
                        };
                        return Err(Diagnostic::error(Loc::col(0, base_col + start), what));
                    }
                    Some('\\') => {
                        i += 2;
                    }
                    Some(ch) if *ch == quote => {
                        i += 1;
                        break;
                    }
                    Some(_) => i += 1,
                }
            }
            let end = i.min(chars.len());
            toks.push(PToken::new(
                if quote == '"' {
                    PTokKind::StrLit
                } else {
                    PTokKind::CharLit
                },
                chars[start..end].iter().collect::<String>(),
                Loc::new(0, base_col + start, base_col + end - 1),
            ));
            continue;
        }

        if c.is_ascii_punctuation() {
            toks.push(PToken::new(PTokKind::Punct, c.to_string(), Loc::col(0, col)));
            i += 1;
            continue;
        }

        toks.push(PToken::new(PTokKind::Other, c.to_string(), Loc::col(0, col)));
        i += 1;
    }

    Ok(toks)
}

/// Renders a token list back to text. Adjacent tokens print with no extra
/// separation; spacing comes from `Space` tokens.
pub fn tokens_to_string(toks: &[PToken]) -> String {
    let mut out = String::new();
    for t in toks {
        out.push_str(&t.text);
    }
    out
}

/// Implements the `#` operator's escaping: the spelling of `toks` with
/// whitespace normalized to single spaces and trimmed, with `"` and `\`
/// escaped, wrapped in quotes.
pub fn stringify(toks: &[PToken]) -> String {
    let mut body = String::new();
    let mut pending_space = false;
    for t in toks {
        if t.is_space() {
            if !body.is_empty() {
                pending_space = true;
            }
            continue;
        }
        if t.is_placemarker() {
            continue;
        }
        if pending_space {
            body.push(' ');
            pending_space = false;
        }
        match t.kind {
            PTokKind::StrLit | PTokKind::CharLit => {
                for ch in t.text.chars() {
                    if ch == '"' || ch == '\\' {
                        body.push('\\');
                    }
                    body.push(ch);
                }
            }
            _ => body.push_str(&t.text),
        }
    }
    format!("\"{}\"", body)
}

/// Undoes [`stringify`]: parses the quoted text back into tokens.
pub fn destringify(text: &str) -> Result<Vec<PToken>, Diagnostic> {
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| Diagnostic::error_no_loc("not a string literal"))?;
    let mut unescaped = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                unescaped.push(next);
            }
        } else {
            unescaped.push(c);
        }
    }
    plex(&unescaped, 0)
}

/// Drops leading and trailing whitespace tokens.
pub fn trim_spaces(toks: &mut Vec<PToken>) {
    while toks.first().is_some_and(|t| t.is_space()) {
        toks.remove(0);
    }
    while toks.last().is_some_and(|t| t.is_space()) {
        toks.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(toks: &[PToken]) -> Vec<String> {
        toks.iter().map(|t| t.text.clone()).collect()
    }

    #[test]
    fn test_plex_basics() {
        let toks = plex("(x) * 2", 0).unwrap();
        assert_eq!(texts(&toks), vec!["(", "x", ")", " ", "*", " ", "2"]);
    }

    #[test]
    fn test_plex_operators() {
        let toks = plex("#x ## y", 0).unwrap();
        assert_eq!(toks[0].kind, PTokKind::Stringify);
        assert_eq!(toks[3].kind, PTokKind::Concat);
    }

    #[test]
    fn test_plex_va_tokens() {
        let toks = plex("__VA_ARGS__ __VA_OPT__", 0).unwrap();
        assert_eq!(toks[0].kind, PTokKind::VaArgs);
        assert_eq!(toks[2].kind, PTokKind::VaOpt);
    }

    #[test]
    fn test_plex_columns_with_base() {
        let toks = plex("ab cd", 10).unwrap();
        assert_eq!(toks[0].loc, Loc::new(0, 10, 11));
        assert_eq!(toks[2].loc, Loc::new(0, 13, 14));
    }

    #[test]
    fn test_space_runs_collapse() {
        let toks = plex("a    b", 0).unwrap();
        assert_eq!(toks.len(), 3);
        assert!(toks[1].is_space());
    }

    #[test]
    fn test_stringify_normalizes_space() {
        let toks = plex("  2   +  3 ", 0).unwrap();
        assert_eq!(stringify(&toks), "\"2 + 3\"");
    }

    #[test]
    fn test_stringify_escapes() {
        let toks = plex(r#"say "hi\there""#, 0).unwrap();
        let s = stringify(&toks);
        assert!(s.starts_with("\"say \\\""));
        assert!(s.contains("\\\\"));
    }

    #[test]
    fn test_destringify_round_trip() {
        let toks = plex("a + \"s\"", 0).unwrap();
        let s = stringify(&toks);
        let back = destringify(&s).unwrap();
        let orig: Vec<&PToken> = toks.iter().filter(|t| !t.is_space()).collect();
        let round: Vec<&PToken> = back.iter().filter(|t| !t.is_space()).collect();
        assert_eq!(orig.len(), round.len());
        for (a, b) in orig.iter().zip(round.iter()) {
            assert_eq!(a.text, b.text);
        }
    }

    #[test]
    fn test_trim_spaces() {
        let mut toks = plex("  a b  ", 0).unwrap();
        trim_spaces(&mut toks);
        assert_eq!(tokens_to_string(&toks), "a b");
    }

    #[test]
    fn test_unterminated_string() {
        assert!(plex("\"abc", 0).is_err());
    }
}
