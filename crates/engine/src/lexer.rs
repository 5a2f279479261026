//! Token scanner for command input.
//!
//! Tokenizes one input line (or file line) into identifiers, numbers,
//! character/string literals, and punctuators, each carrying its column
//! span for diagnostics. Comments are skipped; an unterminated block
//! comment, string, or character literal is an error, as is a malformed
//! integer literal.
//!
//! Trigraph and digraph replacement is applied before scanning when the
//! corresponding option is enabled.

use crate::diag::{Diagnostic, Loc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokKind {
    Ident,
    Number,
    CharLit,
    StrLit,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokKind,
    pub text: String,
    /// Parsed value for `Number` tokens.
    pub value: Option<u64>,
    pub loc: Loc,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokKind::Ident
    }
}

/// Punctuators, longest first so the scanner can match greedily.
const PUNCTUATORS: &[&str] = &[
    "<<=", ">>=", "<=>", "->*", "...", "##", "::", "->", "++", "--", "<<", ">>", "<=", ">=", "==",
    "!=", "+=", "-=", "*=", "/=", "%=", "^=", "&=", "|=", "&&", "||", "[[", "]]", "#", "(", ")",
    "[", "]", "{", "}", "*", "&", ",", ";", ":", "=", "<", ">", "+", "-", "/", "%", "^", "|", "~",
    "!", "?", ".",
];

/// Trigraph sequences `??X` and their replacements.
const TRIGRAPHS: &[(char, char)] = &[
    ('=', '#'),
    ('(', '['),
    (')', ']'),
    ('<', '{'),
    ('>', '}'),
    ('/', '\\'),
    ('\'', '^'),
    ('!', '|'),
    ('-', '~'),
];

/// Digraph tokens and their primary spellings.
const DIGRAPHS: &[(&str, &str)] = &[("<%", "{"), ("%>", "}"), ("<:", "["), (":>", "]"), ("%:", "#")];

/// Replaces trigraphs in place. Columns shift, which matches how a real
/// translator sees the line after phase 1.
pub fn replace_trigraphs(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i] == '?' && chars[i + 1] == '?' {
            if let Some((_, repl)) = TRIGRAPHS.iter().find(|(t, _)| *t == chars[i + 2]) {
                out.push(*repl);
                i += 3;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Scanner options. `digraphs`/`trigraphs` are driven by the `set`
/// command; `hyphen_words` is enabled when lexing English command tails so
/// words like `non-returning` and `non-empty` stay single tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexOpts {
    pub digraphs: bool,
    pub trigraphs: bool,
    pub hyphen_words: bool,
}

impl LexOpts {
    pub fn english(self) -> LexOpts {
        LexOpts {
            hyphen_words: true,
            ..self
        }
    }
}

/// Tokenizes one line of input.
pub fn tokenize(line: &str, opts: LexOpts) -> Result<Vec<Token>, Diagnostic> {
    let line = if opts.trigraphs {
        replace_trigraphs(line)
    } else {
        line.to_string()
    };
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Line comment.
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            break;
        }
        // Block comment; must close on the same line.
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let start = i;
            i += 2;
            loop {
                if i + 1 >= chars.len() {
                    return Err(Diagnostic::error(
                        Loc::col(0, start),
                        "unterminated comment",
                    ));
                }
                if chars[i] == '*' && chars[i + 1] == '/' {
                    i += 2;
                    break;
                }
                i += 1;
            }
            continue;
        }

        // Identifier. In English mode a hyphen joins two word characters
        // (`non-empty`), never leads or trails.
        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() {
                let ch = chars[i];
                if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                    i += 1;
                } else if opts.hyphen_words
                    && ch == '-'
                    && chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic())
                {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokKind::Ident,
                text: chars[start..i].iter().collect(),
                value: None,
                loc: Loc::new(0, start, i - 1),
            });
            continue;
        }

        // Number.
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric() || chars[i] == '\'' || chars[i] == '_')
            {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let loc = Loc::new(0, start, i - 1);
            let value = parse_int(&text)
                .ok_or_else(|| Diagnostic::error(loc, format!("\"{}\": invalid integer", text)))?;
            tokens.push(Token {
                kind: TokKind::Number,
                text,
                value: Some(value),
                loc,
            });
            continue;
        }

        // String and character literals.
        if c == '"' || c == '\'' {
            let quote = c;
            let start = i;
            i += 1;
            let mut text = String::new();
            text.push(quote);
            loop {
                if i >= chars.len() {
                    let what = if quote == '"' {
                        "unterminated string literal"
                    } else {
                        "unterminated character literal"
                    };
                    return Err(Diagnostic::error(Loc::new(0, start, chars.len() - 1), what));
                }
                let ch = chars[i];
                text.push(ch);
                i += 1;
                if ch == '\\' {
                    if i < chars.len() {
                        text.push(chars[i]);
                        i += 1;
                    }
                    continue;
                }
                if ch == quote {
                    break;
                }
            }
            tokens.push(Token {
                kind: if quote == '"' {
                    TokKind::StrLit
                } else {
                    TokKind::CharLit
                },
                text,
                value: None,
                loc: Loc::new(0, start, i - 1),
            });
            continue;
        }

        // Digraphs, when enabled.
        if opts.digraphs {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            if let Some((_, primary)) = DIGRAPHS.iter().find(|(d, _)| rest.starts_with(d)) {
                tokens.push(Token {
                    kind: TokKind::Punct,
                    text: (*primary).to_string(),
                    value: None,
                    loc: Loc::new(0, i, i + 1),
                });
                i += 2;
                continue;
            }
        }

        // Punctuators, longest match first.
        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        if let Some(p) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            tokens.push(Token {
                kind: TokKind::Punct,
                text: (*p).to_string(),
                value: None,
                loc: Loc::new(0, i, i + p.len() - 1),
            });
            i += p.len();
            continue;
        }

        return Err(Diagnostic::error(
            Loc::col(0, i),
            format!("'{}': unexpected character", c),
        ));
    }

    Ok(tokens)
}

/// Parses a C integer literal: decimal, octal (leading 0), hex (0x), or
/// binary (0b), with optional `'` separators and u/l/z suffixes.
pub fn parse_int(text: &str) -> Option<u64> {
    let cleaned: String = text.chars().filter(|c| *c != '\'' && *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    let body = lower.trim_end_matches(['u', 'l', 'z']);
    if body.is_empty() {
        return None;
    }
    if let Some(hex) = body.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = body.strip_prefix("0b") {
        return u64::from_str_radix(bin, 2).ok();
    }
    if body.len() > 1 && body.starts_with('0') {
        return u64::from_str_radix(&body[1..], 8).ok();
    }
    body.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(s: &str) -> Vec<Token> {
        tokenize(s, LexOpts::default()).unwrap()
    }

    #[test]
    fn test_idents_and_puncts() {
        let toks = lex("int (*x)[5]");
        let texts: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["int", "(", "*", "x", ")", "[", "5", "]"]);
    }

    #[test]
    fn test_columns() {
        let toks = lex("int  x");
        assert_eq!(toks[0].loc, Loc::new(0, 0, 2));
        assert_eq!(toks[1].loc, Loc::new(0, 5, 5));
    }

    #[test]
    fn test_greedy_puncts() {
        let toks = lex("a<<=b :: c->*d ...");
        let texts: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "<<=", "b", "::", "c", "->*", "d", "..."]);
    }

    #[test]
    fn test_int_values() {
        assert_eq!(lex("42")[0].value, Some(42));
        assert_eq!(lex("0x10")[0].value, Some(16));
        assert_eq!(lex("010")[0].value, Some(8));
        assert_eq!(lex("5u")[0].value, Some(5));
    }

    #[test]
    fn test_bad_int() {
        let err = tokenize("09", LexOpts::default()).unwrap_err();
        assert!(err.message.contains("invalid integer"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\"abc", LexOpts::default()).unwrap_err();
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = tokenize("int /* x", LexOpts::default()).unwrap_err();
        assert!(err.message.contains("unterminated comment"));
    }

    #[test]
    fn test_string_with_escapes() {
        let toks = lex(r#""a\"b""#);
        assert_eq!(toks[0].kind, TokKind::StrLit);
        assert_eq!(toks[0].text, r#""a\"b""#);
    }

    #[test]
    fn test_line_comment_ends_scan() {
        let toks = lex("int x // trailing");
        assert_eq!(toks.len(), 2);
    }

    #[test]
    fn test_trigraphs() {
        assert_eq!(replace_trigraphs("??(5??)"), "[5]");
        let toks = tokenize(
            "x??(3??)",
            LexOpts {
                trigraphs: true,
                ..LexOpts::default()
            },
        )
        .unwrap();
        let texts: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["x", "[", "3", "]"]);
    }

    #[test]
    fn test_hyphen_words() {
        let toks = tokenize("non-empty array", LexOpts::default().english()).unwrap();
        let texts: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["non-empty", "array"]);
        // Without English mode the hyphen is a punctuator.
        let toks = tokenize("non-empty", LexOpts::default()).unwrap();
        assert_eq!(toks.len(), 3);
    }

    #[test]
    fn test_digraphs() {
        let toks = tokenize(
            "x<:3:>",
            LexOpts {
                digraphs: true,
                ..LexOpts::default()
            },
        )
        .unwrap();
        let texts: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["x", "[", "3", "]"]);
    }
}
