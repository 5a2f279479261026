//! The options record and the `set` command.
//!
//! One instance lives on the session. Everything here is mutated only by
//! explicit `set` commands; `set` with no argument (or `set options`)
//! prints the current state.

use crate::diag::Diagnostic;
use crate::gibberish::Style;
use crate::lang::Lang;
use crate::lexer::{LexOpts, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorWhen {
    Auto,
    Never,
    Always,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub lang: Lang,
    /// Print `char const *` rather than `const char *`.
    pub east_const: bool,
    /// Retry an unrecognized command as `explain`.
    pub explain_by_default: bool,
    /// Echo each command before its output (useful for init files).
    pub echo_commands: bool,
    pub digraphs: bool,
    pub trigraphs: bool,
    pub color: ColorWhen,
    /// Dump the checked AST after each successful command.
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            lang: Lang::C23,
            east_const: true,
            explain_by_default: true,
            echo_commands: false,
            digraphs: false,
            trigraphs: false,
            color: ColorWhen::Auto,
            debug: false,
        }
    }
}

impl Options {
    pub fn style(&self) -> Style {
        Style {
            east_const: self.east_const,
        }
    }

    pub fn lex_opts(&self) -> LexOpts {
        LexOpts {
            digraphs: self.digraphs,
            trigraphs: self.trigraphs,
            hyphen_words: false,
        }
    }

    /// Applies one `set` command tail. Returns text to print, if any.
    pub fn set(&mut self, toks: &[Token]) -> Result<Option<String>, Diagnostic> {
        let Some(first) = toks.first() else {
            return Ok(Some(self.summary()));
        };
        let value = toks.get(1);
        let on = match value.map(|t| t.text.as_str()) {
            None | Some("on") => true,
            Some("off") => false,
            Some(other) if !matches!(first.text.as_str(), "color") => {
                return Err(Diagnostic::error(
                    value.unwrap().loc,
                    format!("\"{}\": expected \"on\" or \"off\"", other),
                ));
            }
            _ => true,
        };

        match first.text.as_str() {
            "options" => return Ok(Some(self.summary())),
            "east-const" => self.east_const = on,
            "west-const" => self.east_const = !on,
            "explain-by-default" => self.explain_by_default = on,
            "echo-commands" => self.echo_commands = on,
            "noecho-commands" => self.echo_commands = false,
            "digraphs" => self.digraphs = on,
            "nodigraphs" => self.digraphs = false,
            "trigraphs" => self.trigraphs = on,
            "notrigraphs" => self.trigraphs = false,
            "debug" => self.debug = on,
            "color" => {
                let when = match value.map(|t| t.text.as_str()) {
                    Some("auto") | None => ColorWhen::Auto,
                    Some("never") => ColorWhen::Never,
                    Some("always") => ColorWhen::Always,
                    Some(other) => {
                        return Err(Diagnostic::error(
                            value.unwrap().loc,
                            format!("\"{}\": expected \"auto\", \"never\", or \"always\"", other),
                        ));
                    }
                };
                self.color = when;
            }
            word => match word.parse::<Lang>() {
                Ok(lang) => self.lang = lang,
                Err(_) => {
                    return Err(Diagnostic::error(
                        first.loc,
                        format!("\"{}\": unknown set option", word),
                    ));
                }
            },
        }
        Ok(None)
    }

    pub fn summary(&self) -> String {
        let onoff = |b: bool| if b { "on" } else { "off" };
        let color = match self.color {
            ColorWhen::Auto => "auto",
            ColorWhen::Never => "never",
            ColorWhen::Always => "always",
        };
        format!(
            "language: {}\n  {}-const\n  explain-by-default {}\n  echo-commands {}\n  digraphs {}\n  trigraphs {}\n  color {}\n  debug {}",
            self.lang,
            if self.east_const { "east" } else { "west" },
            onoff(self.explain_by_default),
            onoff(self.echo_commands),
            onoff(self.digraphs),
            onoff(self.trigraphs),
            color,
            onoff(self.debug),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn set(opts: &mut Options, cmd: &str) -> Result<Option<String>, Diagnostic> {
        let toks = tokenize(cmd, LexOpts::default().english()).unwrap();
        opts.set(&toks)
    }

    #[test]
    fn test_set_language() {
        let mut opts = Options::default();
        set(&mut opts, "c99").unwrap();
        assert_eq!(opts.lang, Lang::C99);
        set(&mut opts, "c++17").unwrap();
        assert_eq!(opts.lang, Lang::Cpp17);
    }

    #[test]
    fn test_set_const_style() {
        let mut opts = Options::default();
        assert!(opts.east_const);
        set(&mut opts, "west-const").unwrap();
        assert!(!opts.east_const);
        set(&mut opts, "east-const").unwrap();
        assert!(opts.east_const);
    }

    #[test]
    fn test_set_on_off() {
        let mut opts = Options::default();
        set(&mut opts, "debug on").unwrap();
        assert!(opts.debug);
        set(&mut opts, "debug off").unwrap();
        assert!(!opts.debug);
        set(&mut opts, "explain-by-default off").unwrap();
        assert!(!opts.explain_by_default);
    }

    #[test]
    fn test_set_color() {
        let mut opts = Options::default();
        set(&mut opts, "color never").unwrap();
        assert_eq!(opts.color, ColorWhen::Never);
        assert!(set(&mut opts, "color sometimes").is_err());
    }

    #[test]
    fn test_unknown_option() {
        let mut opts = Options::default();
        let err = set(&mut opts, "frobnicate").unwrap_err();
        assert!(err.message.contains("unknown"));
    }

    #[test]
    fn test_summary_lists_current() {
        let opts = Options::default();
        let s = opts.summary();
        assert!(s.contains("C23"));
        assert!(s.contains("east-const"));
    }
}
