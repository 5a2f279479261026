//! Help text for the REPL.
//!
//! Two pages: the command summary and the pseudo-English crib sheet. Text
//! wraps to `$COLUMNS` when set, falling back to 80.

const HELP_COMMANDS: &[(&str, &str)] = &[
    ("declare <name> as <english>", "compose a C/C++ declaration"),
    ("explain <gibberish>", "decompose a C/C++ declaration"),
    ("cast <name> into <english>", "compose a cast"),
    ("(<type>)<name>", "decompose a C-syntax cast"),
    ("define <name> as <english>", "define a type name"),
    ("#define <name>[(params)] <body>", "define a preprocessor macro"),
    ("#undef <name>", "remove a preprocessor macro"),
    ("expand <name>[(args)]", "expand a macro, showing every step"),
    ("set [option]", "show or change options"),
    ("show [<name>|all|predefined|user]", "show types and macros"),
    ("help [english]", "this text, or the english crib sheet"),
    ("quit", "leave"),
];

const HELP_ENGLISH: &str = "\
The english on the right of `declare <name> as ...` reads left to right:

  pointer to T                   T *
  reference to T                 T &            (C++)
  rvalue reference to T          T &&           (C++11)
  array N of T                   T [N]
  array of T                     T []
  variable length array of T     T [*]          (C99, parameters only)
  function (A, B) returning T    T (A, B)
  block (A) returning T          T (^)(A)       (Apple)
  pointer to member of class C T T C::*

Parameters may themselves be english (`count as int`, `pointer to char`)
or plain C (`int`, `char const *`). Qualifier and storage words go in
front of what they qualify: `constant pointer to static array 4 of int`.

Languages for `set`: knr, c89, c99, c11, c17, c23, c++98 .. c++26.
Styles: east-const (char const *), west-const (const char *).";

/// Renders the requested help page.
pub fn help_text(topic: &str) -> String {
    if topic.trim() == "english" {
        return HELP_ENGLISH.to_string();
    }
    let width = term_columns();
    let left_width = HELP_COMMANDS
        .iter()
        .map(|(cmd, _)| cmd.len())
        .max()
        .unwrap_or(0);
    let mut out = String::from("commands:\n");
    for (cmd, what) in HELP_COMMANDS {
        let line = format!("  {:<width$}  {}", cmd, what, width = left_width);
        out.push_str(&wrap(&line, width, left_width + 4));
        out.push('\n');
    }
    out.push_str("\nsay `help english` for the phrase language.");
    out
}

fn term_columns() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .filter(|c| *c >= 40)
        .unwrap_or(80)
}

/// Wraps one logical line at `width`, indenting continuations.
fn wrap(line: &str, width: usize, indent: usize) -> String {
    if line.len() <= width {
        return line.to_string();
    }
    let mut out = String::new();
    let mut cur = String::new();
    for word in line.split(' ') {
        if !cur.is_empty() && cur.len() + 1 + word.len() > width {
            out.push_str(&cur);
            out.push('\n');
            cur = " ".repeat(indent);
        } else if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    out.push_str(&cur);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_page_lists_commands() {
        let text = help_text("");
        assert!(text.contains("declare"));
        assert!(text.contains("expand"));
        assert!(text.contains("#define"));
    }

    #[test]
    fn test_english_page() {
        let text = help_text("english");
        assert!(text.contains("pointer to"));
        assert!(text.contains("east-const"));
    }

    #[test]
    fn test_wrap_short_lines_untouched() {
        assert_eq!(wrap("short", 80, 4), "short");
    }

    #[test]
    fn test_wrap_long_line() {
        let long = "a ".repeat(60);
        let wrapped = wrap(long.trim_end(), 40, 2);
        assert!(wrapped.lines().count() > 1);
        assert!(wrapped.lines().all(|l| l.len() <= 40));
    }
}
