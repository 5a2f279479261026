//! dcl - compose and decompose C/C++ declarations
//!
//! Interactive front end over the `dcl` engine: a rustyline prompt with
//! history, an init file (`~/.dclrc`) whose lines run exactly like typed
//! input, and SGR-colored diagnostics.
//!
//! Usage:
//!   dcl                          # interactive
//!   dcl explain int '(*x)[5]'    # one command, then exit
//!   dcl -x c++17 -e 'declare r as reference to int'

mod help;

use clap::{CommandFactory, Parser as ClapParser};
use clap_complete::{Shell, generate};
use crossterm::style::Stylize;
use dcl::{ColorWhen, Diagnostic, EvalOutput, Session};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "dcl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compose and decompose C/C++ declarations", long_about = None)]
struct Cli {
    /// A command to run non-interactively (all words are joined)
    command: Vec<String>,

    /// Initial language dialect (c89..c23, c++98..c++26, knr)
    #[arg(short = 'x', long = "language", value_name = "LANG")]
    language: Option<String>,

    /// Print `const char *` rather than `char const *`
    #[arg(long)]
    west_const: bool,

    /// When to color output
    #[arg(long, value_name = "WHEN", value_parser = ["auto", "never", "always"])]
    color: Option<String>,

    /// Commands to execute before reading input
    #[arg(short = 'e', long = "execute", value_name = "COMMAND")]
    execute: Vec<String>,

    /// Skip ~/.dclrc
    #[arg(long)]
    no_init: bool,

    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL", value_enum)]
    completions: Option<Shell>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "dcl", &mut io::stdout());
        return;
    }

    let mut session = Session::new();
    if let Some(lang) = &cli.language {
        match lang.parse() {
            Ok(lang) => session.opts.lang = lang,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }
    if cli.west_const {
        session.opts.east_const = false;
    }
    if let Some(when) = &cli.color {
        session.opts.color = match when.as_str() {
            "never" => ColorWhen::Never,
            "always" => ColorWhen::Always,
            _ => ColorWhen::Auto,
        };
    }

    if !cli.no_init
        && let Some(path) = init_file_path()
        && path.exists()
        && let Err(e) = run_init_file(&mut session, &path)
    {
        eprintln!("Error reading {}: {}", path.display(), e);
        process::exit(1);
    }

    let mut failed = false;
    for command in &cli.execute {
        if !run_command(&mut session, command) {
            failed = true;
        }
    }
    if !cli.command.is_empty() {
        let command = cli.command.join(" ");
        if !run_command(&mut session, &command) || failed {
            process::exit(1);
        }
        return;
    }
    if !cli.execute.is_empty() {
        if failed {
            process::exit(1);
        }
        return;
    }

    if let Err(e) = repl(&mut session) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// `~/.dclrc`, the conventional init file.
fn init_file_path() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(".dclrc"))
}

fn history_path() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(".dcl_history"))
}

/// Feeds every line of the init file to the session verbatim, reporting
/// problems with the file name and line number.
fn run_init_file(session: &mut Session, path: &std::path::Path) -> io::Result<()> {
    let content = std::fs::read_to_string(path)?;
    for (n, line) in content.lines().enumerate() {
        let out = session.eval(line);
        print_output(session, &out, line);
        if !out.ok() {
            eprintln!("({} line {})", path.display(), n + 1);
        }
    }
    Ok(())
}

/// Runs one command; returns false if it produced an error.
fn run_command(session: &mut Session, input: &str) -> bool {
    if session.opts.echo_commands {
        println!("{}", input);
    }
    let out = session.eval(input);
    print_output(session, &out, input);
    out.ok()
}

fn repl(session: &mut Session) -> Result<(), String> {
    let mut editor =
        DefaultEditor::new().map_err(|e| format!("failed to start line editor: {}", e))?;
    if let Some(path) = history_path() {
        let _ = editor.load_history(&path);
    }

    loop {
        match editor.readline("dcl> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(&line);
                }
                if session.opts.echo_commands {
                    println!("{}", line);
                }
                let out = session.eval(&line);
                print_output(session, &out, &line);
                if out.quit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(format!("read error: {}", e)),
        }
    }

    if let Some(path) = history_path() {
        let _ = editor.save_history(&path);
    }
    Ok(())
}

fn use_color(session: &Session) -> bool {
    match session.opts.color {
        ColorWhen::Always => true,
        ColorWhen::Never => false,
        ColorWhen::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

fn print_output(session: &Session, out: &EvalOutput, input: &str) {
    if let Some(topic) = &out.help {
        println!("{}", help::help_text(topic));
    }
    if !out.text.is_empty() {
        println!("{}", out.text);
    }
    let color = use_color(session);
    for diag in &out.diags {
        print_diag(diag, input, out.echo_input, color);
    }
}

fn print_diag(diag: &Diagnostic, input: &str, echo_input: bool, color: bool) {
    let rendered = diag.render(Some(input), echo_input);
    if !color {
        println!("{}", rendered);
        return;
    }
    for line in rendered.lines() {
        if line.trim_start() == "^" {
            println!("{}", line.green());
        } else if let Some(idx) = line.find("error: ") {
            let (head, tail) = line.split_at(idx);
            println!("{}{}{}", head, "error: ".red().bold(), &tail[7..]);
        } else if let Some(idx) = line.find("warning: ") {
            let (head, tail) = line.split_at(idx);
            println!("{}{}{}", head, "warning: ".yellow().bold(), &tail[9..]);
        } else {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_init_file_runs_lines() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join("dclrc");
        let mut f = std::fs::File::create(&rc).unwrap();
        writeln!(f, "set c99").unwrap();
        writeln!(f, "#define N 42").unwrap();
        drop(f);

        let mut session = Session::new();
        run_init_file(&mut session, &rc).unwrap();
        assert_eq!(session.opts.lang, dcl::Lang::C99);
        assert!(session.macros.lookup("N").is_some());
    }

    #[test]
    fn test_run_command_reports_ok() {
        let mut session = Session::new();
        assert!(run_command(&mut session, "explain int x"));
        assert!(!run_command(&mut session, "declare x as array of void"));
    }

    #[test]
    fn test_cli_parses() {
        use clap::Parser;
        let cli = Cli::parse_from(["dcl", "-x", "c++17", "--west-const", "-e", "set options"]);
        assert_eq!(cli.language.as_deref(), Some("c++17"));
        assert!(cli.west_const);
        assert_eq!(cli.execute.len(), 1);
    }
}
