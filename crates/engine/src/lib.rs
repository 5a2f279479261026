//! dcl translation engine
//!
//! Translates between C/C++ declaration syntax ("gibberish") and a
//! restricted pseudo-English, both ways, validating against a selected
//! dialect (K&R C through C23, C++98 through C++26), and expands C
//! preprocessor macros on demand with a printed trace.
//!
//! The REPL front end is a thin wrapper: all behavior lives here, driven
//! through [`Session::eval`]:
//!
//! ```rust
//! use dcl::Session;
//!
//! let mut session = Session::new();
//! let out = session.eval("explain int (*x)[5]");
//! assert_eq!(out.text, "declare x as pointer to array 5 of int");
//!
//! let out = session.eval("declare f as function (int) returning pointer to int");
//! assert_eq!(out.text, "int *f(int)");
//! ```
//!
//! Internals, roughly in dependency order: `lang` (dialect sets), `types`
//! (the three-part type-bit algebra), `keyword` (surface literals),
//! `sname` (scoped names), `ast` (the node arena), `compose` (array /
//! function / placeholder splicing), `lexer`, `parse` (the two grammars),
//! `check` (the semantic rule matrix), `english` / `gibberish` (the two
//! printers), `preproc` (the macro engine), and `session` gluing it all
//! together.

pub mod ast;
pub mod check;
pub mod compose;
pub mod diag;
pub mod english;
pub mod gibberish;
pub mod keyword;
pub mod lang;
pub mod lexer;
pub mod oper;
pub mod options;
pub mod parse;
pub mod preproc;
pub mod session;
pub mod sname;
pub mod typedefs;
pub mod types;

pub use check::CheckMode;
pub use diag::{Diagnostic, Loc, Severity};
pub use gibberish::Style;
pub use lang::{Lang, LangSet};
pub use options::{ColorWhen, Options};
pub use session::{EvalOutput, Session};
