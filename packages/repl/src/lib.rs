//! # mgmt-repl
//!
//! Interactive console for browsing and driving managed objects.
//!
//! The console runs against an in-process `Registry` through a caching
//! `Client`, so every command goes through the same name resolution,
//! coercion and overload rules a remote front end would use.
//!
//! ## Features
//!
//! - List and select objects by full name, leaf name or glob
//! - Read, write and batch-read attributes from typed text
//! - Invoke operations, picking overloads by arity or explicit signature
//! - Error output with the full cause chain
//! - Tab completion for commands and object names
//! - Vi mode support (detected from EDITOR, .inputrc, or MGMT_EDIT_MODE)
//! - Command history
//!
//! ## Usage
//!
//! ```bash
//! mgmt
//!
//! # Inside the console:
//! > ls demo:*
//! > cd sessions
//! > get size hits
//! > set enabled false
//! > invoke resize(int, boolean) 16 true
//! ```

pub mod commands;
pub mod completer;
pub mod context;
pub mod core;
pub mod demo;
pub mod highlighter;
pub mod host;
pub mod io;
pub mod repl;

pub use context::{ConsoleContext, ContextError};
pub use host::EditModeChoice;
pub use repl::run;
