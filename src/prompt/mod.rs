// file: src/prompt/mod.rs
// version: 1.0.0
// guid: 7b2d94c0-58e1-4f3a-b6c7-0d9e2a41f835

//! Operator prompts used when a setting was not supplied up front

pub mod terminal;

pub use terminal::{NonInteractivePrompter, TerminalPrompter};

use crate::Result;

/// Source of answers for settings missing from the command line.
///
/// `Ok(None)` means the input is unavailable (closed stdin, or prompting is
/// disabled); the caller decides whether that is fatal.
pub trait Prompter {
    /// Ask a question and read a visible answer
    fn ask(&mut self, question: &str) -> Result<Option<String>>;

    /// Ask a question and read the answer without echoing it
    fn ask_secret(&mut self, question: &str) -> Result<Option<String>>;

    /// Ask a yes/no question, returning `default` on an empty answer
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;
}
