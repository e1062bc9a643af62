// file: src/prompt/terminal.rs
// version: 1.0.0
// guid: c41f8e27-9a3d-4b06-8e15-62f7d0ab93c4

//! Terminal-backed prompting

use super::Prompter;
use crate::error::ConfiguratorError;
use crate::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use std::io::{self, BufRead, IsTerminal, Write};

/// Prompts on a reader/writer pair, normally stdin/stdout
pub struct TerminalPrompter<R, W> {
    reader: R,
    writer: W,
    hide_secrets: bool,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process terminal; secrets are hidden when stdin is a TTY
    pub fn stdio() -> Self {
        let stdin = io::stdin();
        let hide_secrets = stdin.is_terminal();
        Self {
            reader: stdin.lock(),
            writer: io::stdout(),
            hide_secrets,
        }
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    /// Prompt on arbitrary streams; answers are read line by line
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            hide_secrets: false,
        }
    }

    /// Consume the prompter, returning the output stream
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn write_question(&mut self, question: &str) -> Result<()> {
        write!(self.writer, "{}", question)?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn read_hidden_line(&mut self) -> Result<Option<String>> {
        terminal::enable_raw_mode()?;
        let answer = read_keys_until_enter();
        terminal::disable_raw_mode()?;
        writeln!(self.writer)?;
        answer
    }
}

/// Collect key presses in raw mode so nothing is echoed
fn read_keys_until_enter() -> Result<Option<String>> {
    let mut answer = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }
        match code {
            KeyCode::Enter => return Ok(Some(answer)),
            KeyCode::Backspace => {
                answer.pop();
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(ConfiguratorError::Interrupted);
            }
            KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
                if answer.is_empty() {
                    return Ok(None);
                }
            }
            KeyCode::Char(c) => answer.push(c),
            _ => {}
        }
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.write_question(question)?;
        self.read_line()
    }

    fn ask_secret(&mut self, question: &str) -> Result<Option<String>> {
        self.write_question(question)?;
        if self.hide_secrets {
            self.read_hidden_line()
        } else {
            self.read_line()
        }
    }

    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { " [Y/n] " } else { " [y/N] " };
        loop {
            self.write_question(&format!("{}{}", question, hint))?;
            let Some(answer) = self.read_line()? else {
                return Ok(default);
            };
            match answer.trim().to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "ye" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => {
                    writeln!(
                        self.writer,
                        "Please respond with 'yes' or 'no' (or 'y' or 'n')."
                    )?;
                }
            }
        }
    }
}

/// Prompter for unattended runs: nothing can be asked
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn ask(&mut self, _question: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn ask_secret(&mut self, _question: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn confirm(&mut self, _question: &str, default: bool) -> Result<bool> {
        Ok(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_ask_reads_one_line() {
        let mut p = prompter("pi\nnext\n");
        assert_eq!(p.ask("What is your username: ").unwrap().as_deref(), Some("pi"));

        let output = String::from_utf8(p.into_writer()).unwrap();
        assert_eq!(output, "What is your username: ");
    }

    #[test]
    fn test_ask_returns_none_on_eof() {
        let mut p = prompter("");
        assert!(p.ask("anything: ").unwrap().is_none());
    }

    #[test]
    fn test_secret_reads_plain_line_without_terminal() {
        let mut p = prompter("s3cret\r\n");
        assert_eq!(p.ask_secret("pw: ").unwrap().as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_confirm_answers() {
        assert!(prompter("yes\n").confirm("q", false).unwrap());
        assert!(prompter("Y\n").confirm("q", false).unwrap());
        assert!(!prompter("n\n").confirm("q", true).unwrap());
        assert!(!prompter("\n").confirm("q", false).unwrap());
        assert!(prompter("\n").confirm("q", true).unwrap());
        assert!(!prompter("").confirm("q", false).unwrap());
    }

    #[test]
    fn test_confirm_repeats_on_garbage() {
        let mut p = prompter("maybe\ny\n");
        assert!(p.confirm("do you want to set up ngrok", false).unwrap());

        let output = String::from_utf8(p.into_writer()).unwrap();
        assert_eq!(output.matches("do you want to set up ngrok [y/N] ").count(), 2);
        assert!(output.contains("Please respond with 'yes' or 'no'"));
    }

    #[test]
    fn test_non_interactive_never_answers() {
        let mut p = NonInteractivePrompter;
        assert!(p.ask("q").unwrap().is_none());
        assert!(p.ask_secret("q").unwrap().is_none());
        assert!(!p.confirm("q", false).unwrap());
    }
}
