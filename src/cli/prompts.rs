//! Prompt helpers with inquire and a plain stdin fallback
//!
//! When `inquire` cannot drive the terminal (piped input, no TTY) every
//! prompt degrades to reading a line from stdin.

use inquire::{Confirm, InquireError, Text};
use std::io::{self, BufRead, Write};

/// What the operator typed at the session prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A line of input (possibly empty)
    Input(String),
    /// Escape at the prompt; ignore and prompt again
    Cancelled,
    /// Ctrl-C, Ctrl-D or end of input
    Exit,
}

fn read_stdin_line() -> anyhow::Result<Option<String>> {
    let mut input = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|e| anyhow::anyhow!("Failed to read input: {}", e))?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Read one request line at the session prompt
pub fn request_line(prompt: &str) -> anyhow::Result<Line> {
    match Text::new(prompt).prompt() {
        Ok(v) => Ok(Line::Input(v)),
        Err(InquireError::OperationCanceled) => Ok(Line::Cancelled),
        Err(InquireError::OperationInterrupted) => Ok(Line::Exit),
        Err(_) => {
            print!("{} ", prompt);
            io::stdout().flush()?;
            Ok(read_stdin_line()?.map_or(Line::Exit, Line::Input))
        }
    }
}

/// Confirm prompt with a default and fallback, for settings
///
/// Tool approval uses [`approve`], which has no default.
pub fn confirm(message: &str, default: bool, help: Option<&str>) -> anyhow::Result<bool> {
    let mut builder = Confirm::new(message).with_default(default);
    if let Some(h) = help {
        builder = builder.with_help_message(h);
    }
    match builder.prompt() {
        Ok(v) => Ok(v),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            anyhow::bail!("Cancelled");
        }
        Err(_) => {
            let hint = if default { "Y/n" } else { "y/N" };
            if let Some(h) = help {
                println!("  {}", h);
            }
            print!("? {} ({}) ", message, hint);
            io::stdout().flush()?;
            let Some(input) = read_stdin_line()? else {
                anyhow::bail!("Input closed before an answer was given");
            };
            Ok(parse_answer(&input).unwrap_or(default))
        }
    }
}

/// Yes/no prompt that only resolves on an explicit answer
///
/// Empty or unrecognised input asks again. Cancelling the prompt or closing
/// input is an error.
pub fn approve(message: &str, help: Option<&str>) -> anyhow::Result<bool> {
    let mut builder = Confirm::new(message);
    if let Some(h) = help {
        builder = builder.with_help_message(h);
    }
    match builder.prompt() {
        Ok(v) => Ok(v),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            anyhow::bail!("Cancelled");
        }
        Err(_) => {
            if let Some(h) = help {
                println!("  {}", h);
            }
            loop {
                print!("? {} (y/n) ", message);
                io::stdout().flush()?;
                let Some(input) = read_stdin_line()? else {
                    anyhow::bail!("Input closed before an answer was given");
                };
                match parse_answer(&input) {
                    Some(answer) => return Ok(answer),
                    None => println!("  Please answer y or n."),
                }
            }
        }
    }
}

/// `Some(true)` for yes, `Some(false)` for no, `None` for anything else
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Text prompt with a default value and fallback
pub fn text(message: &str, default: &str) -> anyhow::Result<String> {
    match Text::new(message).with_default(default).prompt() {
        Ok(v) => Ok(v.trim().to_string()),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            anyhow::bail!("Cancelled");
        }
        Err(_) => {
            print!("  {} [{}] ", message, default);
            io::stdout().flush()?;
            let input = read_stdin_line()?.unwrap_or_default();
            if input.is_empty() {
                Ok(default.to_string())
            } else {
                Ok(input)
            }
        }
    }
}
