use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// A single line typed into a running session.
#[derive(Parser, Debug)]
#[command(
    name = "punchclock",
    no_binary_name = true,
    disable_version_flag = true,
    help_template = "Commands:\n{subcommands}"
)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    #[command(
        about = "Create and start a timer. Without an id the id of a previously used project with the same name is taken"
    )]
    New { name: String, id: Option<String> },
    #[command(about = "Start, pause or resume timer at position", visible_alias = "t")]
    Toggle { position: usize },
    #[command(about = "Start or resume timer at position. Pauses every other timer")]
    Start { position: usize },
    #[command(about = "Pause timer at position")]
    Pause { position: usize },
    #[command(about = "Remove timer at position after confirmation")]
    Remove { position: usize },
    #[command(about = "Replace notes of timer at position")]
    Notes {
        position: usize,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    #[command(about = "Show all timers", visible_alias = "ls")]
    List,
    #[command(about = "Show previously used projects")]
    Projects,
    #[command(about = "Write summary of all timers into a CSV file")]
    Export { path: Option<PathBuf> },
    #[command(about = "Stop the session", visible_alias = "exit")]
    Quit,
}

/// What a line of input turned out to be.
#[derive(Debug, PartialEq, Eq)]
pub enum ParsedLine {
    Empty,
    Command(SessionCommand),
    /// Help text or a description of what's wrong with the line.
    Message(String),
}

pub fn parse_line(line: &str) -> ParsedLine {
    let words = match split_words(line) {
        Ok(words) => words,
        Err(message) => return ParsedLine::Message(message),
    };
    if words.is_empty() {
        return ParsedLine::Empty;
    }
    match SessionLine::try_parse_from(words) {
        Ok(parsed) => ParsedLine::Command(parsed.command),
        Err(e) => ParsedLine::Message(e.render().to_string().trim_end().to_string()),
    }
}

/// Splits on whitespace. Double quotes group words, `\"` inside quotes is a literal quote.
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut has_word = false;
    let mut quoted = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                has_word = true;
            }
            '\\' if quoted => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err("Unterminated quote".to_string()),
            },
            c if c.is_whitespace() && !quoted => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }

    if quoted {
        return Err("Unterminated quote".to_string());
    }
    if has_word {
        words.push(current);
    }
    Ok(words)
}
