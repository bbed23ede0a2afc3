use std::{fmt::Display, io::Write};

use anyhow::Result;
use futures::{Stream, StreamExt};
use tokio::io::{self, AsyncBufReadExt, BufReader, Stdin};
use tokio_stream::wrappers::LinesStream;

/// Line based user interaction. Commands and answers to confirmation prompts come from the same
/// input, so a prompt blocks the session until it's answered, the same way a modal dialog would.
pub struct Console<I, W> {
    input: I,
    output: W,
}

pub fn stdin_lines() -> LinesStream<BufReader<Stdin>> {
    LinesStream::new(BufReader::new(io::stdin()).lines())
}

impl<I, W> Console<I, W>
where
    I: Stream<Item = Result<String, io::Error>> + Unpin,
    W: Write,
{
    pub fn new(input: I, output: W) -> Self {
        Self { input, output }
    }

    /// Next line of input, `None` once input is closed. Cancel safe.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.input.next().await.transpose()?)
    }

    /// Asks a yes/no question. Anything except "y" or "yes" is a no, so is closed input.
    pub async fn confirm(&mut self, question: &str) -> Result<bool> {
        write!(self.output, "{question} [y/N] ")?;
        self.output.flush()?;
        let answer = self.next_line().await?.unwrap_or_default();
        Ok(matches!(
            answer.trim().to_lowercase().as_str(),
            "y" | "yes"
        ))
    }

    pub fn say(&mut self, message: impl Display) -> Result<()> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    pub fn prompt(&mut self) -> Result<()> {
        write!(self.output, "> ")?;
        self.output.flush()?;
        Ok(())
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}
