//! Line-based console prompts.

use std::io::Write as _;

use anyhow::Result;
use mailexport_core::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;

/// Reads answers from standard input, aborting when the run is cancelled.
pub struct Prompter {
    lines: Lines<BufReader<Stdin>>,
    cancel: CancellationToken,
}

impl Prompter {
    /// Creates a prompter over the process's standard input.
    pub fn stdin(cancel: CancellationToken) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            cancel,
        }
    }

    /// Prints `question` and waits for one line. `None` means end of input.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        print!("{question}");
        std::io::stdout().flush()?;

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled.into()),
            line = self.lines.next_line() => Ok(line?.map(|l| l.trim().to_string())),
        }
    }

    /// Asks a yes/no question; anything but `y`/`yes` is no.
    pub async fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self
            .ask(question)
            .await?
            .is_some_and(|answer| is_yes(&answer)))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

/// A menu answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// 1-based entry number.
    Number(usize),
    /// Free text.
    Text(String),
    /// Nothing entered.
    Empty,
}

impl Choice {
    /// Classifies a trimmed answer.
    pub fn parse(answer: &str) -> Self {
        let answer = answer.trim();
        if answer.is_empty() {
            Self::Empty
        } else if let Ok(n) = answer.parse::<usize>() {
            Self::Number(n)
        } else {
            Self::Text(answer.to_string())
        }
    }
}
