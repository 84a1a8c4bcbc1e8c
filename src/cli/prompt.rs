//! Line-oriented input with re-prompting.
//!
//! Standard input is read on a detached OS thread that feeds a channel, so
//! an abandoned prompt never holds up runtime shutdown.

use std::future::Future;
use std::io::{self, BufRead, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;

use crate::blockchain::types::TransferResult;
use crate::cli::FlowError;
use crate::resilience::classifier::{report, Disposition, Escalation};

/// Somewhere answers come from, one line at a time.
pub trait LineSource {
    /// Next line without its terminator, `None` at end of input.
    ///
    /// Must be cancel safe: a dropped call loses no line.
    fn next_line(&mut self) -> impl Future<Output = io::Result<Option<String>>>;
}

impl<R: AsyncBufRead + Unpin> LineSource for Lines<R> {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

/// Lines of the process's standard input.
pub struct StdinLines {
    rx: mpsc::Receiver<io::Result<String>>,
}

impl StdinLines {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(1);
        let reader = std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
            });
        if let Err(e) = reader {
            tracing::error!(error = %e, "Failed to start stdin reader");
        }
        Self { rx }
    }
}

impl LineSource for StdinLines {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.rx.recv().await.transpose()
    }
}

/// Reads answers from a line source, one prompt at a time.
pub struct Prompter<S> {
    lines: S,
}

impl Prompter<StdinLines> {
    pub fn stdin() -> Self {
        Self {
            lines: StdinLines::spawn(),
        }
    }
}

impl<R: AsyncBufRead + Unpin> Prompter<Lines<R>> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<S: LineSource> Prompter<S> {
    /// Print `prompt` and wait for one trimmed line.
    pub async fn ask(&mut self, prompt: &str) -> Result<String, FlowError> {
        print!("{}", prompt);
        io::stdout().flush()?;

        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(FlowError::InputClosed),
        }
    }

    /// Ask until `parse` accepts the answer.
    ///
    /// `preset` (a flag or environment value) is tried before prompting.
    /// Rejected input is logged and asked again; errors that do not call
    /// for a re-prompt end the flow.
    pub async fn ask_until<T, F>(
        &mut self,
        prompt: &str,
        mut preset: Option<String>,
        mut parse: F,
    ) -> Result<T, FlowError>
    where
        F: FnMut(&str) -> TransferResult<T>,
    {
        loop {
            let raw = match preset.take() {
                Some(value) => value,
                None => self.ask(prompt).await?,
            };

            match parse(&raw) {
                Ok(value) => return Ok(value),
                Err(error) => match report("input", &error) {
                    Disposition::Reprompt => continue,
                    disposition => return Err(Escalation { error, disposition }.into()),
                },
            }
        }
    }

    /// Yes/no question; an empty answer means no.
    pub async fn confirm(&mut self, prompt: &str) -> Result<bool, FlowError> {
        loop {
            let answer = self.ask(&format!("{} [y/N]: ", prompt)).await?;
            match answer.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "" | "n" | "no" => return Ok(false),
                _ => println!("Please answer 'y' or 'n'."),
            }
        }
    }
}
