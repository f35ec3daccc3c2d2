use std::io::{self, BufRead, Write};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::warn;

use crate::models::datasets::purchases::Progress;

/// Go/no-go hook consulted when the first checkpoint holds no purchases.
/// Returning false halts the run. Called synchronously from the collection
/// loop, so implementations may block.
pub trait ContinueDecision: Send {
    fn confirm_continue(&mut self, progress: Progress) -> bool;
}

/// Fixed answer, for unattended runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub bool);

impl ContinueDecision for FixedDecision {
    fn confirm_continue(&mut self, _progress: Progress) -> bool {
        self.0
    }
}

/// Asks the operator on stdin. Only `y` or `yes` continues; anything else,
/// including EOF or a read error, stops. On a multi-threaded runtime the read
/// is moved off the async worker with `block_in_place`.
pub struct ConsolePrompt<R> {
    input: R,
}

impl ConsolePrompt<io::BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        Self {
            input: io::BufReader::new(io::stdin()),
        }
    }
}

impl<R: BufRead> ConsolePrompt<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead + Send> ContinueDecision for ConsolePrompt<R> {
    fn confirm_continue(&mut self, progress: Progress) -> bool {
        print!(
            "No card purchases found in the first {} of {} transactions. Continue? (y/n): ",
            progress.processed, progress.total
        );
        let _ = io::stdout().flush();

        let on_worker = Handle::try_current()
            .is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
        let answer = if on_worker {
            tokio::task::block_in_place(|| read_answer(&mut self.input))
        } else {
            read_answer(&mut self.input)
        };

        match answer {
            Ok(answer) => is_yes(&answer),
            Err(e) => {
                warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}

fn read_answer<R: BufRead>(input: &mut R) -> io::Result<String> {
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRESS: Progress = Progress {
        processed: 50,
        total: 80,
    };

    #[test]
    fn test_only_explicit_yes_continues() {
        for (input, expected) in [
            ("y\n", true),
            ("YES\n", true),
            ("  yes  \n", true),
            ("n\n", false),
            ("\n", false),
            ("yep\n", false),
            ("", false),
        ] {
            let mut prompt = ConsolePrompt::new(input.as_bytes());
            assert_eq!(prompt.confirm_continue(PROGRESS), expected, "input {input:?}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_prompt_reads_from_multi_threaded_runtime() {
        let mut prompt = ConsolePrompt::new("yes\n".as_bytes());
        assert!(prompt.confirm_continue(PROGRESS));
    }

    #[tokio::test]
    async fn test_prompt_reads_from_current_thread_runtime() {
        let mut prompt = ConsolePrompt::new("n\n".as_bytes());
        assert!(!prompt.confirm_continue(PROGRESS));
    }

    #[test]
    fn test_fixed_decision() {
        assert!(FixedDecision(true).confirm_continue(PROGRESS));
        assert!(!FixedDecision(false).confirm_continue(PROGRESS));
    }
}
