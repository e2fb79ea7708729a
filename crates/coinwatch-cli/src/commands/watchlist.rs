use std::io::{BufRead, Write};

use coinwatch_core::{Confirm, Dashboard};
use serde_json::json;

use crate::cli::{WatchlistArgs, WatchlistCommand};
use crate::error::CliError;

use super::CommandOutput;

/// Asks on stderr and reads the answer from stdin; `--yes` skips the question.
#[derive(Debug, Clone, Copy)]
pub struct StdinConfirm {
    assume_yes: bool,
}

impl StdinConfirm {
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    /// Blocking read of one answer line; runs off the async worker via
    /// `block_in_place`, so it needs the multi-threaded runtime.
    fn ask<R: BufRead>(&self, prompt: &str, input: impl FnOnce() -> R) -> bool {
        eprint!("{prompt} [y/N] ");
        if std::io::stderr().flush().is_err() {
            return false;
        }

        tokio::task::block_in_place(|| {
            let mut answer = String::new();
            match input().read_line(&mut answer) {
                Ok(_) => is_yes(&answer),
                Err(_) => false,
            }
        })
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        self.ask(prompt, || std::io::stdin().lock())
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub async fn run(
    args: &WatchlistArgs,
    dashboard: &Dashboard,
    confirm: &StdinConfirm,
) -> Result<CommandOutput, CliError> {
    let service = dashboard.watchlist_service();

    match &args.command {
        WatchlistCommand::List => {
            let items = service.items()?;
            Ok(CommandOutput::ok(
                "watchlist.list",
                json!({ "user": service.user().as_str(), "items": items }),
            ))
        }
        WatchlistCommand::Add(coin) => {
            let update = service.add(&coin.id)?;
            let notice = update.notice.clone();
            Ok(CommandOutput::ok("watchlist.add", serde_json::to_value(update)?).with_notice(notice))
        }
        WatchlistCommand::Remove(coin) => {
            let update = service.remove(&coin.id, confirm)?;
            let notice = update.notice.clone();
            Ok(CommandOutput::ok("watchlist.remove", serde_json::to_value(update)?)
                .with_notice(notice))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn answer_is_read_without_stalling_the_runtime() {
        let confirm = StdinConfirm::new(false);

        assert!(confirm.ask("Remove Bitcoin?", || Cursor::new("y\n")));
        assert!(!confirm.ask("Remove Bitcoin?", || Cursor::new("")));
    }

    #[test]
    fn assume_yes_never_prompts() {
        assert!(StdinConfirm::new(true).confirm("Remove everything?"));
    }
}
