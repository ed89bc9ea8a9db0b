use clap::ValueEnum;

use liftsync_core::{into_parts, snapshot_channel, Outcome, Snapshot, Subscription};

mod auth;
mod catalog;
mod config_cmd;
mod exercise;
mod plan;
mod set;

pub use auth::AuthCommand;
pub use catalog::CatalogCommand;
pub use config_cmd::ConfigCommand;
pub use exercise::ExerciseCommand;
pub use plan::PlanCommand;
pub use set::SetCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

type Handler<T> = Box<dyn FnMut(Snapshot<T>) + Send>;

/// Subscribes, waits for the initial snapshot and cancels.
pub(crate) async fn first_snapshot<T, S>(
    subscribe: S,
) -> Result<Vec<T>, Box<dyn std::error::Error>>
where
    T: Send + 'static,
    S: FnOnce(Handler<T>) -> Subscription,
{
    let (handler, mut rx) = snapshot_channel::<T>();
    let subscription = subscribe(Box::new(handler));
    let snapshot = rx.recv().await;
    subscription.cancel();

    match snapshot {
        Some(Snapshot {
            error: Some(e), ..
        }) => Err(e.into()),
        Some(snapshot) => Ok(snapshot.items),
        None => Ok(Vec::new()),
    }
}

/// Prints the result of a mutation. Returns the created id, if any.
pub(crate) fn report(
    action: &str,
    outcome: Outcome,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let confirmed = outcome.as_ref().map(|ack| ack.confirmed).unwrap_or(false);
    let (success, detail) = into_parts(outcome);
    if !success {
        let reason = detail.unwrap_or_else(|| "unknown error".to_string());
        return Err(format!("{} failed: {}", action, reason).into());
    }

    if confirmed {
        println!("{}", action);
    } else {
        println!("{} (queued; the store has not confirmed it yet)", action);
    }
    Ok(detail)
}

/// Asks a yes/no question on stdin; anything but "y" declines.
pub(crate) fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    use std::io::Write;

    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
