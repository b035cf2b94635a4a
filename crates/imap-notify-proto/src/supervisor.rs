//! Reconnect loop around [`Session`].

#![allow(clippy::missing_errors_doc)]

use tokio::sync::watch;

use crate::backoff::{Backoff, ReconnectPolicy};
use crate::connection::{ConnectionProfile, Connector, Session, SessionPolicy};
use crate::dispatch::Dispatcher;
use crate::Result;

/// Watches the account until shutdown, reconnecting after failures.
///
/// Returns `Ok(())` after a requested shutdown. Returns the error when it
/// is not retryable (rejected credentials, untrusted certificate, missing
/// NOTIFY support) or when the attempt budget is spent. A pending burst is
/// flushed whenever a connection ends, so no observed change is dropped.
pub async fn run<C, F>(
    connector: &mut C,
    profile: &ConnectionProfile,
    policy: &SessionPolicy,
    reconnect: &ReconnectPolicy,
    dispatcher: &mut Dispatcher<F>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    C: Connector,
    F: FnMut(),
{
    let mut backoff = Backoff::new(reconnect.clone());

    loop {
        if *shutdown.borrow_and_update() {
            dispatcher.flush();
            return Ok(());
        }

        let attempt = tokio::select! {
            biased;
            _ = shutdown.changed() => None,
            result = Session::connect(connector, profile, policy.clone()) => Some(result),
        };
        let Some(attempt) = attempt else {
            // Loop around to re-check the flag; a dropped sender ends the run.
            if shutdown.has_changed().is_err() {
                dispatcher.flush();
                return Ok(());
            }
            continue;
        };

        let err = match attempt {
            Ok(mut session) => {
                backoff.reset();
                if policy.refresh_on_connect {
                    dispatcher.trigger();
                }
                let result = session.watch(dispatcher, &mut shutdown).await;
                dispatcher.flush();
                match result {
                    Ok(()) => {
                        tracing::info!("Shut down");
                        return Ok(());
                    }
                    Err(err) => err,
                }
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            tracing::error!(error = %err, "Giving up: error is not retryable");
            return Err(err);
        }

        let Some(delay) = backoff.next_delay() else {
            tracing::error!(error = %err, attempts = backoff.failures() - 1, "Giving up: reconnect attempts exhausted");
            return Err(err);
        };
        tracing::warn!(error = %err, ?delay, attempt = backoff.failures(), "Connection lost, reconnecting");

        tokio::select! {
            biased;
            _ = shutdown.changed() => {}
            () = tokio::time::sleep(delay) => {}
        }
    }
}

/// Like [`run`], but ends after the first burst of changes.
///
/// The connect refresh is skipped so only a change seen on the server
/// counts. `on_burst` runs once, then shutdown is requested through
/// `shutdown`, which also carries external shutdown requests.
pub async fn run_once<C, F>(
    connector: &mut C,
    profile: &ConnectionProfile,
    policy: &SessionPolicy,
    reconnect: &ReconnectPolicy,
    mut on_burst: F,
    shutdown: watch::Sender<bool>,
) -> Result<()>
where
    C: Connector,
    F: FnMut(),
{
    let policy = SessionPolicy {
        refresh_on_connect: false,
        ..policy.clone()
    };
    let receiver = shutdown.subscribe();
    let mut dispatcher = Dispatcher::new(policy.debounce, || {
        on_burst();
        tracing::info!("First change handled, stopping");
        shutdown.send_replace(true);
    });
    run(connector, profile, &policy, reconnect, &mut dispatcher, receiver).await
}
