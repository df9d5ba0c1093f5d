use chatstream_client::{route, EventStream};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::session::{Outcome, SessionUpdate, StreamSession};

/// Run one event stream through `session` until the answer settles, the
/// stream fails or `cancel` fires.
///
/// Three clocks are multiplexed with the network: the drain ticker that
/// reveals one queued chunk per interval, the completion delay armed once
/// the queue is empty after a completion, and the settle delay that clears
/// the streaming state after finalizing. Updates are forwarded to `updates`
/// after every step; a dropped receiver does not stop the session.
pub async fn drive(
    session: &mut StreamSession,
    mut events: EventStream,
    cancel: CancellationToken,
    updates: &mpsc::Sender<SessionUpdate>,
) -> Outcome {
    let config = session.config().clone();
    let mut drain = interval(config.drain_interval());
    drain.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut stream_open = true;
    let mut finalize_at: Option<Instant> = None;
    let mut settle_at: Option<Instant> = None;
    let mut receiver_alive = true;

    publish(session, updates, &cancel, &mut receiver_alive).await;

    loop {
        if session.phase().is_settled() {
            finalize_at = None;
            if settle_at.is_none() {
                settle_at = Some(Instant::now() + config.settle_delay());
            }
        } else if finalize_at.is_none() && session.ready_to_finalize() {
            finalize_at = Some(Instant::now() + config.completion_delay());
        }

        let accepting = stream_open && !session.phase().is_terminal();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                if session.phase().is_settled() {
                    session.settle();
                } else {
                    session.abort();
                }
                publish(session, updates, &cancel, &mut receiver_alive).await;
                break;
            }

            _ = sleep_until(settle_at.unwrap_or_else(Instant::now)), if settle_at.is_some() => {
                session.settle();
                publish(session, updates, &cancel, &mut receiver_alive).await;
                break;
            }

            _ = sleep_until(finalize_at.unwrap_or_else(Instant::now)), if finalize_at.is_some() => {
                finalize_at = None;
                session.finalize();
            }

            _ = drain.tick(), if session.has_pending() => {
                session.tick();
            }

            next = events.next(), if accepting => match next {
                Some(Ok(raw)) => session.handle(route(raw)),
                Some(Err(e)) => {
                    stream_open = false;
                    session.fail_transport(&e);
                }
                None => {
                    stream_open = false;
                    session.stream_ended();
                }
            },

            else => {
                tracing::debug!(phase = ?session.phase(), "Nothing left to drive");
                break;
            }
        }

        publish(session, updates, &cancel, &mut receiver_alive).await;
    }

    session.outcome().unwrap_or(Outcome::Aborted)
}

/// Drive on a background task. The session is handed back when the task
/// ends so the caller keeps the transcript for the next turn.
pub fn spawn_drive(
    mut session: StreamSession,
    events: EventStream,
    cancel: CancellationToken,
    updates: mpsc::Sender<SessionUpdate>,
) -> JoinHandle<(StreamSession, Outcome)> {
    tokio::spawn(async move {
        let outcome = drive(&mut session, events, cancel, &updates).await;
        (session, outcome)
    })
}

async fn publish(
    session: &mut StreamSession,
    updates: &mpsc::Sender<SessionUpdate>,
    cancel: &CancellationToken,
    receiver_alive: &mut bool,
) {
    for update in session.take_updates() {
        if !*receiver_alive {
            continue;
        }
        // Once cancelled, never wait on a receiver that may have stopped reading
        if cancel.is_cancelled() {
            let _ = updates.try_send(update);
            continue;
        }
        tokio::select! {
            biased;
            sent = updates.send(update) => {
                if sent.is_err() {
                    tracing::debug!("Update receiver dropped; continuing without publishing");
                    *receiver_alive = false;
                }
            }
            _ = cancel.cancelled() => {}
        }
    }
}
