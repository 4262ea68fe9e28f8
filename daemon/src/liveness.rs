use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::event::SupervisorEvent;

/// Emits [`SupervisorEvent::LivenessTick`] every `period` until the event
/// loop goes away.
///
/// The ticker never touches the child itself; the coordinator reaps it when
/// the tick is handled, so only the event loop ever mutates process state.
pub async fn run(period: Duration, tx: mpsc::Sender<SupervisorEvent>) {
    let mut ticker = interval(period);
    // A long stop() can hold the loop; one catch-up tick is enough.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and the script was just started.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if tx.send(SupervisorEvent::LivenessTick).await.is_err() {
            break;
        }
    }
}
