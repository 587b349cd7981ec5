//! Trailing-edge debouncer driving the aggregator's refresh.
//!
//! Every trigger restarts the quiet window. When the window elapses the
//! action runs once. A run in flight is never interrupted; triggers that
//! arrive during it schedule exactly one follow-up run after a fresh window.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub type BoxedRun = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type DebouncedAction = Arc<dyn Fn() -> BoxedRun + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Trigger,
    Cancel,
}

pub struct Debouncer {
    tx: mpsc::UnboundedSender<Signal>,
    task: JoinHandle<()>,
}

impl Debouncer {
    /// Spawn the debounce loop on the current tokio runtime
    pub fn spawn(delay: Duration, action: DebouncedAction) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_loop(rx, delay, action));
        Self { tx, task }
    }

    pub fn trigger(&self) {
        if self.tx.send(Signal::Trigger).is_err() {
            log::debug!("Debouncer stopped, trigger ignored");
        }
    }

    /// Drop a pending run; a run already in flight completes
    pub fn cancel(&self) {
        let _ = self.tx.send(Signal::Cancel);
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_loop(
    mut rx: mpsc::UnboundedReceiver<Signal>,
    delay: Duration,
    action: DebouncedAction,
) {
    let mut armed = false;
    loop {
        if !armed {
            match rx.recv().await {
                Some(Signal::Trigger) => {}
                Some(Signal::Cancel) => continue,
                None => return,
            }
        }

        let quiet = tokio::time::sleep(delay);
        tokio::pin!(quiet);
        let fire = loop {
            tokio::select! {
                () = &mut quiet => break true,
                signal = rx.recv() => match signal {
                    Some(Signal::Trigger) => quiet.as_mut().reset(Instant::now() + delay),
                    Some(Signal::Cancel) => break false,
                    None => return,
                },
            }
        };
        armed = false;
        if !fire {
            log::debug!("Pending refresh cancelled");
            continue;
        }

        let run = action();
        tokio::pin!(run);
        loop {
            tokio::select! {
                () = &mut run => break,
                signal = rx.recv() => match signal {
                    Some(Signal::Trigger) => armed = true,
                    Some(Signal::Cancel) => armed = false,
                    None => {
                        (&mut run).await;
                        return;
                    }
                },
            }
        }
    }
}
