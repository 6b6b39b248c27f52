//! Debounced value.
//!
//! Raw input goes in through `set()`; the derived value (`subscribe()` /
//! `current()`) only moves once the input has stayed unchanged for the full
//! delay. Each new input restarts the quiet period. Dropping the `Debouncer`
//! aborts its timer task.
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct Debouncer<T> {
    input: watch::Sender<T>,
    output: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (input, mut input_rx) = watch::channel(initial.clone());
        let (output_tx, output) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                if input_rx.changed().await.is_err() {
                    return;
                }

                loop {
                    tokio::select! {
                        changed = input_rx.changed() => {
                            if changed.is_err() {
                                return;
                            }
                        }
                        _ = tokio::time::sleep(delay) => break,
                    }
                }

                let settled = input_rx.borrow_and_update().clone();
                output_tx.send_if_modified(|current| {
                    if *current == settled {
                        false
                    } else {
                        *current = settled;
                        true
                    }
                });
            }
        });

        Self {
            input,
            output,
            task,
        }
    }

    /// Feed a raw input value. Re-sending the current input is not a change.
    pub fn set(&self, value: T) {
        self.input.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    pub fn current(&self) -> T {
        self.output.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.clone()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
