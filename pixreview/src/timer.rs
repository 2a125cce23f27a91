//! Frame timer backing the playback state machine.
//!
//! `FramePlayback` decides when to arm and cancel; this module turns those
//! decisions into a tokio interval task that posts `AppEvent::FrameTick`.
//! At most one task runs per timer. Arming replaces it and cancelling aborts
//! it, and every tick carries the generation it was armed with so a tick that
//! was already queued when the user paused is ignored by the state machine.

use pixreview_core::playback::TimerCommand;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::event::{AppEvent, PageId};

/// Owns the interval task of one review page. Dropped with the page.
pub struct FrameTimer {
    page: PageId,
    tx: UnboundedSender<AppEvent>,
    task: Option<JoinHandle<()>>,
}

impl FrameTimer {
    pub fn new(page: PageId, tx: UnboundedSender<AppEvent>) -> Self {
        Self { page, tx, task: None }
    }

    pub fn apply(&mut self, command: TimerCommand) {
        self.cancel();
        let TimerCommand::Arm { generation, delay } = command else {
            return;
        };

        let page = self.page;
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + delay, delay);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if tx.send(AppEvent::FrameTick { page, generation }).is_err() {
                    break;
                }
            }
        }));
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for FrameTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn armed_timer_ticks_with_its_generation() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut timer = FrameTimer::new(3, tx);
        timer.apply(TimerCommand::Arm { generation: 5, delay: Duration::from_millis(500) });
        assert!(timer.is_armed());

        tokio::time::advance(Duration::from_millis(501)).await;
        match rx.recv().await {
            Some(AppEvent::FrameTick { page, generation }) => assert_eq!((page, generation), (3, 5)),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticks() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut timer = FrameTimer::new(1, tx);
        timer.apply(TimerCommand::Arm { generation: 1, delay: Duration::from_millis(100) });
        timer.apply(TimerCommand::Cancel);
        assert!(!timer.is_armed());

        tokio::time::advance(Duration::from_millis(1_000)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "no tick after cancel");
    }
}
