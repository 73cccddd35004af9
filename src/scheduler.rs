//! Cancellable timers that deliver ticks to the reply controller

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

/// What a timer fires for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// The think-delay before a reply starts streaming has elapsed
    ThinkDelayElapsed,
    /// Reveal the next increment of the streaming reply
    Increment,
}

/// Timer firing addressed to one reply.
///
/// The controller compares `reply_id` with its active slot, so ticks that
/// outlive their reply are dropped on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub reply_id: Uuid,
    pub kind: TickKind,
}

impl Tick {
    pub fn think_delay(reply_id: Uuid) -> Self {
        Self {
            reply_id,
            kind: TickKind::ThinkDelayElapsed,
        }
    }

    pub fn increment(reply_id: Uuid) -> Self {
        Self {
            reply_id,
            kind: TickKind::Increment,
        }
    }
}

/// Owned handle to a scheduled timer. Cancelling or dropping it stops the timer.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("live", &self.cancel.is_some())
            .finish()
    }
}

/// Source of timers for the reply controller
pub trait Scheduler {
    /// Fire `tick` once after `delay`
    fn schedule_once(&self, delay: Duration, tick: Tick) -> TimerHandle;

    /// Fire `tick` every `interval`, first firing one interval from now
    fn schedule_repeating(&self, interval: Duration, tick: Tick) -> TimerHandle;
}

/// Scheduler backed by tokio timers; ticks arrive on the channel returned by [`TokioScheduler::new`]
#[derive(Clone)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Tick>,
}

const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Tick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn handle_for(task: JoinHandle<()>) -> TimerHandle {
        TimerHandle::new(move || task.abort())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, tick: Tick) -> TimerHandle {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(tick);
        });
        Self::handle_for(task)
    }

    fn schedule_repeating(&self, interval: Duration, tick: Tick) -> TimerHandle {
        // tokio panics on a zero period
        let interval = interval.max(MIN_REPEAT_INTERVAL);
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(tick).is_err() {
                    // Receiver is gone, nobody is listening anymore
                    break;
                }
            }
        });
        Self::handle_for(task)
    }
}

#[cfg(test)]
pub mod manual {
    //! Deterministic scheduler for tests: nothing fires until the test asks for it.

    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct ManualTimer {
        tick: Tick,
        repeating: bool,
        cancelled: Arc<AtomicBool>,
    }

    #[derive(Clone, Default)]
    pub struct ManualScheduler {
        timers: Arc<Mutex<Vec<ManualTimer>>>,
    }

    impl ManualScheduler {
        pub fn new() -> Self {
            Self::default()
        }

        fn register(&self, tick: Tick, repeating: bool) -> TimerHandle {
            let cancelled = Arc::new(AtomicBool::new(false));
            self.timers.lock().unwrap().push(ManualTimer {
                tick,
                repeating,
                cancelled: cancelled.clone(),
            });
            TimerHandle::new(move || cancelled.store(true, Ordering::SeqCst))
        }

        /// Number of timers that are still live
        pub fn live_timers(&self) -> usize {
            let mut timers = self.timers.lock().unwrap();
            timers.retain(|timer| !timer.cancelled.load(Ordering::SeqCst));
            timers.len()
        }

        /// Fire the oldest live timer, returning the tick it delivers.
        /// One-shot timers are consumed, repeating ones stay registered.
        pub fn next_tick(&self) -> Option<Tick> {
            let mut timers = self.timers.lock().unwrap();
            timers.retain(|timer| !timer.cancelled.load(Ordering::SeqCst));
            let first = timers.first()?;
            let tick = first.tick;
            if !first.repeating {
                timers.remove(0);
            }
            Some(tick)
        }
    }

    impl Scheduler for ManualScheduler {
        fn schedule_once(&self, _delay: Duration, tick: Tick) -> TimerHandle {
            self.register(tick, false)
        }

        fn schedule_repeating(&self, _interval: Duration, tick: Tick) -> TimerHandle {
            self.register(tick, true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::manual::ManualScheduler;
    use super::*;

    #[test]
    fn dropping_a_handle_cancels_the_timer() {
        let scheduler = ManualScheduler::new();
        let handle = scheduler.schedule_repeating(Duration::from_millis(10), Tick::increment(Uuid::new_v4()));
        assert_eq!(scheduler.live_timers(), 1);
        drop(handle);
        assert_eq!(scheduler.live_timers(), 0);
        assert_eq!(scheduler.next_tick(), None);
    }

    #[test]
    fn one_shot_timers_fire_once() {
        let scheduler = ManualScheduler::new();
        let tick = Tick::think_delay(Uuid::new_v4());
        let _handle = scheduler.schedule_once(Duration::from_millis(500), tick);
        assert_eq!(scheduler.next_tick(), Some(tick));
        assert_eq!(scheduler.next_tick(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_delivers_ticks_until_cancelled() {
        let (scheduler, mut rx) = TokioScheduler::new();
        let tick = Tick::increment(Uuid::new_v4());
        let handle = scheduler.schedule_repeating(Duration::from_millis(150), tick);

        tokio::time::sleep(Duration::from_millis(460)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        let mut received = 0;
        while let Ok(delivered) = rx.try_recv() {
            assert_eq!(delivered, tick);
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_zero_interval_still_ticks() {
        let (scheduler, mut rx) = TokioScheduler::new();
        let tick = Tick::increment(Uuid::new_v4());
        let handle = scheduler.schedule_repeating(Duration::ZERO, tick);

        tokio::time::sleep(Duration::from_millis(3)).await;
        handle.cancel();

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert!(received >= 2, "got {} ticks", received);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_one_shot_respects_delay() {
        let (scheduler, mut rx) = TokioScheduler::new();
        let tick = Tick::think_delay(Uuid::new_v4());
        let _handle = scheduler.schedule_once(Duration::from_millis(500), tick);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.try_recv().ok(), Some(tick));
    }
}
