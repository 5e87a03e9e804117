//! Drift-free periodic scheduling

use futures::Stream;
use pin_project_lite::pin_project;
use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;
use tokio::time::{Instant, Sleep, sleep_until};

pin_project! {
    /// Fires at `start + n * period`.
    ///
    /// Each deadline is computed from the previous deadline, never from the time
    /// the caller got around to waiting, so time spent between ticks does not
    /// accumulate into drift. After a stall longer than a period the missed
    /// ticks fire back to back until the schedule is caught up.
    pub struct Ticker {
        #[pin]
        sleep: Sleep,
        deadline: Instant,
        period: Duration,
    }
}

impl Ticker {
    /// First tick one period from now
    pub fn new(period: Duration) -> Self {
        Self::starting_at(Instant::now() + period, period)
    }

    /// First tick at `start`
    pub fn starting_at(start: Instant, period: Duration) -> Self {
        Self { sleep: sleep_until(start), deadline: start, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Deadline of the next tick
    pub fn next_deadline(&self) -> Instant {
        self.deadline
    }

    /// Poll for the next tick; yields the deadline that elapsed.
    pub fn poll_tick(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Instant> {
        let mut this = self.project();
        ready!(this.sleep.as_mut().poll(cx));

        let fired = *this.deadline;
        *this.deadline = fired + *this.period;
        this.sleep.reset(*this.deadline);
        Poll::Ready(fired)
    }

    /// Wait for the next tick.
    pub async fn tick(mut self: Pin<&mut Self>) -> Instant {
        poll_fn(|cx| self.as_mut().poll_tick(cx)).await
    }
}

impl Stream for Ticker {
    type Item = Instant;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.poll_tick(cx).map(Some)
    }
}
