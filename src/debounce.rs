use std::time::{Duration, Instant};

use tracing::trace;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Holds back a rapidly changing value until input pauses for `delay`.
///
/// The debouncer has no timer of its own. The event loop calls [`Debouncer::poll`]
/// on every iteration and propagates whatever it returns, so dropping or
/// cancelling the debouncer is enough to make sure a pending value never fires.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a new value and restart the delay. Last write wins.
    pub fn input(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.deadline = Some(now + self.delay);
    }

    /// The value that will be propagated once input settles.
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take the pending value if its delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                trace!("Debounce delay elapsed");
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Take the pending value right away.
    pub fn flush(&mut self) -> Option<T> {
        self.deadline = None;
        self.pending.take()
    }

    /// Drop the pending value without propagating it.
    pub fn cancel(&mut self) {
        if self.pending.is_some() {
            trace!("Cancelled pending debounced value");
        }
        self.deadline = None;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Step through time in 1ms increments and collect what fires when.
    fn run<T>(debouncer: &mut Debouncer<T>, t: Instant, until: u64) -> Vec<(u64, T)> {
        (0..=until)
            .filter_map(|step| debouncer.poll(t + ms(step)).map(|v| (step, v)))
            .collect()
    }

    #[test]
    fn fires_once_after_last_event() {
        let t = Instant::now();
        let mut debouncer = Debouncer::new(ms(500));
        debouncer.input("a", t);
        assert_eq!(debouncer.poll(t + ms(5)), None);
        debouncer.input("ab", t + ms(10));
        debouncer.input("abc", t + ms(20));

        assert_eq!(debouncer.poll(t + ms(519)), None);
        assert_eq!(debouncer.pending(), Some(&"abc"));

        let fired = run(&mut debouncer, t + ms(20), 2000);
        assert_eq!(fired, vec![(500, "abc")]);
        assert_eq!(debouncer.pending(), None);
    }

    #[test]
    fn new_input_restarts_the_delay() {
        let t = Instant::now();
        let mut debouncer = Debouncer::new(ms(500));
        debouncer.input(1, t);
        debouncer.input(2, t + ms(499));
        assert_eq!(debouncer.poll(t + ms(500)), None);
        assert_eq!(debouncer.poll(t + ms(999)), Some(2));
        assert_eq!(debouncer.poll(t + ms(5000)), None);
    }

    #[test]
    fn cancel_before_expiry_never_fires() {
        let t = Instant::now();
        let mut debouncer = Debouncer::new(ms(500));
        debouncer.input("x", t);
        debouncer.cancel();
        assert!(run(&mut debouncer, t, 2000).is_empty());
    }

    #[test]
    fn dropping_discards_pending_value() {
        use std::rc::Rc;

        let t = Instant::now();
        let value = Rc::new(());
        let mut debouncer = Debouncer::new(ms(500));
        debouncer.input(Rc::clone(&value), t);
        assert_eq!(Rc::strong_count(&value), 2);
        drop(debouncer);
        assert_eq!(Rc::strong_count(&value), 1);
    }

    #[test]
    fn flush_takes_value_immediately() {
        let t = Instant::now();
        let mut debouncer = Debouncer::new(ms(500));
        debouncer.input("now", t);
        assert_eq!(debouncer.flush(), Some("now"));
        assert_eq!(debouncer.poll(t + ms(600)), None);
        assert_eq!(debouncer.flush(), None);
    }
}
