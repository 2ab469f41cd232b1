use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

use crate::engine::{SettleToken, Update};
use crate::session::Status;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    Key(KeyEvent),
    Resize,
    /// One countdown period has elapsed.
    Tick,
    /// The settle delay for this flip has elapsed.
    Settle(SettleToken),
    /// The settings record changed outside the engine.
    ConfigChanged,
    /// Every event producer has gone away.
    Closed,
}

/// Source of external events (keyboard, resize, settings changes)
pub trait TimerEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<TimerEvent>,
    rx: Receiver<TimerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let keys = tx.clone();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // Windows reports releases too; only presses drive the timer.
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    keys.send(TimerEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => keys.send(TimerEvent::Resize),
                Ok(_) => Ok(()),
                Err(err) => {
                    tracing::warn!(error = %err, "terminal input closed");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { tx, rx }
    }

    /// Handle for other producers, such as the settings watcher.
    pub fn sender(&self) -> Sender<TimerEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// The production countdown period.
    pub fn one_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<TimerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TimerEvent>) -> Self {
        Self { rx }
    }
}

impl TimerEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Deadlines for the periodic tick and the one-shot settle.
///
/// The tick is armed only while the engine is running. At most one settle
/// is pending; it is dropped as soon as the engine leaves `Transitioning`
/// by any other route, so a reset can never be followed by a stale flip.
#[derive(Debug, Clone)]
pub struct Driver {
    period: Duration,
    next_tick: Option<Instant>,
    settle: Option<(Instant, SettleToken)>,
}

impl Driver {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_tick: None,
            settle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Re-arms deadlines after an accepted engine operation.
    pub fn track(&mut self, update: &Update, now: Instant) {
        match update.state.status {
            Status::Running => {
                self.settle = None;
                if self.next_tick.is_none() {
                    self.next_tick = Some(now + self.period);
                }
            }
            Status::Transitioning => {
                self.next_tick = None;
                if let Some(settle) = update.settle {
                    self.settle = Some((now + settle.delay, settle.token));
                }
            }
            Status::Idle | Status::Paused => {
                self.next_tick = None;
                self.settle = None;
            }
        }
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.next_tick, self.settle.map(|(at, _)| at)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Returns the event due at `now`. A due settle wins over a due tick.
    pub fn poll(&mut self, now: Instant) -> Option<TimerEvent> {
        if let Some((at, token)) = self.settle {
            if at <= now {
                self.settle = None;
                return Some(TimerEvent::Settle(token));
            }
        }
        if let Some(at) = self.next_tick {
            if at <= now {
                self.next_tick = Some(at + self.period);
                return Some(TimerEvent::Tick);
            }
        }
        None
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: TimerEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    driver: Driver,
}

impl<E: TimerEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let driver = Driver::new(ticker.interval());
        Self {
            event_source,
            ticker,
            driver,
        }
    }

    /// Feeds an accepted engine update to the driver.
    pub fn track(&mut self, update: &Update) {
        self.driver.track(update, Instant::now());
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Blocks until the next deadline or external event and returns it.
    pub fn step(&mut self) -> TimerEvent {
        loop {
            let now = Instant::now();
            if let Some(ev) = self.driver.poll(now) {
                return ev;
            }

            let deadline = self.driver.next_deadline();
            let wait = deadline
                .map(|at| at.saturating_duration_since(now))
                .unwrap_or_else(|| self.ticker.interval());

            match self.event_source.recv_timeout(wait) {
                Ok(ev) => return ev,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    if deadline.is_none() {
                        return TimerEvent::Closed;
                    }
                    std::thread::sleep(wait);
                }
            }
        }
    }
}
