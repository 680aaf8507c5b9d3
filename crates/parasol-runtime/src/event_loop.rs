//! Timer wheel, per-task message queue, and FD watch registration
//! (`spec.md` §4.7), built on `mio` rather than `tokio`: the kernel's own
//! reactor is a single-threaded cooperative loop, distinct from (and
//! coexisting with) the thread-contending object-lock protocol in
//! `parasol_object::lock`. See `DESIGN.md` for the Open Question
//! resolution that keeps `tokio` out of the kernel's own event loop.

use parasol_errors::ErrorKind;
use parasol_types::{FdDirection, FdFlags, Message, RawFdLike, TaskId};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};

/// `-1` means indefinite, `0` means a non-blocking probe, matching every
/// other timeout convention in this kernel.
pub const TIMEOUT_INDEFINITE: i64 = -1;
pub const TIMEOUT_PROBE: i64 = 0;

pub type TimerId = u32;

/// A subscribed timer. The callback returns `Terminate` to cancel itself;
/// any other return value reschedules at `interval` from now. Missed ticks
/// coalesce: a callback that is late simply receives a larger `elapsed`
/// rather than being invoked multiple times to "catch up".
pub struct TimerEntry {
    pub id: TimerId,
    pub interval: Duration,
    pub callback: Box<dyn FnMut(Duration, Instant) -> parasol_errors::Status + Send>,
    last_fire: Instant,
}

struct ScheduledTimer {
    due: Instant,
    id: TimerId,
}

impl PartialEq for ScheduledTimer {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due
    }
}
impl Eq for ScheduledTimer {}
impl PartialOrd for ScheduledTimer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ScheduledTimer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due.cmp(&other.due)
    }
}

/// A registered FD watch: the callback and the flags it was subscribed
/// with. Registration is idempotent by `(fd, direction)`, per `spec.md`.
struct Watch {
    flags: FdFlags,
    callback: Box<dyn FnMut() + Send>,
    /// Set by a recursive readiness notification that arrived while the
    /// callback for this FD was already running; the loop re-invokes once
    /// the in-flight call returns, matching the "again flag" behaviour
    /// described for FD watches in `spec.md` §4.7.
    again: bool,
    running: bool,
}

/// The kernel's single-threaded cooperative event loop: timer wheel,
/// per-task message queues, and FD watch table, driven by one `mio::Poll`.
pub struct EventLoop {
    poll: mio::Poll,
    events: mio::Events,
    timers: BinaryHeap<Reverse<ScheduledTimer>>,
    timer_table: HashMap<TimerId, TimerEntry>,
    next_timer_id: TimerId,
    watches: HashMap<(RawFdLike, FdDirection), Watch>,
    token_map: HashMap<mio::Token, (RawFdLike, FdDirection)>,
    next_token: usize,
    messages: HashMap<TaskId, VecDeque<Message>>,
    shutdown: bool,
}

impl EventLoop {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            poll: mio::Poll::new()?,
            events: mio::Events::with_capacity(256),
            timers: BinaryHeap::new(),
            timer_table: HashMap::new(),
            next_timer_id: 1,
            watches: HashMap::new(),
            token_map: HashMap::new(),
            next_token: 1,
            messages: HashMap::new(),
            shutdown: false,
        })
    }

    /// `SubscribeTimer(interval, callback) -> timer_handle`.
    pub fn subscribe_timer(
        &mut self,
        interval: Duration,
        callback: impl FnMut(Duration, Instant) -> parasol_errors::Status + Send + 'static,
    ) -> TimerId {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let now = Instant::now();
        self.timer_table
            .insert(id, TimerEntry { id, interval, callback: Box::new(callback), last_fire: now });
        self.timers.push(Reverse(ScheduledTimer { due: now + interval, id }));
        id
    }

    pub fn cancel_timer(&mut self, id: TimerId) {
        self.timer_table.remove(&id);
    }

    /// Fires every timer whose due time has passed, rescheduling unless the
    /// callback returns `Terminate`. Coalesces missed ticks by computing
    /// `elapsed` from the timer's last actual fire rather than stacking up
    /// one invocation per missed interval.
    fn drain_due_timers(&mut self) {
        let now = Instant::now();
        while let Some(Reverse(top)) = self.timers.peek() {
            if top.due > now {
                break;
            }
            let Reverse(scheduled) = self.timers.pop().unwrap();
            let Some(entry) = self.timer_table.get_mut(&scheduled.id) else {
                continue;
            };
            let elapsed = now.duration_since(entry.last_fire);
            let result = (entry.callback)(elapsed, now);
            entry.last_fire = now;
            match result {
                Err(e) if e.kind == ErrorKind::Terminate => {
                    self.timer_table.remove(&scheduled.id);
                }
                _ => {
                    let interval = entry.interval;
                    self.timers.push(Reverse(ScheduledTimer { due: now + interval, id: scheduled.id }));
                }
            }
        }
    }

    fn next_timer_deadline(&self) -> Option<Instant> {
        self.timers.peek().map(|Reverse(t)| t.due)
    }

    /// `RegisterFD(fd, direction|flags, callback, context)`. Idempotent by
    /// `(fd, direction)`: re-registering the same pair replaces the
    /// callback rather than duplicating the watch.
    pub fn register_fd(
        &mut self,
        fd: RawFdLike,
        direction: FdDirection,
        flags: FdFlags,
        callback: impl FnMut() + Send + 'static,
    ) {
        if flags.contains(FdFlags::REMOVE) {
            self.watches.remove(&(fd, direction));
            self.token_map.retain(|_, v| *v != (fd, direction));
            return;
        }
        let key = (fd, direction);
        if !self.watches.contains_key(&key) {
            let token = mio::Token(self.next_token);
            self.next_token += 1;
            self.token_map.insert(token, key);
        }
        self.watches.insert(key, Watch { flags, callback: Box::new(callback), again: false, running: false });
    }

    /// Invokes the callback for a ready FD, honouring the recursion guard:
    /// a callback that is already running just sets `again` instead of
    /// re-entering, and the loop replays it once the outer call returns.
    fn dispatch_fd(&mut self, key: (RawFdLike, FdDirection)) {
        loop {
            let allow_recursion = match self.watches.get(&key) {
                Some(w) if w.running => {
                    if w.flags.contains(FdFlags::ALLOW_RECURSION) {
                        true
                    } else {
                        // Recursion disallowed: mark "more data pending" and
                        // let the in-flight call's own replay loop pick it up.
                        if let Some(w) = self.watches.get_mut(&key) {
                            w.again = true;
                        }
                        return;
                    }
                }
                Some(_) => false,
                None => return,
            };
            let _ = allow_recursion;

            // Take the callback out so calling it doesn't hold a borrow of
            // `self.watches` (the callback may itself call `register_fd`).
            let Some(mut watch) = self.watches.remove(&key) else { return };
            watch.running = true;
            watch.again = false;
            let mut callback = std::mem::replace(&mut watch.callback, Box::new(|| {}));
            self.watches.insert(key, watch);

            callback();

            let Some(watch) = self.watches.get_mut(&key) else { return };
            watch.callback = callback;
            watch.running = false;
            if !watch.again {
                return;
            }
        }
    }

    /// `SendMessage(task_id, type, payload, size)`.
    pub fn send_message(&mut self, task: TaskId, message: Message) {
        self.messages.entry(task).or_default().push_back(message);
    }

    /// `ScanMessages`: allows a handler to peek the queue for a superseding
    /// message of the same `type_id` and drop the stale one, matching the
    /// "supersedable message" behaviour described in `spec.md` §4.7 (e.g.
    /// coalescing redimension events).
    pub fn scan_and_drop_superseded(&mut self, task: TaskId, type_id: u32) {
        if let Some(queue) = self.messages.get_mut(&task) {
            if queue.iter().filter(|m| m.type_id == type_id).count() > 1 {
                let mut seen_last = false;
                let mut retained = VecDeque::with_capacity(queue.len());
                for msg in queue.drain(..).rev() {
                    if msg.type_id == type_id {
                        if seen_last {
                            continue;
                        }
                        seen_last = true;
                    }
                    retained.push_front(msg);
                }
                *queue = retained;
            }
        }
    }

    /// `ProcessMessages(flags, timeout)`: drains and dispatches `task`'s
    /// queue via `handler`.
    pub fn process_messages(&mut self, task: TaskId, mut handler: impl FnMut(Message)) {
        if let Some(queue) = self.messages.get_mut(&task) {
            while let Some(message) = queue.pop_front() {
                handler(message);
            }
        }
    }

    /// Requests a clean shutdown: every subsequent blocking wait returns
    /// `Terminate` at its next check, per `spec.md` §5.
    pub fn request_shutdown(&mut self) {
        self.shutdown = true;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown
    }

    /// Runs one iteration: polls for FD readiness (bounded by the nearest
    /// timer deadline), dispatches ready FDs, then fires due timers.
    /// `timeout_millis` follows the `-1`/`0` convention; `-1` still wakes
    /// early for a due timer.
    pub fn run_once(&mut self, timeout_millis: i64) -> parasol_errors::Status {
        if self.shutdown {
            return Err(parasol_errors::Error::new(ErrorKind::Terminate));
        }

        let requested = match timeout_millis {
            TIMEOUT_INDEFINITE => None,
            TIMEOUT_PROBE => Some(Duration::ZERO),
            ms => Some(Duration::from_millis(ms.max(0) as u64)),
        };
        let timer_bound = self.next_timer_deadline().map(|due| due.saturating_duration_since(Instant::now()));
        let poll_timeout = match (requested, timer_bound) {
            (Some(r), Some(t)) => Some(r.min(t)),
            (Some(r), None) => Some(r),
            (None, Some(t)) => Some(t),
            (None, None) => None,
        };

        self.poll.poll(&mut self.events, poll_timeout).map_err(|_| {
            parasol_errors::Error::new(ErrorKind::SystemCall)
        })?;

        let ready_keys: Vec<_> = self
            .events
            .iter()
            .filter_map(|ev| self.token_map.get(&ev.token()).copied())
            .collect();
        for key in ready_keys {
            self.dispatch_fd(key);
        }

        self.drain_due_timers();

        if self.shutdown {
            return Err(parasol_errors::Error::new(ErrorKind::Terminate));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn timer_fires_and_cancels_on_terminate() {
        let mut loop_ = EventLoop::new().unwrap();
        let ticks = Arc::new(AtomicU32::new(0));
        let ticks2 = ticks.clone();
        loop_.subscribe_timer(Duration::from_millis(1), move |_, _| {
            let n = ticks2.fetch_add(1, Ordering::SeqCst);
            if n >= 2 {
                Err(parasol_errors::Error::new(ErrorKind::Terminate))
            } else {
                Ok(())
            }
        });
        for _ in 0..10 {
            std::thread::sleep(Duration::from_millis(2));
            loop_.run_once(0).ok();
            if ticks.load(Ordering::SeqCst) >= 3 {
                break;
            }
        }
        assert!(ticks.load(Ordering::SeqCst) >= 3);
        assert!(loop_.timer_table.is_empty());
    }

    #[test]
    fn message_queue_is_fifo_per_task() {
        let mut loop_ = EventLoop::new().unwrap();
        loop_.send_message(TaskId(1), Message::new(1, Duration::ZERO, b"a".to_vec()));
        loop_.send_message(TaskId(1), Message::new(2, Duration::ZERO, b"b".to_vec()));
        let mut seen = Vec::new();
        loop_.process_messages(TaskId(1), |m| seen.push(m.type_id));
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn superseded_messages_are_collapsed() {
        let mut loop_ = EventLoop::new().unwrap();
        loop_.send_message(TaskId(1), Message::new(99, Duration::ZERO, b"old".to_vec()));
        loop_.send_message(TaskId(1), Message::new(1, Duration::ZERO, b"mid".to_vec()));
        loop_.send_message(TaskId(1), Message::new(99, Duration::ZERO, b"new".to_vec()));
        loop_.scan_and_drop_superseded(TaskId(1), 99);
        let mut seen = Vec::new();
        loop_.process_messages(TaskId(1), |m| seen.push((m.type_id, m.payload.clone())));
        assert_eq!(seen.len(), 2);
        assert_eq!(&*seen[1].1, b"new");
    }

    #[test]
    fn shutdown_causes_terminate_at_next_check() {
        let mut loop_ = EventLoop::new().unwrap();
        loop_.request_shutdown();
        assert_eq!(loop_.run_once(0).unwrap_err().kind, ErrorKind::Terminate);
    }
}
