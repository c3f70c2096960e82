// Cooperative timer queue over an injectable clock
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) -> i64 {
        self.now.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// 1 Hz streaming chart refresh
    ChartRefresh,
    /// 60 s history sufficiency re-check
    EnforcementRecheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Timer {
    handle: TimerHandle,
    kind: TimerKind,
    period_ms: i64,
    next_due_ms: i64,
}

/// Periodic timers driven by whoever owns the event loop.
///
/// Nothing fires on its own: the owner asks for [`Scheduler::next_deadline`],
/// waits (or fast-forwards a [`ManualClock`]), then collects
/// [`Scheduler::take_due`]. Missed periods are coalesced into one tick.
pub struct Scheduler {
    clock: std::sync::Arc<dyn Clock>,
    timers: Vec<Timer>,
    next_id: u64,
    attached: HashMap<TimerKind, u64>,
    detached: HashMap<TimerKind, u64>,
}

impl Scheduler {
    pub fn new(clock: std::sync::Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timers: Vec::new(),
            next_id: 0,
            attached: HashMap::new(),
            detached: HashMap::new(),
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Start a periodic timer; the first tick is one period from now.
    pub fn attach(&mut self, kind: TimerKind, period_ms: i64) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let period_ms = period_ms.max(1);
        self.timers.push(Timer {
            handle,
            kind,
            period_ms,
            next_due_ms: self.clock.now_ms() + period_ms,
        });
        *self.attached.entry(kind).or_default() += 1;
        tracing::debug!("Attached {:?} timer every {}ms", kind, period_ms);
        handle
    }

    /// Cancel a timer. Returns false if it was not active.
    pub fn detach(&mut self, handle: TimerHandle) -> bool {
        let Some(index) = self.timers.iter().position(|t| t.handle == handle) else {
            return false;
        };
        let timer = self.timers.remove(index);
        *self.detached.entry(timer.kind).or_default() += 1;
        tracing::debug!("Detached {:?} timer", timer.kind);
        true
    }

    pub fn detach_all(&mut self) {
        let handles: Vec<TimerHandle> = self.timers.iter().map(|t| t.handle).collect();
        for handle in handles {
            self.detach(handle);
        }
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    pub fn next_deadline(&self) -> Option<i64> {
        self.timers.iter().map(|t| t.next_due_ms).min()
    }

    /// Timers due at the current clock time, earliest first.
    pub fn take_due(&mut self) -> Vec<(TimerHandle, TimerKind)> {
        let now = self.clock.now_ms();
        let mut due: Vec<(i64, TimerHandle, TimerKind)> = Vec::new();

        for timer in &mut self.timers {
            if timer.next_due_ms > now {
                continue;
            }
            due.push((timer.next_due_ms, timer.handle, timer.kind));
            let missed = (now - timer.next_due_ms) / timer.period_ms + 1;
            timer.next_due_ms += missed * timer.period_ms;
        }

        due.sort_by_key(|(at, _, _)| *at);
        due.into_iter().map(|(_, handle, kind)| (handle, kind)).collect()
    }

    pub fn active_count(&self, kind: TimerKind) -> usize {
        self.timers.iter().filter(|t| t.kind == kind).count()
    }

    pub fn attach_count(&self, kind: TimerKind) -> u64 {
        self.attached.get(&kind).copied().unwrap_or(0)
    }

    pub fn detach_count(&self, kind: TimerKind) -> u64 {
        self.detached.get(&kind).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn scheduler_at(start: i64) -> (Arc<ManualClock>, Scheduler) {
        let clock = Arc::new(ManualClock::new(start));
        let scheduler = Scheduler::new(clock.clone());
        (clock, scheduler)
    }

    #[test]
    fn test_timer_fires_after_period() {
        let (clock, mut scheduler) = scheduler_at(0);
        let handle = scheduler.attach(TimerKind::ChartRefresh, 1000);

        assert_eq!(scheduler.next_deadline(), Some(1000));
        clock.set(999);
        assert!(scheduler.take_due().is_empty());
        clock.set(1000);
        assert_eq!(scheduler.take_due(), vec![(handle, TimerKind::ChartRefresh)]);
        assert_eq!(scheduler.next_deadline(), Some(2000));
    }

    #[test]
    fn test_missed_ticks_are_coalesced() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.attach(TimerKind::ChartRefresh, 1000);

        clock.set(10_500);
        assert_eq!(scheduler.take_due().len(), 1);
        assert_eq!(scheduler.next_deadline(), Some(11_000));
    }

    #[test]
    fn test_due_order_follows_deadlines() {
        let (clock, mut scheduler) = scheduler_at(0);
        let recheck = scheduler.attach(TimerKind::EnforcementRecheck, 500);
        let refresh = scheduler.attach(TimerKind::ChartRefresh, 1000);

        clock.set(1000);
        let due = scheduler.take_due();
        assert_eq!(due[0].0, recheck);
        assert_eq!(due[1].0, refresh);
    }

    #[test]
    fn test_attach_detach_accounting() {
        let (_clock, mut scheduler) = scheduler_at(0);
        let first = scheduler.attach(TimerKind::ChartRefresh, 1000);
        assert!(scheduler.detach(first));
        assert!(!scheduler.detach(first));
        scheduler.attach(TimerKind::ChartRefresh, 1000);
        scheduler.attach(TimerKind::EnforcementRecheck, 60_000);

        assert_eq!(scheduler.attach_count(TimerKind::ChartRefresh), 2);
        assert_eq!(scheduler.detach_count(TimerKind::ChartRefresh), 1);
        assert_eq!(scheduler.active_count(TimerKind::ChartRefresh), 1);

        scheduler.detach_all();
        assert_eq!(scheduler.next_deadline(), None);
        assert_eq!(scheduler.detach_count(TimerKind::EnforcementRecheck), 1);
    }
}
