/// Simulated-time timer wheel with tracked, cancellable handles.
///
/// Nothing here reads a wall clock. Time only moves through
/// [`TimerWheel::advance_to`], so a host drives it from its frame loop and
/// tests drive it with arbitrary deltas.
use std::collections::BTreeMap;

/// Handle to a scheduled timer. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer<K> {
    deadline: u64,
    kind: K,
}

#[derive(Debug, Clone)]
pub struct TimerWheel<K> {
    now: u64,
    next_id: u64,
    timers: BTreeMap<TimerId, Timer<K>>,
}

impl<K> Default for TimerWheel<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TimerWheel<K> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_id: 0,
            timers: BTreeMap::new(),
        }
    }

    /// Current simulated time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule(&mut self, delay_ms: u64, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(
            id,
            Timer {
                deadline: self.now.saturating_add(delay_ms),
                kind,
            },
        );
        id
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    /// Cancel `slot`'s timer, if any, and clear the slot.
    pub fn cancel_slot(&mut self, slot: &mut Option<TimerId>) {
        if let Some(id) = slot.take() {
            self.cancel(id);
        }
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Pop the earliest timer due at or before `target`, moving the clock
    /// to its deadline. Ties fire in scheduling order. Returns `None` and
    /// moves the clock to `target` once nothing else is due.
    ///
    /// Callers loop on this rather than collecting all due timers up front,
    /// so a timer cancelled by an earlier callback in the same advance
    /// never fires.
    pub fn advance_to(&mut self, target: u64) -> Option<(TimerId, K)> {
        let next = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= target)
            .min_by_key(|(id, t)| (t.deadline, **id))
            .map(|(id, _)| *id);

        match next {
            Some(id) => {
                let timer = self.timers.remove(&id)?;
                self.now = self.now.max(timer.deadline);
                Some((id, timer.kind))
            }
            None => {
                self.now = self.now.max(target);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut wheel = TimerWheel::new();
        wheel.schedule(300, "c");
        wheel.schedule(100, "a");
        wheel.schedule(200, "b");

        let mut fired = Vec::new();
        while let Some((_, kind)) = wheel.advance_to(1_000) {
            fired.push((kind, wheel.now()));
        }
        assert_eq!(fired, vec![("a", 100), ("b", 200), ("c", 300)]);
        assert_eq!(wheel.now(), 1_000);
    }

    #[test]
    fn ties_fire_in_schedule_order() {
        let mut wheel = TimerWheel::new();
        wheel.schedule(50, 1);
        wheel.schedule(50, 2);
        assert_eq!(wheel.advance_to(50).map(|(_, k)| k), Some(1));
        assert_eq!(wheel.advance_to(50).map(|(_, k)| k), Some(2));
        assert!(wheel.advance_to(50).is_none());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut wheel = TimerWheel::new();
        let id = wheel.schedule(100, ());
        assert!(wheel.cancel(id));
        assert!(!wheel.cancel(id));
        assert!(wheel.advance_to(10_000).is_none());
        assert!(!wheel.is_pending(id));
    }

    #[test]
    fn not_yet_due_stays_pending() {
        let mut wheel = TimerWheel::new();
        let id = wheel.schedule(500, ());
        assert!(wheel.advance_to(499).is_none());
        assert!(wheel.is_pending(id));
        assert_eq!(wheel.now(), 499);
        assert!(wheel.advance_to(500).is_some());
    }

    #[test]
    fn schedule_is_relative_to_now() {
        let mut wheel = TimerWheel::new();
        while wheel.advance_to(1_000).is_some() {}
        wheel.schedule(10, "late");
        assert!(wheel.advance_to(1_009).is_none());
        assert_eq!(wheel.advance_to(1_010).map(|(_, k)| k), Some("late"));
    }

    #[test]
    fn cancel_slot_clears() {
        let mut wheel = TimerWheel::new();
        let mut slot = Some(wheel.schedule(10, ()));
        wheel.cancel_slot(&mut slot);
        assert!(slot.is_none());
        assert_eq!(wheel.pending(), 0);
    }
}
