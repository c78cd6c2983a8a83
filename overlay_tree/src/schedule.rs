// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-staggered rebuild scheduling.
//!
//! A placement stays valid for a number of frames that grows with the number
//! of placed handles, then goes dirty and is rebuilt. Explicit invalidation
//! forces a rebuild on the next frame regardless of the counter.

/// Handle-count thresholds and the rebuild periods they select.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameSchedule {
    /// Below this many handles the short period applies.
    pub few_handles: usize,
    /// Above this many handles the long period applies.
    pub many_handles: usize,
    /// Frames between rebuilds for small scenes.
    pub short_period: u32,
    /// Frames between rebuilds otherwise.
    pub default_period: u32,
    /// Frames between rebuilds for crowded scenes.
    pub long_period: u32,
}

impl Default for FrameSchedule {
    fn default() -> Self {
        Self {
            few_handles: 100,
            many_handles: 1000,
            short_period: 5,
            default_period: 10,
            long_period: 15,
        }
    }
}

impl FrameSchedule {
    /// Rebuild period for `handle_count` placed handles.
    pub fn period_for(&self, handle_count: usize) -> u32 {
        if handle_count < self.few_handles {
            self.short_period
        } else if handle_count > self.many_handles {
            self.long_period
        } else {
            self.default_period
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FrameState {
    Dirty,
    Stable(u32),
}

/// `Dirty -> Stable(0) -> Stable(1) -> ... -> Dirty`.
#[derive(Clone, Debug)]
pub(crate) struct FrameCounter {
    state: FrameState,
    period: u32,
    schedule: FrameSchedule,
}

impl FrameCounter {
    pub(crate) fn new(schedule: FrameSchedule) -> Self {
        Self {
            state: FrameState::Dirty,
            period: schedule.default_period,
            schedule,
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.state == FrameState::Dirty
    }

    pub(crate) fn invalidate(&mut self) {
        self.state = FrameState::Dirty;
    }

    /// Start a fresh stable run. Invalidations after this point survive it.
    pub(crate) fn mark_stable(&mut self) {
        self.state = FrameState::Stable(0);
    }

    pub(crate) fn period(&self) -> u32 {
        self.period
    }

    /// Advance one frame. Returns true if a rebuild is due.
    pub(crate) fn tick(&mut self, handle_count: usize) -> bool {
        let FrameState::Stable(k) = self.state else {
            return true;
        };
        if k == 0 {
            self.period = self.schedule.period_for(handle_count);
        }
        let k = k + 1;
        self.state = if k >= self.period {
            FrameState::Dirty
        } else {
            FrameState::Stable(k)
        };
        self.is_dirty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stable_frames(counter: &mut FrameCounter, handle_count: usize) -> u32 {
        let mut n = 0;
        while !counter.tick(handle_count) {
            n += 1;
            assert!(n < 1000, "counter never went dirty");
        }
        n
    }

    #[test]
    fn period_follows_handle_count() {
        let s = FrameSchedule::default();
        assert_eq!(s.period_for(0), 5);
        assert_eq!(s.period_for(99), 5);
        assert_eq!(s.period_for(100), 10);
        assert_eq!(s.period_for(1000), 10);
        assert_eq!(s.period_for(1001), 15);
    }

    #[test]
    fn dirty_counter_reports_immediately() {
        let mut c = FrameCounter::new(FrameSchedule::default());
        assert!(c.tick(0), "a new counter is dirty");
        assert!(c.tick(0), "ticking does not clear dirtiness");
    }

    #[test]
    fn stable_run_length_is_recomputed_per_run() {
        let mut c = FrameCounter::new(FrameSchedule::default());
        c.mark_stable();
        assert_eq!(stable_frames(&mut c, 5000), 14);
        assert_eq!(c.period(), 15);

        c.mark_stable();
        assert_eq!(stable_frames(&mut c, 3), 4);
        assert_eq!(c.period(), 5);
    }

    #[test]
    fn invalidate_cuts_a_stable_run_short() {
        let mut c = FrameCounter::new(FrameSchedule::default());
        c.mark_stable();
        assert!(!c.tick(0), "first stable frame");
        c.invalidate();
        assert!(c.tick(0), "invalidated counter is dirty");
    }
}
