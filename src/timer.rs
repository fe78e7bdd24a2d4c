/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The source of delay and sound timer ticks.
//!
//! The Chip-8 timers count down at 60 Hz.  By default the interpreter assumes
//! that it is stepped at a known, fixed host rate and subtracts the number of
//! 60 Hz ticks that fit in one host step; this reproduces the timing most
//! existing programs were tuned against, but drifts if the host's real rate
//! wanders.  The wall-clock mode measures actual elapsed time instead.

use std::num::Wrapping;

use time;

/// The rate at which the delay and sound timers count down, in Hz.
pub const TIMER_FREQ: u32 = 60;

/// How timer ticks are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Every step counts as `1 / refresh_rate` seconds.
    HostRate,
    /// Ticks are counted from a monotonic clock.
    WallClock,
    /// The timers never count down.
    Disabled,
}

/// A basic timer.
#[derive(Debug)]
pub struct Timer {
    /// How ticks are produced.
    mode: TimerMode,
    /// The number of ticks per step in `HostRate` mode.
    ticks_per_step: u32,
    /// An internal number of ticks, used in `WallClock` mode.
    ticks: Wrapping<u32>,
}

impl Timer {
    /// Returns a new timer for a host stepping at `refresh_rate` Hz.
    pub fn new(mode: TimerMode, refresh_rate: u32) -> Self {
        // Round half up, so that 30 Hz hosts still see one tick per step.
        let ticks_per_step = refresh_rate.saturating_add(TIMER_FREQ / 2) / TIMER_FREQ;
        if mode == TimerMode::HostRate && ticks_per_step == 0 {
            warn!(
                "host rate of {} Hz is too low to drive the timers; they will not count down",
                refresh_rate
            );
        }

        let mut timer = Timer {
            mode,
            ticks_per_step,
            ticks: Wrapping(0),
        };
        timer.update();
        timer
    }

    /// Returns the number of ticks which have elapsed since the last call to
    /// this method (or the creation of the timer).
    pub fn lap(&mut self) -> u32 {
        match self.mode {
            TimerMode::HostRate => self.ticks_per_step,
            TimerMode::WallClock => {
                let old = self.ticks;
                self.update();
                (self.ticks - old).0
            }
            TimerMode::Disabled => 0,
        }
    }

    /// Updates the internal tick count from the clock.
    fn update(&mut self) {
        if self.mode == TimerMode::WallClock {
            self.ticks = Wrapping(ticks_at(time::precise_time_ns()));
        }
    }
}

/// Returns the number of timer periods in `ns` nanoseconds, truncated to 32
/// bits.
fn ticks_at(ns: u64) -> u32 {
    const NS_PER_SEC: u64 = 1_000_000_000;
    let freq = TIMER_FREQ as u64;
    (ns / NS_PER_SEC * freq + ns % NS_PER_SEC * freq / NS_PER_SEC) as u32
}
