use std::time::Duration;

use crate::SkipSet;

/// Settings of one watch run, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub skip: SkipSet,
    pub ignore_failures: bool,
    pub poll_interval: Duration,
    pub render_tick: Duration,
    /// Number of render ticks each spinner frame stays on screen.
    pub frame_period: u64,
    pub workflow_width: usize,
    pub jobs_width: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            skip: SkipSet::default(),
            ignore_failures: false,
            poll_interval: Duration::from_secs(5),
            render_tick: Duration::from_millis(50),
            frame_period: 10,
            workflow_width: 40,
            jobs_width: 60,
        }
    }
}

/// Side effects requested for a passing pull request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionFlags {
    pub merge: bool,
    pub enqueue: bool,
    pub announce: bool,
}
