//! A progress bar for sweeps.
//!
//! A sweep runs one scenario per (airport, seed month) pair, which can take a while on a large
//! network. When enabled with `enable_progress_bar()` (the `--progress` command line flag), a
//! custom progress bar labelled "Scenarios" counts completed scenarios. Otherwise every function
//! here is a no-op, which keeps test and library output clean.
//!
//! Only one progress bar can be active at a time; starting a second sweep replaces the bar.
use std::sync::atomic::{AtomicBool, Ordering};

use crate::log::trace;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Turns the sweep progress bar on for the rest of the process.
pub fn enable_progress_bar() {
    ENABLED.store(true, Ordering::Relaxed);
}

#[must_use]
pub fn progress_bar_enabled() -> bool {
    cfg!(feature = "progress_bar") && ENABLED.load(Ordering::Relaxed)
}

/// Starts a progress bar for `scenario_count` scenarios.
pub fn init_scenario_progress_bar(scenario_count: usize) {
    if !progress_bar_enabled() {
        return;
    }
    trace!("initializing scenario progress bar with {scenario_count} scenarios");
    #[cfg(feature = "progress_bar")]
    {
        use progress_bar::{init_progress_bar, set_progress_bar_action, Color, Style};
        init_progress_bar(scenario_count);
        set_progress_bar_action("Scenarios", Color::Blue, Style::Bold);
    }
}

/// Counts one finished scenario.
pub fn increment_progress() {
    if !progress_bar_enabled() {
        return;
    }
    #[cfg(feature = "progress_bar")]
    progress_bar::inc_progress_bar();
}

/// Completes the progress bar.
pub fn finish_progress() {
    if !progress_bar_enabled() {
        return;
    }
    #[cfg(feature = "progress_bar")]
    progress_bar::finalize_progress_bar();
}
