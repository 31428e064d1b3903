//! A discrete-day simulation of mosquito-borne infection spreading across an airport network.
//!
//! Every airport carries a Susceptible–Infected–Vaccinated–Recovered ("SIVR") population.
//! Airports are coupled by passenger flow: each day-step, a share of the daily passengers leaving
//! an airport proportional to its current prevalence arrives at the destination as imported
//! infections. Local transmission is scaled by a seasonal mosquito-activity curve with one
//! multiplier per calendar month.
//!
//! The pieces, leaves first:
//! * [`network`] holds the airports and their epidemiological state, the directed passenger
//!   [`FlowTable`], the seasonal [`TransmissionCurveTable`] and the undirected [`RouteGraph`].
//! * [`engine`] advances the whole network by one day ([`EpidemicEngine::step`]).
//! * [`driver`] runs a single scenario, or sweeps every airport × seed month to rank the worst
//!   seeding conditions.
//! * [`stats`] captures per-tick series and reshapes them into per-month peaks aligned to the
//!   seeding month.
//!
//! Around the core, [`loader`] reads the reference data, [`report`] writes CSV output and
//! [`runner`] is the command line front end.
pub mod driver;
pub mod engine;
pub mod error;
pub mod loader;
pub mod log;
pub mod network;
pub mod parameters;
pub mod progress;
pub mod report;
pub mod runner;
pub mod stats;

pub use driver::{Scenario, SimulationDriver, SingleRunOutput, SweepResults};
pub use engine::EpidemicEngine;
pub use error::ZikaError;
pub use network::{
    Airport, Cohort, FlowTable, InfectedCohorts, NetworkModel, RouteGraph, TransmissionCurveTable,
};
pub use parameters::Parameters;
pub use stats::{Snapshot, TimeSeries};

// Deterministic hashing so no iteration order ever depends on a per-process random seed.
pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// Days per simulated month; the calendar month of day `t` is `(t / 31) % 12`.
pub const DAYS_IN_MONTH: i64 = 31;
pub const MONTHS_IN_YEAR: usize = 12;
pub const DAYS_IN_YEAR: i64 = 365;

pub const MONTH_NAMES: [&str; MONTHS_IN_YEAR] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Returns the calendar month index (0..12) of a simulation day.
#[must_use]
pub fn month_of_day(day: i64) -> usize {
    // `rem_euclid` keeps the index in range if a caller ever passes a negative day.
    (day.div_euclid(DAYS_IN_MONTH)).rem_euclid(MONTHS_IN_YEAR as i64) as usize
}
