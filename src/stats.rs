//! Capture of per-tick SIVR series and their reduction to monthly peaks.
//!
//! The engine reports every airport's state at the start of each day-step through the
//! [`StepObserver`] trait. [`TimeSeries`] keeps those snapshots, one series per airport, aligned
//! with the list of active ticks. [`TimeSeries::monthly_peak_ratios`] then folds them into twelve
//! per-month maxima of the infected share, rotated so index 0 is the seeding month.
use std::collections::BTreeMap;

use crate::network::NetworkModel;
use crate::{month_of_day, MONTHS_IN_YEAR};

/// An airport's compartments at one tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub susceptible: u64,
    pub infected: u64,
    pub vaccinated: u64,
    pub recovered: u64,
}

/// Receives the state of every airport at the start of each day-step.
pub trait StepObserver {
    /// Called once per step before any airport is recorded.
    fn begin_step(&mut self, _day: i64) {}

    /// Called once per airport per step, in network order, before the airport is mutated.
    fn record(&mut self, airport_index: usize, snapshot: Snapshot);
}

/// Discards everything. Sweep scenarios only need the final state.
impl StepObserver for () {
    fn record(&mut self, _airport_index: usize, _snapshot: Snapshot) {}
}

/// Series recorded over a run: the active ticks and, per airport, one snapshot per tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    codes: Vec<String>,
    populations: Vec<u64>,
    ticks: Vec<i64>,
    series: Vec<Vec<Snapshot>>,
}

/// Per-month maxima of `I / population` for one airport.
#[derive(Clone, Debug, PartialEq)]
pub struct MonthlyPeaks {
    pub code: String,
    /// Index 0 is the seeding month, index 1 the month after, and so on.
    pub ratios: [f64; MONTHS_IN_YEAR],
}

/// Headline numbers for one airport over a run.
#[derive(Clone, Debug, PartialEq)]
pub struct AirportSummary {
    pub code: String,
    pub peak_infected: u64,
    pub peak_day: Option<i64>,
    pub last: Snapshot,
}

impl TimeSeries {
    /// Creates an empty series with one slot per airport of `network`.
    #[must_use]
    pub fn for_network(network: &NetworkModel) -> Self {
        TimeSeries {
            codes: network.codes().map(str::to_string).collect(),
            populations: network.iter().map(|airport| airport.population).collect(),
            ticks: Vec::new(),
            series: vec![Vec::new(); network.len()],
        }
    }

    /// Days on which a step ran, in order.
    #[must_use]
    pub fn ticks(&self) -> &[i64] {
        &self.ticks
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    #[must_use]
    pub fn series(&self, code: &str) -> Option<&[Snapshot]> {
        let position = self.codes.iter().position(|c| c == code)?;
        Some(&self.series[position])
    }

    /// Iterates `(code, snapshots)` in network order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Snapshot])> {
        self.codes
            .iter()
            .map(String::as_str)
            .zip(self.series.iter().map(Vec::as_slice))
    }

    /// Reduces every airport's series to the maximum infected share per calendar month, rotated
    /// so that `ratios[0]` is `seed_month`. Months without ticks stay at 0.
    #[must_use]
    pub fn monthly_peak_ratios(&self, seed_month: usize) -> Vec<MonthlyPeaks> {
        self.codes
            .iter()
            .zip(&self.populations)
            .zip(&self.series)
            .map(|((code, &population), snapshots)| {
                let mut ratios = [0.0; MONTHS_IN_YEAR];
                for (day, snapshot) in self.ticks.iter().zip(snapshots) {
                    if population == 0 {
                        continue;
                    }
                    let ratio = snapshot.infected as f64 / population as f64;
                    let offset =
                        (month_of_day(*day) + MONTHS_IN_YEAR - seed_month % MONTHS_IN_YEAR)
                            % MONTHS_IN_YEAR;
                    if ratios[offset] < ratio {
                        ratios[offset] = ratio;
                    }
                }
                MonthlyPeaks {
                    code: code.clone(),
                    ratios,
                }
            })
            .collect()
    }

    /// Peak infected count, the tick it occurred on, and the last recorded state of `code`.
    #[must_use]
    pub fn summary(&self, code: &str) -> Option<AirportSummary> {
        let snapshots = self.series(code)?;
        let peak = self
            .ticks
            .iter()
            .zip(snapshots)
            .fold(None, |best: Option<(i64, u64)>, (&day, snapshot)| match best {
                Some((_, infected)) if infected >= snapshot.infected => best,
                _ => Some((day, snapshot.infected)),
            });
        Some(AirportSummary {
            code: code.to_string(),
            peak_infected: peak.map_or(0, |(_, infected)| infected),
            peak_day: peak.map(|(day, _)| day),
            last: snapshots.last().copied().unwrap_or_default(),
        })
    }

    /// Final recovered count per airport, keyed by code.
    #[must_use]
    pub fn final_recovered(&self) -> BTreeMap<String, u64> {
        self.iter()
            .map(|(code, snapshots)| {
                (
                    code.to_string(),
                    snapshots.last().map_or(0, |snapshot| snapshot.recovered),
                )
            })
            .collect()
    }
}

impl StepObserver for TimeSeries {
    fn begin_step(&mut self, day: i64) {
        self.ticks.push(day);
    }

    fn record(&mut self, airport_index: usize, snapshot: Snapshot) {
        self.series[airport_index].push(snapshot);
    }
}
