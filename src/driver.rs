//! Sequences day-steps into runs.
//!
//! A single run steps through `start_day..start_day + run_length`, but only on "active ticks":
//! days that are a multiple of the incubation period, plus the seeding day. A sweep repeats a
//! year-long run for every airport as seed city and twelve seed days, one per 31-day block, and
//! scores each scenario by the total recovered population at the end.
//!
//! The driver keeps a pristine copy of the network. Every run works on its own clone, so nothing
//! leaks from one scenario into the next and sweep scenarios can run on separate threads.
use std::collections::BTreeMap;
use std::thread;
use std::time::Instant;

use humantime::format_duration;

use crate::engine::{EpidemicEngine, Policy};
use crate::error::ZikaError;
use crate::log::{debug, info};
use crate::network::{FlowTable, NetworkModel, RouteGraph};
use crate::parameters::Parameters;
use crate::progress::{finish_progress, increment_progress, init_scenario_progress_bar};
use crate::stats::{MonthlyPeaks, StepObserver, TimeSeries};
use crate::{month_of_day, DAYS_IN_MONTH, DAYS_IN_YEAR, MONTH_NAMES};

/// Where and when the first infection is introduced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scenario {
    pub seed_city: String,
    pub infection_day: i64,
}

impl Scenario {
    #[must_use]
    pub fn seed_month(&self) -> usize {
        month_of_day(self.infection_day)
    }
}

/// The result of a single run.
#[derive(Clone, Debug)]
pub struct SingleRunOutput {
    pub scenario: Scenario,
    /// Network state after the last step.
    pub network: NetworkModel,
    pub series: TimeSeries,
}

impl SingleRunOutput {
    /// Monthly infected-share peaks of every airport, with index 0 at the seeding month.
    #[must_use]
    pub fn monthly_peaks(&self) -> Vec<MonthlyPeaks> {
        self.series.monthly_peak_ratios(self.scenario.seed_month())
    }
}

/// Severity scores of a sweep: for every seed airport, the total recovered population at the
/// end of each of the twelve seed-day scenarios.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepResults {
    seed_days: Vec<i64>,
    scores: BTreeMap<String, Vec<u64>>,
}

impl SweepResults {
    /// The seed days tried for every airport, in score order.
    #[must_use]
    pub fn seed_days(&self) -> &[i64] {
        &self.seed_days
    }

    #[must_use]
    pub fn scores(&self, code: &str) -> Option<&[u64]> {
        self.scores.get(code).map(Vec::as_slice)
    }

    /// Iterates `(code, scores)` in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.scores
            .iter()
            .map(|(code, scores)| (code.as_str(), scores.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// The most severe scenario as `(code, seed day, score)`. Ties go to the first in code and
    /// seed-day order.
    #[must_use]
    pub fn worst(&self) -> Option<(&str, i64, u64)> {
        let mut worst: Option<(&str, i64, u64)> = None;
        for (code, scores) in self.iter() {
            for (&day, &score) in self.seed_days.iter().zip(scores) {
                if worst.map_or(true, |(_, _, best)| score > best) {
                    worst = Some((code, day, score));
                }
            }
        }
        worst
    }
}

/// The seed days of a sweep: day 1 and then every 31 days within the year.
#[must_use]
pub fn sweep_seed_days() -> Vec<i64> {
    (1..DAYS_IN_YEAR).step_by(DAYS_IN_MONTH as usize).collect()
}

pub struct SimulationDriver {
    network: NetworkModel,
    routes: RouteGraph,
    engine: EpidemicEngine,
    parameters: Parameters,
}

impl SimulationDriver {
    /// Validates `parameters` against the network and resolves the flow table.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::ConfigurationError` for invalid parameters and
    /// `ZikaError::LookupError` for routes that name unknown airports.
    pub fn new(
        network: NetworkModel,
        flows: &FlowTable,
        parameters: Parameters,
    ) -> Result<Self, ZikaError> {
        let parameters = parameters.resolved();
        parameters.validate_for(&network)?;
        let engine = EpidemicEngine::new(&network, flows, Policy::from_parameters(&parameters))?;
        let routes = RouteGraph::from_flow_table(&network, flows)?;
        info!(
            "network of {} airports, {} routes ({} directed flows)",
            network.len(),
            routes.edge_count(),
            flows.len()
        );
        Ok(SimulationDriver {
            network,
            routes,
            engine,
            parameters,
        })
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub fn network(&self) -> &NetworkModel {
        &self.network
    }

    #[must_use]
    pub fn route_graph(&self) -> &RouteGraph {
        &self.routes
    }

    /// The scenario configured by the parameters.
    #[must_use]
    pub fn configured_scenario(&self) -> Scenario {
        Scenario {
            seed_city: self.parameters.seed_city.clone(),
            infection_day: self.parameters.infection_day,
        }
    }

    fn is_active_tick(&self, day: i64, scenario: &Scenario) -> bool {
        day.rem_euclid(self.parameters.incubation_period) == 0 || day == scenario.infection_day
    }

    /// Runs the configured scenario from `start_day` for `run_length` days, recording a
    /// snapshot of every airport at every active tick.
    #[must_use]
    pub fn run_single(&self) -> SingleRunOutput {
        let scenario = self.configured_scenario();
        let started = Instant::now();
        info!(
            "single run: seeding {} on day {} ({})",
            scenario.seed_city,
            scenario.infection_day,
            MONTH_NAMES[scenario.seed_month()]
        );

        let mut network = self.network.clone();
        let mut series = TimeSeries::for_network(&network);
        let start = self.parameters.start_day;
        for day in start..start + self.parameters.run_length {
            if self.is_active_tick(day, &scenario) {
                self.engine.step(&mut network, day, &scenario, &mut series);
            }
        }

        info!(
            "single run finished after {} ticks in {}",
            series.ticks().len(),
            format_duration(started.elapsed())
        );
        SingleRunOutput {
            scenario,
            network,
            series,
        }
    }

    /// Runs a year of day-steps for `scenario` on a fresh copy of the network, starting at the
    /// seed day and wrapping day indices modulo `run_length`. Returns the final network.
    pub fn run_scenario(&self, scenario: &Scenario, observer: &mut impl StepObserver) -> NetworkModel {
        let mut network = self.network.clone();
        network.reset();
        let first = scenario.infection_day;
        for day in first..first + DAYS_IN_YEAR {
            let day = day % self.parameters.run_length;
            if self.is_active_tick(day, scenario) {
                self.engine.step(&mut network, day, scenario, observer);
            }
        }
        network
    }

    /// Severity scores of the twelve seed days for one seed airport.
    fn sweep_airport(&self, code: &str, seed_days: &[i64]) -> Vec<u64> {
        if let Some(airport) = self.network.airport(code) {
            debug!(
                "sweeping {code} ({} connected airports)",
                self.routes.degree(airport.id)
            );
        }
        seed_days
            .iter()
            .map(|&infection_day| {
                let scenario = Scenario {
                    seed_city: code.to_string(),
                    infection_day,
                };
                let severity = self.run_scenario(&scenario, &mut ()).total_recovered();
                debug!("scenario {code} day {infection_day}: severity {severity}");
                increment_progress();
                severity
            })
            .collect()
    }

    /// Scores every (airport, seed day) scenario. Work is split across `parameters.threads`
    /// threads; results are keyed by airport so they do not depend on completion order.
    #[must_use]
    pub fn sweep(&self) -> SweepResults {
        let seed_days = sweep_seed_days();
        let codes: Vec<&str> = self.network.codes().collect();
        let started = Instant::now();
        info!(
            "sweep: {} airports x {} seed days on {} thread(s)",
            codes.len(),
            seed_days.len(),
            self.parameters.threads
        );
        init_scenario_progress_bar(codes.len() * seed_days.len());

        let workers = self.parameters.threads.min(codes.len()).max(1);
        let chunk_size = codes.len().div_ceil(workers).max(1);
        let scores: BTreeMap<String, Vec<u64>> = if workers == 1 {
            codes
                .iter()
                .map(|code| (code.to_string(), self.sweep_airport(code, &seed_days)))
                .collect()
        } else {
            thread::scope(|scope| {
                let handles: Vec<_> = codes
                    .chunks(chunk_size)
                    .map(|chunk| {
                        let seed_days = &seed_days;
                        scope.spawn(move || {
                            chunk
                                .iter()
                                .map(|code| (code.to_string(), self.sweep_airport(code, seed_days)))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .flat_map(|handle| match handle.join() {
                        Ok(results) => results,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect()
            })
        };

        finish_progress();
        info!("sweep finished in {}", format_duration(started.elapsed()));
        SweepResults { seed_days, scores }
    }
}
