use std::collections::VecDeque;

use crate::month_of_day;
use crate::MONTHS_IN_YEAR;

/// A group of people infected on the same simulated day. They recover together.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cohort {
    pub day: i64,
    pub size: u64,
}

/// The infected compartment of one airport.
///
/// Cohorts are kept oldest first, in the order they were infected. `newest_size` is the size of the most recently added cohort
/// and is the only part of the infected pool that drives local transmission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfectedCohorts {
    total: u64,
    newest_size: u64,
    cohorts: VecDeque<Cohort>,
}

impl InfectedCohorts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn newest_size(&self) -> u64 {
        self.newest_size
    }

    #[must_use]
    pub fn oldest(&self) -> Option<&Cohort> {
        self.cohorts.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cohort> {
        self.cohorts.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    /// Appends the cohort infected on `day`, which becomes the newest cohort.
    ///
    /// Cohorts are kept in the order they were added. Day stamps increase along the queue except
    /// after a sweep wraps its day index back to the start of the run, where they restart.
    pub fn push(&mut self, day: i64, size: u64) {
        self.cohorts.push_back(Cohort { day, size });
        self.total += size;
        self.newest_size = size;
    }

    /// Appends the single forced infection of a seeding event. Unlike `push`, the newest-cohort
    /// marker is incremented rather than replaced.
    pub(crate) fn push_seed(&mut self, day: i64) {
        let newest_size = self.newest_size + 1;
        self.push(day, 1);
        self.newest_size = newest_size;
    }

    /// Removes the oldest cohort and returns it. If its size equals the newest-cohort marker the
    /// marker is cleared.
    pub fn pop_oldest(&mut self) -> Option<Cohort> {
        let cohort = self.cohorts.pop_front()?;
        self.total -= cohort.size;
        if cohort.size == self.newest_size {
            self.newest_size = 0;
        }
        Some(cohort)
    }
}

/// An airport node: identity, location and SIVR state.
#[derive(Clone, Debug, PartialEq)]
pub struct Airport {
    pub id: u32,
    pub name: String,
    /// IATA code; the key into the flow and curve tables.
    pub code: String,
    pub lat: f64,
    pub lon: f64,
    pub population: u64,
    pub susceptible: u64,
    pub vaccinated: u64,
    pub recovered: u64,
    pub infected: InfectedCohorts,
    /// Infections that arrived by air during the current step. Reset at the end of every step.
    pub in_transit: f64,
    /// Mosquito-activity multiplier for each calendar month.
    pub curve: [f64; MONTHS_IN_YEAR],
}

impl Airport {
    /// Creates a fully susceptible airport with a flat transmission curve of 1.0. The curve is
    /// replaced from the curve table when the network is assembled.
    #[must_use]
    pub fn new(id: u32, name: &str, code: &str, lat: f64, lon: f64, population: u64) -> Self {
        Airport {
            id,
            name: name.to_string(),
            code: code.to_string(),
            lat,
            lon,
            population,
            susceptible: population,
            vaccinated: 0,
            recovered: 0,
            infected: InfectedCohorts::new(),
            in_transit: 0.0,
            curve: [1.0; MONTHS_IN_YEAR],
        }
    }

    /// Restores the pre-simulation state: everyone susceptible, nobody infected.
    pub fn reset(&mut self) {
        self.susceptible = self.population;
        self.vaccinated = 0;
        self.recovered = 0;
        self.infected = InfectedCohorts::new();
        self.in_transit = 0.0;
    }

    /// Current infected share of the population; zero for an unpopulated airport.
    #[must_use]
    pub fn prevalence(&self) -> f64 {
        if self.population == 0 {
            0.0
        } else {
            self.infected.total() as f64 / self.population as f64
        }
    }

    #[must_use]
    pub fn curve_for_day(&self, day: i64) -> f64 {
        self.curve[month_of_day(day)]
    }

    /// `S + V + R + I`, which must always equal `population`.
    #[must_use]
    pub fn accounted_population(&self) -> u64 {
        self.susceptible + self.vaccinated + self.recovered + self.infected.total()
    }
}
