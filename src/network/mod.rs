//! The airport network and the reference tables that couple its nodes.
//!
//! `NetworkModel` owns every airport and its SIVR state. Airports are stored in ascending id
//! order and looked up by IATA code through an index, so "all airports" always means the same
//! sequence. The model has no behavior of its own beyond structural queries; the
//! `EpidemicEngine` mutates it.

mod airport;
mod curve;
mod flow;
mod route_graph;

pub use airport::{Airport, Cohort, InfectedCohorts};
pub use curve::TransmissionCurveTable;
pub use flow::{Flow, FlowTable};
pub use route_graph::RouteGraph;

use crate::error::ZikaError;
use crate::{HashMap, HashSet};

#[derive(Clone, Debug, Default)]
pub struct NetworkModel {
    airports: Vec<Airport>,
    index: HashMap<String, usize>,
}

impl NetworkModel {
    /// Builds a network from its airports, ordering them by id.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::ReferenceDataError` if two airports share an id or an IATA code.
    pub fn new(mut airports: Vec<Airport>) -> Result<Self, ZikaError> {
        airports.sort_by_key(|airport| airport.id);

        let mut ids = HashSet::default();
        let mut index = HashMap::default();
        for (position, airport) in airports.iter().enumerate() {
            if !ids.insert(airport.id) {
                return Err(ZikaError::reference_data(
                    "airport network",
                    u64::from(airport.id),
                    format!("duplicate airport id {}", airport.id),
                ));
            }
            if index.insert(airport.code.clone(), position).is_some() {
                return Err(ZikaError::reference_data(
                    "airport network",
                    u64::from(airport.id),
                    format!("duplicate IATA code {}", airport.code),
                ));
            }
        }

        Ok(NetworkModel { airports, index })
    }

    /// Copies every airport's seasonal curve out of `curves`.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::LookupError` for the first airport without a curve.
    pub fn apply_curves(&mut self, curves: &TransmissionCurveTable) -> Result<(), ZikaError> {
        for airport in &mut self.airports {
            airport.curve = *curves.get(&airport.code)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    #[must_use]
    pub fn airport(&self, code: &str) -> Option<&Airport> {
        self.index_of(code).map(|position| &self.airports[position])
    }

    pub fn airport_mut(&mut self, code: &str) -> Option<&mut Airport> {
        let position = self.index_of(code)?;
        Some(&mut self.airports[position])
    }

    #[must_use]
    pub fn airport_by_id(&self, id: u32) -> Option<&Airport> {
        self.airports
            .binary_search_by_key(&id, |airport| airport.id)
            .ok()
            .map(|position| &self.airports[position])
    }

    #[must_use]
    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }

    pub(crate) fn airports_mut(&mut self) -> &mut [Airport] {
        &mut self.airports
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Airport> {
        self.airports.iter()
    }

    /// IATA codes in network order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.airports.iter().map(|airport| airport.code.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    #[must_use]
    pub fn total_population(&self) -> u64 {
        self.airports.iter().map(|airport| airport.population).sum()
    }

    /// Sum of the recovered compartment over all airports: a sweep scenario's severity score.
    #[must_use]
    pub fn total_recovered(&self) -> u64 {
        self.airports.iter().map(|airport| airport.recovered).sum()
    }

    #[must_use]
    pub fn total_infected(&self) -> u64 {
        self.airports
            .iter()
            .map(|airport| airport.infected.total())
            .sum()
    }

    /// Returns every airport to its pre-simulation state.
    pub fn reset(&mut self) {
        for airport in &mut self.airports {
            airport.reset();
        }
    }
}
