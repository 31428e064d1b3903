use std::collections::BTreeMap;

use crate::error::ZikaError;
use crate::HashMap;

/// A directed route weight.
#[derive(Clone, Debug, PartialEq)]
pub struct Flow {
    pub destination: String,
    /// Annual passengers from the origin to `destination`.
    pub passengers: f64,
}

/// Directed annual passenger counts between airport codes.
///
/// Entries are indexed by origin, so the airborne pass of a day-step visits every route exactly
/// once. Within an origin, destinations keep their insertion order.
#[derive(Clone, Debug, Default)]
pub struct FlowTable {
    by_origin: BTreeMap<String, Vec<Flow>>,
    positions: HashMap<(String, String), usize>,
}

impl FlowTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the annual passenger count from `origin` to `destination`. A repeated pair replaces
    /// the earlier value.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::ReferenceDataError` if `passengers` is negative or not finite.
    pub fn insert(
        &mut self,
        origin: &str,
        destination: &str,
        passengers: f64,
    ) -> Result<(), ZikaError> {
        if !passengers.is_finite() || passengers < 0.0 {
            return Err(ZikaError::reference_data(
                "flow table",
                0,
                format!("invalid passenger count {passengers} for {origin} -> {destination}"),
            ));
        }

        let flows = self.by_origin.entry(origin.to_string()).or_default();
        let key = (origin.to_string(), destination.to_string());
        match self.positions.get(&key) {
            Some(&position) => flows[position].passengers = passengers,
            None => {
                self.positions.insert(key, flows.len());
                flows.push(Flow {
                    destination: destination.to_string(),
                    passengers,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, origin: &str, destination: &str) -> Option<f64> {
        let position = self
            .positions
            .get(&(origin.to_string(), destination.to_string()))?;
        self.by_origin
            .get(origin)
            .map(|flows| flows[*position].passengers)
    }

    /// Outbound routes of `origin`.
    #[must_use]
    pub fn outbound(&self, origin: &str) -> &[Flow] {
        self.by_origin
            .get(origin)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates over every `(origin, flows)` group in origin order.
    pub fn origins(&self) -> impl Iterator<Item = (&str, &[Flow])> {
        self.by_origin
            .iter()
            .map(|(origin, flows)| (origin.as_str(), flows.as_slice()))
    }

    /// Iterates over every route as `(origin, destination, passengers)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.origins().flat_map(|(origin, flows)| {
            flows
                .iter()
                .map(move |flow| (origin, flow.destination.as_str(), flow.passengers))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
