//! One day-step of the SIVR dynamics over the whole network.
//!
//! A step runs in two passes. The airborne pass imports infections along every route, sized by
//! the origin's prevalence at the start of the step. The local pass then visits every airport in
//! network order and applies, in this fixed order: snapshot, recovery of the oldest cohort,
//! vaccination, the seeding event, new local transmission, and clearing of the imported count.
//! The local pass of one airport never reads another airport, so the order of airports does not
//! change the outcome.
use crate::driver::Scenario;
use crate::error::ZikaError;
use crate::log::{info, trace, warn};
use crate::network::{Airport, FlowTable, NetworkModel};
use crate::parameters::Parameters;
use crate::stats::{Snapshot, StepObserver};
use crate::{month_of_day, DAYS_IN_YEAR, MONTH_NAMES};

/// Policy parameters that stay constant for a run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Policy {
    pub tau: f64,
    pub incubation_period: i64,
    pub recovery_period: i64,
    /// Vaccination rate, or `None` when vaccination is off.
    pub vaccination_rate: Option<f64>,
    pub screen_rate: f64,
}

impl Policy {
    #[must_use]
    pub fn from_parameters(parameters: &Parameters) -> Self {
        Policy {
            tau: parameters.tau,
            incubation_period: parameters.incubation_period,
            recovery_period: parameters.recovery_period,
            vaccination_rate: parameters
                .vaccinate
                .then(|| parameters.effective_vaccination_rate()),
            screen_rate: parameters.screen_rate,
        }
    }

    /// Age, in days, at which a cohort recovers.
    #[must_use]
    pub fn recovery_age(&self) -> i64 {
        self.recovery_period.saturating_add(self.incubation_period)
    }
}

/// A route resolved to airport positions.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Route {
    origin: usize,
    destination: usize,
    passengers: f64,
}

/// Applies day-steps to a `NetworkModel`. The engine holds no epidemiological state; it can be
/// shared by any number of scenarios, each with its own copy of the network.
#[derive(Clone, Debug)]
pub struct EpidemicEngine {
    policy: Policy,
    /// Grouped by origin.
    routes: Vec<Route>,
}

/// Rounds a fractional head count up. Non-positive amounts are zero people.
fn ceil_count(amount: f64) -> u64 {
    if amount > 0.0 {
        amount.ceil() as u64
    } else {
        0
    }
}

impl EpidemicEngine {
    /// Resolves every route of `flows` against `network`.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::LookupError` if a route names an airport that is not in `network`.
    /// This is checked here so that no step ever runs against incomplete data.
    pub fn new(network: &NetworkModel, flows: &FlowTable, policy: Policy) -> Result<Self, ZikaError> {
        let mut routes = Vec::with_capacity(flows.len());
        for (origin, outbound) in flows.origins() {
            let origin_index = network
                .index_of(origin)
                .ok_or_else(|| ZikaError::lookup("airport network", origin))?;
            for flow in outbound {
                let destination_index = network
                    .index_of(&flow.destination)
                    .ok_or_else(|| ZikaError::lookup("airport network", &flow.destination))?;
                routes.push(Route {
                    origin: origin_index,
                    destination: destination_index,
                    passengers: flow.passengers,
                });
            }
        }
        Ok(EpidemicEngine { policy, routes })
    }

    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Advances `network` by one day-step at `day`, reporting each airport's pre-step state to
    /// `observer`.
    pub fn step(
        &self,
        network: &mut NetworkModel,
        day: i64,
        scenario: &Scenario,
        observer: &mut impl StepObserver,
    ) {
        let imported = self.airborne_imports(network);
        for (airport, arrivals) in network.airports_mut().iter_mut().zip(imported) {
            airport.in_transit += arrivals;
        }

        observer.begin_step(day);
        for (index, airport) in network.airports_mut().iter_mut().enumerate() {
            observer.record(index, snapshot(airport));
            self.recover(airport, day);
            self.vaccinate(airport);
            if day == scenario.infection_day && airport.code == scenario.seed_city {
                seed(airport, day);
            }
            self.transmit(airport, day);
            airport.in_transit = 0.0;
        }
    }

    /// Infections arriving at each airport today:
    /// `ceil(I / population × passengers / 365) × (1 - screen_rate)` summed over inbound routes.
    fn airborne_imports(&self, network: &NetworkModel) -> Vec<f64> {
        let airports = network.airports();
        let mut imported = vec![0.0; airports.len()];
        for route in &self.routes {
            let origin = &airports[route.origin];
            if origin.population == 0 {
                continue;
            }
            let load = origin.infected.total() as f64 / origin.population as f64
                * route.passengers
                / DAYS_IN_YEAR as f64;
            imported[route.destination] +=
                ceil_count(load) as f64 * (1.0 - self.policy.screen_rate);
        }
        imported
    }

    /// Moves the oldest cohort to recovered once it has been infected for the incubation plus
    /// recovery period. At most one cohort recovers per step.
    fn recover(&self, airport: &mut Airport, day: i64) {
        let Some(oldest) = airport.infected.oldest() else {
            return;
        };
        if day - oldest.day >= self.policy.recovery_age() {
            if let Some(cohort) = airport.infected.pop_oldest() {
                airport.recovered += cohort.size;
                trace!(
                    "{}: cohort of day {} recovered ({} people) on day {day}",
                    airport.code,
                    cohort.day,
                    cohort.size
                );
            }
        }
    }

    /// Vaccinates `ceil(rate × I × S / (I + S))` susceptibles, capped at `S`.
    fn vaccinate(&self, airport: &mut Airport) {
        let Some(rate) = self.policy.vaccination_rate else {
            return;
        };
        let infected = airport.infected.total();
        let susceptible = airport.susceptible;
        if infected == 0 || susceptible == 0 {
            return;
        }
        // Evaluated left to right in f64: `I × S` can exceed u64.
        let vaccinated = ceil_count(
            rate * infected as f64 * susceptible as f64 / (infected + susceptible) as f64,
        )
        .min(susceptible);
        airport.susceptible -= vaccinated;
        airport.vaccinated += vaccinated;
        trace!("{}: vaccinated {vaccinated}", airport.code);
    }

    /// New infections: `ceil(tau × curve[month] × (newest cohort + imported))`, capped at `S`.
    /// Only the newest cohort transmits.
    fn transmit(&self, airport: &mut Airport, day: i64) {
        let pressure = airport.infected.newest_size() as f64 + airport.in_transit;
        let newly_infected = ceil_count(self.policy.tau * airport.curve_for_day(day) * pressure)
            .min(airport.susceptible);
        if newly_infected > 0 {
            airport.susceptible -= newly_infected;
            airport.infected.push(day, newly_infected);
            trace!(
                "{}: {newly_infected} newly infected on day {day}, {} infected in total",
                airport.code,
                airport.infected.total()
            );
        }
    }
}

fn snapshot(airport: &Airport) -> Snapshot {
    Snapshot {
        susceptible: airport.susceptible,
        infected: airport.infected.total(),
        vaccinated: airport.vaccinated,
        recovered: airport.recovered,
    }
}

/// Forces a single new infection at the seed airport.
pub(crate) fn seed(airport: &mut Airport, day: i64) {
    if airport.susceptible == 0 {
        warn!(
            "cannot seed {} on day {day}: no susceptible population",
            airport.code
        );
        return;
    }
    info!(
        "Infecting {} in {}",
        airport.code,
        MONTH_NAMES[month_of_day(day)]
    );
    airport.susceptible -= 1;
    airport.infected.push_seed(day);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Cohort;
    use crate::stats::TimeSeries;
    use crate::MONTHS_IN_YEAR;

    fn policy(tau: f64) -> Policy {
        Policy {
            tau,
            incubation_period: 3,
            recovery_period: 7,
            vaccination_rate: None,
            screen_rate: 0.0,
        }
    }

    fn airport(id: u32, code: &str, population: u64, curve: f64) -> Airport {
        let mut airport = Airport::new(id, code, code, 0.0, 0.0, population);
        airport.curve = [curve; MONTHS_IN_YEAR];
        airport
    }

    fn scenario(code: &str, day: i64) -> Scenario {
        Scenario {
            seed_city: code.to_string(),
            infection_day: day,
        }
    }

    fn single_node(curve: f64) -> NetworkModel {
        NetworkModel::new(vec![airport(1, "AAA", 1000, curve)]).unwrap()
    }

    #[test]
    fn seeding_injects_one_cohort() {
        let mut node = airport(1, "AAA", 1000, 1.0);
        seed(&mut node, 1);
        assert_eq!(node.susceptible, 999);
        assert_eq!(node.infected.total(), 1);
        assert_eq!(node.infected.newest_size(), 1);
        assert_eq!(node.infected.oldest(), Some(&Cohort { day: 1, size: 1 }));
    }

    #[test]
    fn seeding_day_step_transmits_from_seed_cohort() {
        let mut network = single_node(1.0);
        let engine = EpidemicEngine::new(&network, &FlowTable::new(), policy(4.0)).unwrap();
        engine.step(&mut network, 1, &scenario("AAA", 1), &mut ());
        let node = network.airport("AAA").unwrap();
        // Seed of 1, then ceil(4 × 1.0 × 1) = 4 new infections in the same step.
        assert_eq!(node.susceptible, 995);
        assert_eq!(node.infected.total(), 5);
        assert_eq!(node.infected.newest_size(), 4);
        assert_eq!(node.accounted_population(), 1000);
    }

    #[test]
    fn seed_cohort_recovers_after_incubation_plus_recovery() {
        let mut network = single_node(0.0);
        let engine = EpidemicEngine::new(&network, &FlowTable::new(), policy(4.0)).unwrap();
        let scenario = scenario("AAA", 1);
        engine.step(&mut network, 1, &scenario, &mut ());
        // Age 9 < 10: still infected.
        engine.step(&mut network, 10, &scenario, &mut ());
        assert_eq!(network.airport("AAA").unwrap().infected.total(), 1);
        // Age 10 >= 10: recovered.
        engine.step(&mut network, 11, &scenario, &mut ());
        let node = network.airport("AAA").unwrap();
        assert_eq!(node.recovered, 1);
        assert_eq!(node.infected.total(), 0);
        assert_eq!(node.infected.newest_size(), 0);
        assert_eq!(node.susceptible, 999);
    }

    #[test]
    fn only_the_oldest_cohort_recovers_per_step() {
        let mut network = single_node(0.0);
        {
            let node = network.airport_mut("AAA").unwrap();
            node.susceptible = 990;
            node.infected.push(1, 4);
            node.infected.push(2, 6);
        }
        let engine = EpidemicEngine::new(&network, &FlowTable::new(), policy(4.0)).unwrap();
        engine.step(&mut network, 30, &scenario("ZZZ", 1), &mut ());
        let node = network.airport("AAA").unwrap();
        assert_eq!(node.recovered, 4);
        assert_eq!(node.infected.oldest(), Some(&Cohort { day: 2, size: 6 }));
    }

    #[test]
    fn airborne_import_rounds_up_prevalence_load() {
        let mut network = NetworkModel::new(vec![
            airport(1, "AAA", 1000, 0.0),
            airport(2, "BBB", 1000, 0.0),
        ])
        .unwrap();
        network.airport_mut("AAA").unwrap().susceptible = 900;
        network.airport_mut("AAA").unwrap().infected.push(0, 100);
        let mut flows = FlowTable::new();
        flows.insert("AAA", "BBB", 3650.0).unwrap();
        let engine = EpidemicEngine::new(&network, &flows, policy(4.0)).unwrap();

        let imported = engine.airborne_imports(&network);
        assert_eq!(imported, vec![0.0, 1.0]);
    }

    #[test]
    fn airborne_import_is_reduced_by_screening() {
        let mut network = NetworkModel::new(vec![
            airport(1, "AAA", 1000, 1.0),
            airport(2, "BBB", 1000, 1.0),
        ])
        .unwrap();
        network.airport_mut("AAA").unwrap().susceptible = 900;
        network.airport_mut("AAA").unwrap().infected.push(0, 100);
        let mut flows = FlowTable::new();
        flows.insert("AAA", "BBB", 36500.0).unwrap();
        let engine = EpidemicEngine::new(
            &network,
            &flows,
            Policy {
                screen_rate: 0.5,
                ..policy(1.0)
            },
        )
        .unwrap();
        assert_eq!(engine.airborne_imports(&network), vec![0.0, 5.0]);

        engine.step(&mut network, 1, &scenario("ZZZ", 99), &mut ());
        let destination = network.airport("BBB").unwrap();
        // ceil(1 × 1.0 × (0 + 5)) = 5, and the transient import is cleared.
        assert_eq!(destination.infected.total(), 5);
        assert_eq!(destination.in_transit, 0.0);
    }

    #[test]
    fn airborne_import_divides_prevalence_first() {
        let mut network = NetworkModel::new(vec![
            airport(1, "AAA", 1000, 0.0),
            airport(2, "BBB", 1000, 0.0),
        ])
        .unwrap();
        network.airport_mut("AAA").unwrap().susceptible = 930;
        network.airport_mut("AAA").unwrap().infected.push(0, 70);
        let mut flows = FlowTable::new();
        flows.insert("AAA", "BBB", 36500.0).unwrap();
        let engine = EpidemicEngine::new(&network, &flows, policy(4.0)).unwrap();

        // 70 / 1000 × 36500 / 365 comes out just above 7 and rounds up to 8.
        assert_eq!(engine.airborne_imports(&network), vec![0.0, 8.0]);
    }

    #[test]
    fn any_positive_load_imports_at_least_one() {
        let mut network = NetworkModel::new(vec![
            airport(1, "AAA", 1_000_000, 0.0),
            airport(2, "BBB", 1000, 0.0),
        ])
        .unwrap();
        network.airport_mut("AAA").unwrap().susceptible -= 1;
        network.airport_mut("AAA").unwrap().infected.push(0, 1);
        let mut flows = FlowTable::new();
        flows.insert("AAA", "BBB", 1.0).unwrap();
        let engine = EpidemicEngine::new(&network, &flows, policy(4.0)).unwrap();
        assert_eq!(engine.airborne_imports(&network), vec![0.0, 1.0]);
    }

    #[test]
    fn vaccination_scales_with_exposure() {
        let mut network = single_node(0.0);
        {
            let node = network.airport_mut("AAA").unwrap();
            node.population = 100;
            node.susceptible = 90;
            node.infected.push(5, 10);
        }
        let engine = EpidemicEngine::new(
            &network,
            &FlowTable::new(),
            Policy {
                vaccination_rate: Some(0.5),
                ..policy(4.0)
            },
        )
        .unwrap();
        engine.step(&mut network, 6, &scenario("ZZZ", 1), &mut ());
        let node = network.airport("AAA").unwrap();
        // min(ceil(0.5 × 10 × 90 / 100), 90) = 5
        assert_eq!(node.vaccinated, 5);
        assert_eq!(node.susceptible, 85);
    }

    fn vaccinating_node(
        susceptible: u64,
        infected: u64,
        rate: f64,
    ) -> (NetworkModel, EpidemicEngine) {
        let mut network = single_node(0.0);
        {
            let node = network.airport_mut("AAA").unwrap();
            node.population = susceptible + infected;
            node.susceptible = susceptible;
            if infected > 0 {
                node.infected.push(5, infected);
            }
        }
        let engine = EpidemicEngine::new(
            &network,
            &FlowTable::new(),
            Policy {
                vaccination_rate: Some(rate),
                ..policy(4.0)
            },
        )
        .unwrap();
        (network, engine)
    }

    #[test]
    fn vaccination_rounds_up_left_to_right_product() {
        // 0.1 × 11 × 110 / 121 lands just above 1.0, so two people are vaccinated.
        let (mut network, engine) = vaccinating_node(110, 11, 0.1);
        engine.step(&mut network, 6, &scenario("ZZZ", 1), &mut ());
        let node = network.airport("AAA").unwrap();
        assert_eq!(node.vaccinated, 2);
        assert_eq!(node.susceptible, 108);
    }

    #[test]
    fn vaccination_handles_large_populations() {
        let (mut network, engine) = vaccinating_node(5_000_000_000, 5_000_000_000, 0.5);
        engine.step(&mut network, 6, &scenario("ZZZ", 1), &mut ());
        let node = network.airport("AAA").unwrap();
        assert_eq!(node.vaccinated, 1_250_000_000);
        assert_eq!(node.accounted_population(), node.population);
    }

    #[test]
    fn vaccination_skipped_without_infected() {
        let (mut network, engine) = vaccinating_node(1000, 0, 0.5);
        engine.step(&mut network, 6, &scenario("ZZZ", 1), &mut ());
        let node = network.airport("AAA").unwrap();
        assert_eq!(node.vaccinated, 0);
        assert_eq!(node.susceptible, 1000);
    }

    #[test]
    fn vaccination_skipped_without_susceptibles() {
        let (mut network, engine) = vaccinating_node(0, 1000, 0.5);
        engine.step(&mut network, 6, &scenario("ZZZ", 1), &mut ());
        let node = network.airport("AAA").unwrap();
        assert_eq!(node.vaccinated, 0);
        assert_eq!(node.infected.total(), 1000);
    }

    #[test]
    fn vaccination_is_capped_at_susceptibles() {
        let mut network = single_node(0.0);
        {
            let node = network.airport_mut("AAA").unwrap();
            node.susceptible = 1;
            node.infected.push(5, 999);
        }
        let engine = EpidemicEngine::new(
            &network,
            &FlowTable::new(),
            Policy {
                vaccination_rate: Some(1.0),
                ..policy(4.0)
            },
        )
        .unwrap();
        engine.step(&mut network, 6, &scenario("ZZZ", 1), &mut ());
        let node = network.airport("AAA").unwrap();
        assert_eq!(node.vaccinated, 1);
        assert_eq!(node.susceptible, 0);
    }

    #[test]
    fn transmission_is_capped_at_susceptibles() {
        let mut network = single_node(1.0);
        {
            let node = network.airport_mut("AAA").unwrap();
            node.susceptible = 3;
            node.recovered = 947;
            node.infected.push(2, 50);
        }
        let engine = EpidemicEngine::new(&network, &FlowTable::new(), policy(4.0)).unwrap();
        engine.step(&mut network, 3, &scenario("ZZZ", 1), &mut ());
        let node = network.airport("AAA").unwrap();
        assert_eq!(node.susceptible, 0);
        assert_eq!(node.infected.newest_size(), 3);
        assert_eq!(node.accounted_population(), 1000);
    }

    #[test]
    fn seasonal_curve_uses_month_of_day() {
        let mut network = single_node(0.0);
        {
            let node = network.airport_mut("AAA").unwrap();
            node.curve[1] = 2.0;
            node.susceptible = 999;
            node.infected.push(30, 1);
        }
        let engine = EpidemicEngine::new(&network, &FlowTable::new(), policy(1.5)).unwrap();
        // Day 33 is February: ceil(1.5 × 2.0 × 1) = 3.
        engine.step(&mut network, 33, &scenario("ZZZ", 1), &mut ());
        assert_eq!(network.airport("AAA").unwrap().infected.newest_size(), 3);
    }

    #[test]
    fn step_records_state_before_mutation() {
        let mut network = single_node(1.0);
        let engine = EpidemicEngine::new(&network, &FlowTable::new(), policy(4.0)).unwrap();
        let mut series = TimeSeries::for_network(&network);
        engine.step(&mut network, 1, &scenario("AAA", 1), &mut series);
        engine.step(&mut network, 3, &scenario("AAA", 1), &mut series);
        assert_eq!(series.ticks(), &[1, 3]);
        let snapshots = series.series("AAA").unwrap();
        assert_eq!(snapshots[0].susceptible, 1000);
        assert_eq!(snapshots[0].infected, 0);
        assert_eq!(snapshots[1].infected, 5);
    }

    #[test]
    fn unknown_route_endpoint_fails_fast() {
        let network = single_node(1.0);
        let mut flows = FlowTable::new();
        flows.insert("AAA", "QQQ", 10.0).unwrap();
        let result = EpidemicEngine::new(&network, &flows, policy(4.0));
        assert!(matches!(result, Err(ZikaError::LookupError { key, .. }) if key == "QQQ"));
    }

    #[test]
    fn seeding_without_susceptibles_is_skipped() {
        let mut node = airport(1, "AAA", 10, 1.0);
        node.susceptible = 0;
        node.vaccinated = 10;
        seed(&mut node, 1);
        assert_eq!(node.infected.total(), 0);
        assert_eq!(node.accounted_population(), 10);
    }
}
