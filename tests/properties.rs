use std::path::{Path, PathBuf};

use zika_sim::engine::{EpidemicEngine, Policy};
use zika_sim::loader::{load_network, ReferenceData};
use zika_sim::network::{Airport, Cohort, FlowTable, NetworkModel};
use zika_sim::{Parameters, Scenario, SimulationDriver, TimeSeries};

fn data_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn load_fixture() -> ReferenceData {
    load_network(
        &data_path("airports.csv"),
        &data_path("routes.csv"),
        &data_path("curves.csv"),
    )
    .unwrap()
}

fn policy(tau: f64, screen_rate: f64) -> Policy {
    Policy {
        tau,
        incubation_period: 3,
        recovery_period: 7,
        vaccination_rate: None,
        screen_rate,
    }
}

// A scenario whose seeding day never comes up.
fn unseeded() -> Scenario {
    Scenario {
        seed_city: "AAA".to_string(),
        infection_day: -1,
    }
}

fn two_airports(flow: f64) -> (NetworkModel, FlowTable) {
    let mut origin = Airport::new(1, "Alpha", "AAA", 0.0, 0.0, 1000);
    origin.infected.push(0, 100);
    origin.susceptible = 900;
    let destination = Airport::new(2, "Beta", "BBB", 0.0, 0.0, 1000);
    let network = NetworkModel::new(vec![origin, destination]).unwrap();
    let mut flows = FlowTable::new();
    flows.insert("AAA", "BBB", flow).unwrap();
    (network, flows)
}

#[test]
fn compartments_are_conserved_and_monotone_every_step() {
    let data = load_fixture();
    let policy = Policy {
        vaccination_rate: Some(0.3),
        ..policy(3.5, 0.1)
    };
    let engine = EpidemicEngine::new(&data.network, &data.flows, policy).unwrap();
    let scenario = Scenario {
        seed_city: "MIA".to_string(),
        infection_day: 125,
    };

    let mut network = data.network.clone();
    for day in 1..=365 {
        if day % 3 != 0 && day != scenario.infection_day {
            continue;
        }
        let before = network.clone();
        engine.step(&mut network, day, &scenario, &mut ());

        for (old, new) in before.iter().zip(network.iter()) {
            assert_eq!(new.accounted_population(), new.population, "{} day {day}", new.code);
            assert!(new.vaccinated >= old.vaccinated, "{} day {day}", new.code);
            assert!(new.recovered >= old.recovered, "{} day {day}", new.code);
            assert_eq!(new.in_transit, 0.0);

            let cohorts: Vec<&Cohort> = new.infected.iter().collect();
            assert!(cohorts.windows(2).all(|pair| pair[0].day <= pair[1].day));

            // At most the oldest cohort recovers in a step.
            let recovered = new.recovered - old.recovered;
            if recovered > 0 {
                assert_eq!(Some(recovered), old.infected.oldest().map(|c| c.size));
            }
        }
    }
    assert!(network.total_recovered() > 0);
}

#[test]
fn step_without_inputs_changes_nothing() {
    let mut airport = Airport::new(1, "Alpha", "AAA", 0.0, 0.0, 100);
    airport.infected.push(1, 10);
    airport.susceptible = 90;
    let mut network = NetworkModel::new(vec![airport]).unwrap();
    let before = network.clone();

    let engine = EpidemicEngine::new(&network, &FlowTable::new(), policy(0.0, 0.0)).unwrap();
    engine.step(&mut network, 3, &unseeded(), &mut ());

    assert_eq!(network.airports(), before.airports());
}

#[test]
fn airborne_import_of_ten_daily_passengers() {
    let (mut network, flows) = two_airports(3650.0);
    let engine = EpidemicEngine::new(&network, &flows, policy(1.0, 0.0)).unwrap();
    engine.step(&mut network, 3, &unseeded(), &mut ());

    // ceil(100 / 1000 * 3650 / 365) = 1 imported, which transmits to exactly one local case.
    let destination = network.airport("BBB").unwrap();
    assert_eq!(destination.infected.total(), 1);
    assert_eq!(destination.susceptible, 999);
}

#[test]
fn full_screening_stops_airborne_import() {
    let (mut network, flows) = two_airports(3650.0);
    let engine = EpidemicEngine::new(&network, &flows, policy(1.0, 1.0)).unwrap();
    engine.step(&mut network, 3, &unseeded(), &mut ());

    let destination = network.airport("BBB").unwrap();
    assert_eq!(destination.infected.total(), 0);
    assert_eq!(destination.susceptible, 1000);
}

#[test]
fn runs_are_deterministic() {
    let parameters = Parameters::from_json_file(&data_path("parameters.json")).unwrap();
    let first = {
        let data = load_fixture();
        SimulationDriver::new(data.network, &data.flows, parameters.clone()).unwrap()
    };
    let second = {
        let data = load_fixture();
        SimulationDriver::new(data.network, &data.flows, parameters).unwrap()
    };

    let (a, b) = (first.run_single(), second.run_single());
    assert_eq!(a.series, b.series);
    assert_eq!(a.network.airports(), b.network.airports());
    assert_eq!(first.sweep(), second.sweep());
}

#[test]
fn sweep_over_two_airports_does_not_leak_state() {
    let mut alpha = Airport::new(1, "Alpha", "AAA", 0.0, 0.0, 2000);
    alpha.curve = [1.0; 12];
    let beta = Airport::new(2, "Beta", "BBB", 0.0, 0.0, 800);
    let network = NetworkModel::new(vec![alpha, beta]).unwrap();
    let mut flows = FlowTable::new();
    flows.insert("AAA", "BBB", 50_000.0).unwrap();
    flows.insert("BBB", "AAA", 40_000.0).unwrap();

    let parameters = Parameters {
        seed_city: "AAA".to_string(),
        ..Parameters::default()
    };
    let driver = SimulationDriver::new(network.clone(), &flows, parameters).unwrap();
    let results = driver.sweep();

    assert_eq!(results.len(), 2);
    for code in ["AAA", "BBB"] {
        assert_eq!(results.scores(code).unwrap().len(), 12);
    }
    assert_eq!(driver.network().airports(), network.airports());
    // A second sweep on the same driver sees the same pristine network.
    assert_eq!(driver.sweep(), results);
}

#[test]
fn monthly_peaks_start_at_the_seeding_month() {
    let data = load_fixture();
    let parameters = Parameters::from_json_file(&data_path("parameters.json")).unwrap();
    let driver = SimulationDriver::new(data.network, &data.flows, parameters).unwrap();
    let output = driver.run_single();

    let peaks = output.monthly_peaks();
    assert_eq!(peaks.len(), 4);
    let miami = peaks.iter().find(|peaks| peaks.code == "MIA").unwrap();
    assert!(miami.ratios[0] > 0.0);
    for peaks in &peaks {
        assert!(peaks.ratios.iter().all(|ratio| (0.0..=1.0).contains(ratio)));
    }
}

#[test]
fn time_series_lines_up_with_ticks() {
    let data = load_fixture();
    let driver = SimulationDriver::new(
        data.network,
        &data.flows,
        Parameters {
            run_length: 60,
            ..Parameters::default()
        },
    )
    .unwrap();
    let output = driver.run_single();
    let series: &TimeSeries = &output.series;
    assert_eq!(series.ticks()[0], 1);
    assert!(series.ticks().windows(2).all(|pair| pair[0] < pair[1]));
    for (_, snapshots) in series.iter() {
        assert_eq!(snapshots.len(), series.ticks().len());
    }
}
