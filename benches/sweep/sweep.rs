use criterion::{criterion_group, criterion_main, Criterion};
use zika_sim::network::{Airport, FlowTable, NetworkModel};
use zika_sim::{Parameters, SimulationDriver};

static AIRPORTS: u32 = 24;
static POPULATION: u64 = 250_000;
static PASSENGERS: f64 = 400_000.0;

// A ring of airports where every airport also connects to the next-but-one.
fn synthetic_network() -> (NetworkModel, FlowTable) {
    let airports = (0..AIRPORTS)
        .map(|id| {
            let code = format!("A{id:02}");
            let mut airport = Airport::new(id, &code, &code, 0.0, 0.0, POPULATION);
            for (month, multiplier) in airport.curve.iter_mut().enumerate() {
                *multiplier = 0.2 + 0.1 * ((month + id as usize) % 8) as f64;
            }
            airport
        })
        .collect();
    let network = NetworkModel::new(airports).expect("valid synthetic network");

    let mut flows = FlowTable::new();
    for id in 0..AIRPORTS {
        let origin = format!("A{id:02}");
        for step in [1, 2] {
            let destination = format!("A{:02}", (id + step) % AIRPORTS);
            flows
                .insert(&origin, &destination, PASSENGERS / f64::from(step))
                .expect("valid flow");
            flows
                .insert(&destination, &origin, PASSENGERS / f64::from(step))
                .expect("valid flow");
        }
    }
    (network, flows)
}

fn driver(threads: usize) -> SimulationDriver {
    let (network, flows) = synthetic_network();
    let parameters = Parameters {
        seed_city: "A00".to_string(),
        vaccinate: true,
        threads,
        ..Parameters::default()
    };
    SimulationDriver::new(network, &flows, parameters).expect("valid parameters")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let single = driver(1);
    c.bench_function("single run", |bencher| {
        bencher.iter_with_large_drop(|| single.run_single());
    });

    c.bench_function("sweep", |bencher| {
        bencher.iter_with_large_drop(|| single.sweep());
    });

    let threaded = driver(4);
    c.bench_function("sweep 4 threads", |bencher| {
        bencher.iter_with_large_drop(|| threaded.sweep());
    });
}

criterion_group!(sweep_benches, criterion_benchmark);
criterion_main!(sweep_benches);
