use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;

use crate::driver::{SimulationDriver, SingleRunOutput, SweepResults};
use crate::error::ZikaError;
use crate::loader::load_network;
use crate::log::{info, set_log_level_from_str};
use crate::parameters::Parameters;
use crate::progress::enable_progress_bar;
use crate::report::{print_stats, print_sweep, write_single_run, write_sweep};

/// Command line arguments of `zika-sim`
#[derive(Parser, Debug, Default)]
#[command(name = "zika-sim", version, about = "Zika SIVR simulation over an airport network")]
pub struct Args {
    /// Airport nodes: `id,name,iata,lat,lon,population`
    pub airports: PathBuf,

    /// Passenger routes: `origin_iata,origin_id,dest_iata,dest_id,annual_passengers`
    pub routes: PathBuf,

    /// Mosquito curves: `label,iata,m1..m12`
    pub curves: PathBuf,

    /// Optional path for a JSON parameters file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Optional directory for CSV reports
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Log level, e.g. `info` or `warn,zika_sim::engine=trace`
    #[arg(long)]
    pub log_level: Option<String>,

    /// Sweep every airport and seed month instead of a single run
    #[arg(short = 'a', long)]
    pub run_all: bool,

    /// Print the infection dynamics of the seed city
    #[arg(short, long)]
    pub stats: bool,

    /// Vaccinate at the default rate `1 - 1/tau`
    #[arg(short, long)]
    pub vaccinate: bool,

    /// IATA code of the seed city
    #[arg(long)]
    pub city: Option<String>,

    /// Day of the first infection
    #[arg(long)]
    pub infection_day: Option<i64>,

    /// First day of a single run
    #[arg(long)]
    pub start: Option<i64>,

    /// Length of a run in days
    #[arg(long)]
    pub days: Option<i64>,

    /// Reproduction number
    #[arg(long)]
    pub tau: Option<f64>,

    /// Incubation period in days
    #[arg(long)]
    pub incubation: Option<i64>,

    /// Recovery period in days
    #[arg(long)]
    pub recovery: Option<i64>,

    /// Vaccination rate; implies `--vaccinate`
    #[arg(long)]
    pub vac: Option<f64>,

    /// Fraction of airborne infections stopped by screening
    #[arg(long)]
    pub screen: Option<f64>,

    /// Worker threads for a sweep
    #[arg(long)]
    pub threads: Option<usize>,

    /// Show a progress bar during a sweep
    #[arg(long)]
    pub progress: bool,
}

impl Args {
    /// Layers the parameters: defaults, then the `--config` file, then command line flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn parameters(&self) -> Result<Parameters, ZikaError> {
        let mut parameters = match &self.config {
            Some(path) => {
                info!("loading parameters from {}", path.display());
                Parameters::from_json_file(path)?
            }
            None => Parameters::default(),
        };

        if self.vaccinate {
            parameters.vaccinate = true;
        }
        if let Some(city) = &self.city {
            parameters.seed_city.clone_from(city);
        }
        if let Some(day) = self.infection_day {
            parameters.infection_day = day;
        }
        if let Some(start) = self.start {
            parameters.start_day = start;
        }
        if let Some(days) = self.days {
            parameters.run_length = days;
        }
        if let Some(tau) = self.tau {
            parameters.tau = tau;
        }
        if let Some(incubation) = self.incubation {
            parameters.incubation_period = incubation;
        }
        if let Some(recovery) = self.recovery {
            parameters.recovery_period = recovery;
        }
        if let Some(rate) = self.vac {
            parameters.vaccination_rate = Some(rate);
        }
        if let Some(rate) = self.screen {
            parameters.screen_rate = rate;
        }
        if let Some(threads) = self.threads {
            parameters.threads = threads;
        }
        Ok(parameters.resolved())
    }
}

/// What a run produced.
#[derive(Debug)]
pub enum RunOutcome {
    Single(SingleRunOutput),
    Sweep(SweepResults),
}

/// Runs the simulation described by `args`, printing to stdout.
///
/// # Errors
///
/// Returns the first fatal error: bad parameters, unreadable or malformed reference data, or a
/// report that cannot be written. Nothing is printed or written for a run that fails before it
/// starts.
pub fn run(args: &Args) -> Result<RunOutcome, ZikaError> {
    run_with_output(args, &mut io::stdout().lock())
}

/// Like [`run`], with the printout going to `out`.
///
/// # Errors
///
/// See [`run`].
pub fn run_with_output(args: &Args, out: &mut impl Write) -> Result<RunOutcome, ZikaError> {
    if let Some(spec) = &args.log_level {
        set_log_level_from_str(spec)?;
    }
    if args.progress {
        enable_progress_bar();
    }

    let parameters = args.parameters()?;
    parameters.validate()?;
    info!("parameters: {parameters}");

    let data = load_network(&args.airports, &args.routes, &args.curves)?;
    let driver = SimulationDriver::new(data.network, &data.flows, parameters)?;

    if args.run_all {
        let results = driver.sweep();
        match &args.output_dir {
            Some(dir) => {
                let path = write_sweep(&results, dir)?;
                info!("wrote {}", path.display());
            }
            None => print_sweep(&results, out)?,
        }
        if let Some((code, day, severity)) = results.worst() {
            info!("most severe: {code} seeded on day {day}, {severity} recovered");
        }
        return Ok(RunOutcome::Sweep(results));
    }

    let output = driver.run_single();
    if let Some(dir) = &args.output_dir {
        for path in write_single_run(&output, dir)? {
            info!("wrote {}", path.display());
        }
    }
    if args.stats || args.output_dir.is_none() {
        print_stats(&output, &output.scenario.seed_city, out)?;
    }
    Ok(RunOutcome::Single(output))
}
