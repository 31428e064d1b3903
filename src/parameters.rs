//! Policy parameters of a run.
//!
//! Parameters come from three layers, later layers winning: the defaults below, an optional JSON
//! file (`--config`), and command line flags. Any field may be omitted from the JSON file:
//!
//! ```json
//! { "tau": 3.5, "vaccination_rate": 0.4, "seed_city": "MIA", "infection_day": 125 }
//! ```
//!
//! Everything is checked by `validate()` before the first day-step; a running simulation never
//! raises a configuration error.
use std::fmt::{self, Display};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::error::ZikaError;
use crate::network::NetworkModel;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// Reproduction number.
    pub tau: f64,
    /// Days from infection until a person is counted as transmitting. Day-steps only run on
    /// multiples of this period (plus the seeding day).
    pub incubation_period: i64,
    /// Days a person stays infected after the incubation period.
    pub recovery_period: i64,
    pub vaccinate: bool,
    /// Vaccination rate. `None` means `1 - 1/tau`.
    pub vaccination_rate: Option<f64>,
    /// Fraction of airborne imported infections stopped by passenger screening.
    pub screen_rate: f64,
    /// IATA code of the airport seeded with the first infection.
    pub seed_city: String,
    /// Day of the first infection.
    pub infection_day: i64,
    /// First day of a single run.
    pub start_day: i64,
    /// Number of days in a single run. Sweep runs wrap day indices modulo this length.
    pub run_length: i64,
    /// Worker threads for sweep runs.
    pub threads: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            tau: 4.0,
            incubation_period: 3,
            recovery_period: 7,
            vaccinate: false,
            vaccination_rate: None,
            screen_rate: 0.0,
            seed_city: "ATL".to_string(),
            infection_day: 1,
            start_day: 1,
            run_length: 365,
            threads: 1,
        }
    }
}

impl Parameters {
    /// Reads parameters from a JSON file. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::IoError` if the file cannot be opened and `ZikaError::JsonError` if it
    /// does not parse.
    pub fn from_json_file(path: &Path) -> Result<Self, ZikaError> {
        let file = File::open(path)?;
        let parameters: Parameters = serde_json::from_reader(BufReader::new(file))?;
        Ok(parameters.resolved())
    }

    /// Applies the rules that tie parameters together: an explicit vaccination rate turns
    /// vaccination on, and infection cannot start before the run does.
    #[must_use]
    pub fn resolved(mut self) -> Self {
        if self.vaccination_rate.is_some() {
            self.vaccinate = true;
        }
        if self.infection_day < self.start_day {
            self.infection_day = self.start_day;
        }
        self
    }

    /// The vaccination rate in effect, defaulting to the herd-immunity threshold `1 - 1/tau`.
    #[must_use]
    pub fn effective_vaccination_rate(&self) -> f64 {
        self.vaccination_rate.unwrap_or(1.0 - 1.0 / self.tau)
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::ConfigurationError` naming the first offending parameter.
    pub fn validate(&self) -> Result<(), ZikaError> {
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err(ZikaError::configuration("tau", self.tau, "must be positive"));
        }
        if self.incubation_period <= 0 {
            return Err(ZikaError::configuration(
                "incubation_period",
                self.incubation_period,
                "must be a positive number of days",
            ));
        }
        if self.recovery_period <= 0 {
            return Err(ZikaError::configuration(
                "recovery_period",
                self.recovery_period,
                "must be a positive number of days",
            ));
        }
        if self.run_length <= 0 {
            return Err(ZikaError::configuration(
                "run_length",
                self.run_length,
                "must be a positive number of days",
            ));
        }
        if self.start_day.checked_add(self.run_length).is_none() {
            return Err(ZikaError::configuration(
                "run_length",
                self.run_length,
                format!(
                    "run starting on day {} ends past the last representable day",
                    self.start_day
                ),
            ));
        }
        if self.incubation_period.checked_add(self.recovery_period).is_none() {
            return Err(ZikaError::configuration(
                "recovery_period",
                self.recovery_period,
                "incubation_period + recovery_period is too large",
            ));
        }
        let vaccination_rate = self.effective_vaccination_rate();
        if self.vaccinate && !(0.0..=1.0).contains(&vaccination_rate) {
            return Err(ZikaError::configuration(
                "vaccination_rate",
                vaccination_rate,
                "must be within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.screen_rate) {
            return Err(ZikaError::configuration(
                "screen_rate",
                self.screen_rate,
                "must be within [0, 1]",
            ));
        }
        if self.threads == 0 {
            return Err(ZikaError::configuration(
                "threads",
                self.threads,
                "at least one thread is required",
            ));
        }
        Ok(())
    }

    /// `validate()` plus the checks that need the network.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::ConfigurationError` if validation fails or the seed city is not an
    /// airport of `network`.
    pub fn validate_for(&self, network: &NetworkModel) -> Result<(), ZikaError> {
        self.validate()?;
        if network.airport(&self.seed_city).is_none() {
            return Err(ZikaError::configuration(
                "seed_city",
                &self.seed_city,
                "not an airport of the network",
            ));
        }
        Ok(())
    }
}

impl Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  tau:               {}", self.tau)?;
        writeln!(f, "  incubation period: {} days", self.incubation_period)?;
        writeln!(f, "  recovery period:   {} days", self.recovery_period)?;
        if self.vaccinate {
            writeln!(
                f,
                "  vaccination rate:  {}",
                self.effective_vaccination_rate()
            )?;
        } else {
            writeln!(f, "  vaccination:       off")?;
        }
        writeln!(f, "  screen rate:       {}", self.screen_rate)?;
        writeln!(
            f,
            "  seed:              {} on day {}",
            self.seed_city, self.infection_day
        )?;
        write!(
            f,
            "  run:               days {}..{}",
            self.start_day,
            self.start_day.saturating_add(self.run_length)
        )
    }
}
