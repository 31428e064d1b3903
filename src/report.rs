use crate::driver::{SingleRunOutput, SweepResults};
use crate::error::ZikaError;
use crate::{month_of_day, HashMap, MONTH_NAMES};
use csv::Writer;
use serde_derive::Serialize;
use std::any::TypeId;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SIVR_REPORT: &str = "sivr.csv";
pub const MONTHLY_PEAKS_REPORT: &str = "monthly_peaks.csv";
pub const SWEEP_REPORT: &str = "sweep.csv";

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), csv::Error>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! create_report_trait {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut csv::Writer<std::fs::File>,
            ) -> Result<(), csv::Error> {
                writer.serialize(self)
            }
        }
    };
}

/// One airport's compartments at one active tick of a single run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SivrRow {
    pub day: i64,
    pub airport: String,
    pub susceptible: u64,
    pub infected: u64,
    pub vaccinated: u64,
    pub recovered: u64,
}

/// Peak infected share of one airport in the `month_offset`-th month after seeding.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyPeakRow {
    pub airport: String,
    pub month_offset: usize,
    pub peak_ratio: f64,
}

/// Severity of seeding `airport` on `seed_day`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SweepRow {
    pub airport: String,
    pub seed_day: i64,
    pub seed_month: String,
    pub severity: u64,
}

create_report_trait!(SivrRow);
create_report_trait!(MonthlyPeakRow);
create_report_trait!(SweepRow);

// Checks that the path is valid. Creates the file and all parent directories if
// they do not exist. Returns the file if successful. Called by `add_report`
fn generate_validate_filepath(path: &Path) -> Result<File, ZikaError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            Ok(file)
        }
        _ => Err(ZikaError::ReportError(
            "Report output files must be CSVs at this time".to_string(),
        )),
    }
}

/// Maps report type to file writer.
#[derive(Default)]
pub struct ReportWriter {
    file_writers: HashMap<TypeId, Writer<File>>,
}

impl ReportWriter {
    #[must_use]
    pub fn new() -> Self {
        ReportWriter::default()
    }

    /// Call `add_report` with each report type, passing the path the rows of that type go to.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::ReportError` if the path is not a CSV file and
    /// `ZikaError::IoError` if it cannot be created.
    pub fn add_report<T: Report>(&mut self, path: &Path) -> Result<(), ZikaError> {
        let file = generate_validate_filepath(path)?;
        self.file_writers
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    /// Write a new row with columns following items in the report struct
    /// to the report file associated with the report type struct.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::ReportError` if no report of this type was added and
    /// `ZikaError::CSVError` if the row cannot be written.
    pub fn send_report<T: Report>(&mut self, report: &T) -> Result<(), ZikaError> {
        let writer = self
            .file_writers
            .get_mut(&Report::type_id(report))
            .ok_or_else(|| {
                ZikaError::ReportError(format!(
                    "no writer found for report type {}",
                    std::any::type_name::<T>()
                ))
            })?;
        report.serialize(writer)?;
        Ok(())
    }

    /// Flushes every report file.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::IoError` if a file cannot be flushed.
    pub fn flush(&mut self) -> Result<(), ZikaError> {
        for writer in self.file_writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Writes `sivr.csv` and `monthly_peaks.csv` for a single run into `output_dir`.
///
/// # Errors
///
/// Returns an error if a report file cannot be created or written.
pub fn write_single_run(
    output: &SingleRunOutput,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ZikaError> {
    let sivr_path = output_dir.join(SIVR_REPORT);
    let peaks_path = output_dir.join(MONTHLY_PEAKS_REPORT);
    let mut reports = ReportWriter::new();
    reports.add_report::<SivrRow>(&sivr_path)?;
    reports.add_report::<MonthlyPeakRow>(&peaks_path)?;

    let ticks = output.series.ticks();
    for (code, snapshots) in output.series.iter() {
        for (&day, snapshot) in ticks.iter().zip(snapshots) {
            reports.send_report(&SivrRow {
                day,
                airport: code.to_string(),
                susceptible: snapshot.susceptible,
                infected: snapshot.infected,
                vaccinated: snapshot.vaccinated,
                recovered: snapshot.recovered,
            })?;
        }
    }
    for peaks in output.monthly_peaks() {
        for (month_offset, &peak_ratio) in peaks.ratios.iter().enumerate() {
            reports.send_report(&MonthlyPeakRow {
                airport: peaks.code.clone(),
                month_offset,
                peak_ratio,
            })?;
        }
    }
    reports.flush()?;
    Ok(vec![sivr_path, peaks_path])
}

/// Writes `sweep.csv` into `output_dir`.
///
/// # Errors
///
/// Returns an error if the report file cannot be created or written.
pub fn write_sweep(results: &SweepResults, output_dir: &Path) -> Result<PathBuf, ZikaError> {
    let path = output_dir.join(SWEEP_REPORT);
    let mut reports = ReportWriter::new();
    reports.add_report::<SweepRow>(&path)?;
    for (code, scores) in results.iter() {
        for (&seed_day, &severity) in results.seed_days().iter().zip(scores) {
            reports.send_report(&SweepRow {
                airport: code.to_string(),
                seed_day,
                seed_month: MONTH_NAMES[month_of_day(seed_day)].to_string(),
                severity,
            })?;
        }
    }
    reports.flush()?;
    Ok(path)
}

/// Prints one `CODE [score, ...]` line per seed airport.
///
/// # Errors
///
/// Returns `ZikaError::IoError` if `out` cannot be written.
pub fn print_sweep(results: &SweepResults, out: &mut impl Write) -> Result<(), ZikaError> {
    for (code, scores) in results.iter() {
        writeln!(out, "{code} {scores:?}")?;
    }
    Ok(())
}

/// Prints the S/I/V/R table of one airport followed by its peak and final state.
///
/// # Errors
///
/// Returns `ZikaError::LookupError` if `code` was not part of the run and
/// `ZikaError::IoError` if `out` cannot be written.
pub fn print_stats(
    output: &SingleRunOutput,
    code: &str,
    out: &mut impl Write,
) -> Result<(), ZikaError> {
    let snapshots = output
        .series
        .series(code)
        .ok_or_else(|| ZikaError::lookup("time series", code))?;
    writeln!(out, "{code} infection dynamics")?;
    writeln!(
        out,
        "{:>5} {:>10} {:>10} {:>10} {:>10}",
        "day", "S", "I", "V", "R"
    )?;
    for (day, snapshot) in output.series.ticks().iter().zip(snapshots) {
        writeln!(
            out,
            "{day:>5} {:>10} {:>10} {:>10} {:>10}",
            snapshot.susceptible, snapshot.infected, snapshot.vaccinated, snapshot.recovered
        )?;
    }
    if let Some(summary) = output.series.summary(code) {
        match summary.peak_day {
            Some(day) if summary.peak_infected > 0 => writeln!(
                out,
                "peak infected {} on day {day} ({})",
                summary.peak_infected,
                MONTH_NAMES[month_of_day(day)]
            )?,
            _ => writeln!(out, "no infections recorded")?,
        }
    }
    if let Some(airport) = output.network.airport(code) {
        writeln!(
            out,
            "final S={} I={} V={} R={}",
            airport.susceptible,
            airport.infected.total(),
            airport.vaccinated,
            airport.recovered
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::SimulationDriver;
    use crate::network::{Airport, FlowTable, NetworkModel};
    use crate::parameters::Parameters;
    use serde_derive::Deserialize;
    use tempfile::tempdir;

    #[derive(Serialize, Deserialize)]
    struct SampleReport {
        id: u32,
        value: String,
    }

    create_report_trait!(SampleReport);

    fn driver() -> SimulationDriver {
        let network = NetworkModel::new(vec![
            Airport::new(1, "Alpha", "AAA", 0.0, 0.0, 1000),
            Airport::new(2, "Beta", "BBB", 0.0, 0.0, 400),
        ])
        .unwrap();
        let mut flows = FlowTable::new();
        flows.insert("AAA", "BBB", 36_500.0).unwrap();
        let parameters = Parameters {
            seed_city: "AAA".to_string(),
            run_length: 30,
            ..Parameters::default()
        };
        SimulationDriver::new(network, &flows, parameters).unwrap()
    }

    #[test]
    fn add_and_send_report() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("test-temp").join("sample_report.csv");
        let mut reports = ReportWriter::new();
        reports.add_report::<SampleReport>(&path).unwrap();
        reports
            .send_report(&SampleReport {
                id: 1,
                value: "Test Value".to_string(),
            })
            .unwrap();
        reports.flush().unwrap();

        assert!(path.exists(), "CSV file should exist");
        let mut reader = csv::Reader::from_path(path).unwrap();
        for result in reader.deserialize() {
            let record: SampleReport = result.unwrap();
            assert_eq!(record.id, 1);
            assert_eq!(record.value, "Test Value");
        }
    }

    #[test]
    fn only_csvs_allowed() {
        let temp_dir = tempdir().unwrap();
        let result = generate_validate_filepath(&temp_dir.path().join("sample_report.tsv"));
        match result {
            Err(ZikaError::ReportError(message)) => {
                assert_eq!(message, "Report output files must be CSVs at this time");
            }
            _ => panic!("expected a report error"),
        }
    }

    #[test]
    fn sending_unregistered_report_fails() {
        let mut reports = ReportWriter::new();
        let result = reports.send_report(&SampleReport {
            id: 1,
            value: String::new(),
        });
        assert!(matches!(result, Err(ZikaError::ReportError(_))));
    }

    #[test]
    fn single_run_reports_cover_every_tick() {
        let output = driver().run_single();
        let temp_dir = tempdir().unwrap();
        let paths = write_single_run(&output, temp_dir.path()).unwrap();
        assert_eq!(paths.len(), 2);

        let mut reader = csv::Reader::from_path(&paths[0]).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            ["day", "airport", "susceptible", "infected", "vaccinated", "recovered"]
        );
        assert_eq!(
            reader.records().count(),
            output.series.ticks().len() * 2
        );

        let reader = csv::Reader::from_path(&paths[1]).unwrap();
        assert_eq!(reader.into_records().count(), 24);
    }

    #[test]
    fn sweep_report_has_twelve_rows_per_airport() {
        let results = driver().sweep();
        let temp_dir = tempdir().unwrap();
        let path = write_sweep(&results, temp_dir.path()).unwrap();
        let mut reader = csv::Reader::from_path(path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 24);
        assert_eq!(&rows[0][0], "AAA");
        assert_eq!(&rows[0][1], "1");
        assert_eq!(&rows[0][2], "January");
        assert_eq!(&rows[11][1], "342");
    }

    #[test]
    fn sweep_lines_list_scores() {
        let results = driver().sweep();
        let mut out = Vec::new();
        print_sweep(&results, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("AAA ["));
        assert!(lines[1].starts_with("BBB ["));
        assert_eq!(lines[0].matches(',').count(), 11);
    }

    #[test]
    fn stats_table_for_seed_city() {
        let output = driver().run_single();
        let mut out = Vec::new();
        print_stats(&output, "AAA", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("AAA infection dynamics"));
        assert!(text.contains("final S="));
        assert_eq!(
            text.lines().count(),
            output.series.ticks().len() + 4
        );
        assert!(matches!(
            print_stats(&output, "ZZZ", &mut Vec::new()),
            Err(ZikaError::LookupError { .. })
        ));
    }
}
