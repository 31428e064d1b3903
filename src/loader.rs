//! Reads the reference data: airports, passenger routes and mosquito curves.
//!
//! All three files are header-less CSV:
//!
//! | file     | columns                                                        |
//! |----------|----------------------------------------------------------------|
//! | airports | `id, name, iata, lat, lon, population`                         |
//! | routes   | `origin_iata, origin_id, dest_iata, dest_id, annual_passengers` |
//! | curves   | `label, iata, m1, ..., m12`                                    |
//!
//! Quoting is handled by the CSV reader and surrounding whitespace is trimmed. Any malformed
//! record aborts loading with a `ReferenceDataError` naming the file and record number.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde_derive::Deserialize;

use crate::error::ZikaError;
use crate::log::{debug, info, warn};
use crate::network::{Airport, FlowTable, NetworkModel, TransmissionCurveTable};
use crate::MONTHS_IN_YEAR;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AirportRecord {
    pub id: u32,
    pub name: String,
    pub iata: String,
    pub lat: f64,
    pub lon: f64,
    pub population: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RouteRecord {
    pub origin_iata: String,
    pub origin_id: u32,
    pub dest_iata: String,
    pub dest_id: u32,
    pub annual_passengers: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurveRecord {
    pub label: String,
    pub iata: String,
    pub curve: [f64; MONTHS_IN_YEAR],
}

/// Everything the simulation core needs, assembled and cross-checked.
#[derive(Clone, Debug)]
pub struct ReferenceData {
    pub network: NetworkModel,
    pub flows: FlowTable,
    pub curves: TransmissionCurveTable,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader)
}

fn open(path: &Path) -> Result<File, ZikaError> {
    File::open(path).map_err(|error| {
        ZikaError::IoError(std::io::Error::new(
            error.kind(),
            format!("{}: {error}", path.display()),
        ))
    })
}

/// Deserializes every record of a header-less CSV source.
fn read_records<R, T>(reader: R, source_name: &str) -> Result<Vec<T>, ZikaError>
where
    R: Read,
    T: for<'de> serde::Deserialize<'de>,
{
    csv_reader(reader)
        .deserialize()
        .enumerate()
        .map(|(index, result)| {
            result.map_err(|error| {
                ZikaError::reference_data(source_name, index as u64 + 1, error.to_string())
            })
        })
        .collect()
}

/// # Errors
///
/// Returns `ZikaError::ReferenceDataError` for a record that does not have the airport layout.
pub fn read_airports_from<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<AirportRecord>, ZikaError> {
    read_records(reader, source_name)
}

/// Points a value error raised by one of the lookup tables at the record it came from.
fn at_record(error: ZikaError, source_name: &str, record: u64) -> ZikaError {
    match error {
        ZikaError::ReferenceDataError { message, .. } => {
            ZikaError::reference_data(source_name, record, message)
        }
        other => other,
    }
}

/// # Errors
///
/// Returns `ZikaError::ReferenceDataError` for a record that does not have the route layout or
/// whose passenger count is negative or not finite.
pub fn read_routes_from<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<RouteRecord>, ZikaError> {
    let routes: Vec<RouteRecord> = read_records(reader, source_name)?;
    for (index, route) in routes.iter().enumerate() {
        if !route.annual_passengers.is_finite() || route.annual_passengers < 0.0 {
            return Err(ZikaError::reference_data(
                source_name,
                index as u64 + 1,
                format!(
                    "passenger count {} for {} -> {} must be finite and non-negative",
                    route.annual_passengers, route.origin_iata, route.dest_iata
                ),
            ));
        }
    }
    Ok(routes)
}

/// # Errors
///
/// Returns `ZikaError::ReferenceDataError` unless every record has a label, a code and exactly
/// twelve numeric multipliers.
pub fn read_curves_from<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<CurveRecord>, ZikaError> {
    let mut records = Vec::new();
    for (index, result) in csv_reader(reader).records().enumerate() {
        let record_number = index as u64 + 1;
        let record = result.map_err(|error| {
            ZikaError::reference_data(source_name, record_number, error.to_string())
        })?;
        if record.len() != MONTHS_IN_YEAR + 2 {
            return Err(ZikaError::reference_data(
                source_name,
                record_number,
                format!(
                    "expected {} fields (label, code, 12 months), found {}",
                    MONTHS_IN_YEAR + 2,
                    record.len()
                ),
            ));
        }

        let mut curve = [0.0_f64; MONTHS_IN_YEAR];
        for (month, value) in curve.iter_mut().enumerate() {
            let field = &record[month + 2];
            *value = field.parse().map_err(|_| {
                ZikaError::reference_data(
                    source_name,
                    record_number,
                    format!("month {} multiplier \"{field}\" is not a number", month + 1),
                )
            })?;
            if !value.is_finite() || *value < 0.0 {
                return Err(ZikaError::reference_data(
                    source_name,
                    record_number,
                    format!(
                        "month {} multiplier {value} must be finite and non-negative",
                        month + 1
                    ),
                ));
            }
        }
        records.push(CurveRecord {
            label: record[0].to_string(),
            iata: record[1].to_string(),
            curve,
        });
    }
    Ok(records)
}

/// Builds the curve table, the network (with curves applied) and the flow table from records.
///
/// # Errors
///
/// Returns `ZikaError::ReferenceDataError` for duplicate airports or invalid values and
/// `ZikaError::LookupError` when an airport has no curve or a route names an unknown airport.
pub fn assemble(
    airports: Vec<AirportRecord>,
    routes: Vec<RouteRecord>,
    curve_records: Vec<CurveRecord>,
) -> Result<ReferenceData, ZikaError> {
    let mut curves = TransmissionCurveTable::new();
    for (index, record) in curve_records.iter().enumerate() {
        curves
            .insert(&record.iata, record.curve)
            .map_err(|error| at_record(error, "curves", index as u64 + 1))?;
    }

    let airports = airports
        .into_iter()
        .map(|record| {
            Airport::new(
                record.id,
                &record.name,
                &record.iata,
                record.lat,
                record.lon,
                record.population,
            )
        })
        .collect();
    let mut network = NetworkModel::new(airports)?;
    network.apply_curves(&curves)?;

    let mut flows = FlowTable::new();
    for (index, route) in routes.iter().enumerate() {
        for (code, id) in [
            (&route.origin_iata, route.origin_id),
            (&route.dest_iata, route.dest_id),
        ] {
            let airport = network
                .airport(code)
                .ok_or_else(|| ZikaError::lookup("airport network", code))?;
            if airport.id != id {
                warn!(
                    "route record {}: {code} has id {} in the airport data, not {id}",
                    index + 1,
                    airport.id
                );
            }
        }
        if flows
            .get(&route.origin_iata, &route.dest_iata)
            .is_some()
        {
            debug!(
                "route {} -> {} listed more than once; keeping the last value",
                route.origin_iata, route.dest_iata
            );
        }
        flows
            .insert(&route.origin_iata, &route.dest_iata, route.annual_passengers)
            .map_err(|error| at_record(error, "routes", index as u64 + 1))?;
    }

    Ok(ReferenceData {
        network,
        flows,
        curves,
    })
}

/// Loads and assembles the three reference files.
///
/// # Errors
///
/// Returns `ZikaError::IoError` if a file cannot be opened, otherwise see [`assemble`].
pub fn load_network(
    airports_path: &Path,
    routes_path: &Path,
    curves_path: &Path,
) -> Result<ReferenceData, ZikaError> {
    info!("loading mosquito curves from {}", curves_path.display());
    let curves = read_curves_from(open(curves_path)?, &curves_path.display().to_string())?;
    info!("loading airports from {}", airports_path.display());
    let airports = read_airports_from(open(airports_path)?, &airports_path.display().to_string())?;
    info!("loading routes from {}", routes_path.display());
    let routes = read_routes_from(open(routes_path)?, &routes_path.display().to_string())?;
    assemble(airports, routes, curves)
}
