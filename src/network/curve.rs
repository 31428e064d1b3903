use std::collections::BTreeMap;

use crate::error::ZikaError;
use crate::MONTHS_IN_YEAR;

/// Seasonal mosquito-activity multipliers, twelve per airport code.
#[derive(Clone, Debug, Default)]
pub struct TransmissionCurveTable {
    curves: BTreeMap<String, [f64; MONTHS_IN_YEAR]>,
}

impl TransmissionCurveTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `ZikaError::ReferenceDataError` if any multiplier is negative or not finite.
    pub fn insert(&mut self, code: &str, curve: [f64; MONTHS_IN_YEAR]) -> Result<(), ZikaError> {
        if let Some(month) = curve.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(ZikaError::reference_data(
                "transmission curve table",
                0,
                format!("invalid multiplier {} for {code} in month {}", curve[month], month + 1),
            ));
        }
        self.curves.insert(code.to_string(), curve);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ZikaError::LookupError` if there is no curve for `code`. A missing curve is never
    /// treated as zero transmissibility.
    pub fn get(&self, code: &str) -> Result<&[f64; MONTHS_IN_YEAR], ZikaError> {
        self.curves
            .get(code)
            .ok_or_else(|| ZikaError::lookup("transmission curve table", code))
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.curves.contains_key(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}
