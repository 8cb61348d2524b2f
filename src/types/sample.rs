use crate::climatology::day_of_year::DAYS_PER_YEAR;
use crate::error::ClimatologyError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Spatial mean rainfall over the region for one day of year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionalSample {
    pub doy: u16,
    /// `None` when no pixel in the region carried a value for this day.
    pub rainfall_cm: Option<f64>,
}

/// The day-of-year climatology for a region, ordered by ascending day of year.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RegionalSeries {
    samples: Vec<RegionalSample>,
}

impl RegionalSeries {
    /// Builds a series, sorting the samples by day of year.
    pub fn new(mut samples: Vec<RegionalSample>) -> Self {
        samples.sort_by_key(|s| s.doy);
        Self { samples }
    }

    pub fn samples(&self) -> &[RegionalSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionalSample> {
        self.samples.iter()
    }

    pub fn get(&self, doy: u16) -> Option<&RegionalSample> {
        self.samples
            .binary_search_by_key(&doy, |s| s.doy)
            .ok()
            .map(|idx| &self.samples[idx])
    }

    pub fn days(&self) -> Vec<u16> {
        self.samples.iter().map(|s| s.doy).collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.rainfall_cm).collect()
    }

    /// Checks that the days of year are exactly `1..=365`, each once.
    pub fn ensure_complete(&self) -> Result<(), ClimatologyError> {
        let mut counts: BTreeMap<u16, usize> = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.doy).or_default() += 1;
        }
        let missing: Vec<u16> = (1..=DAYS_PER_YEAR)
            .filter(|doy| !counts.contains_key(doy))
            .collect();
        let duplicated: Vec<u16> = counts
            .iter()
            .filter(|(doy, &n)| n > 1 || **doy == 0 || **doy > DAYS_PER_YEAR)
            .map(|(doy, _)| *doy)
            .collect();

        if missing.is_empty() && duplicated.is_empty() {
            Ok(())
        } else {
            Err(ClimatologyError::IncompleteClimatology {
                missing,
                duplicated,
            })
        }
    }
}

impl<'a> IntoIterator for &'a RegionalSeries {
    type Item = &'a RegionalSample;
    type IntoIter = std::slice::Iter<'a, RegionalSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
