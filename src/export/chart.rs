//! Chart description for the day-of-year rainfall curve.
//!
//! The chart is emitted as a JSON description for external plotting tools,
//! or rendered to a standalone HTML page with the `plotting` feature.

use crate::export::error::ExportError;
use crate::types::sample::RegionalSeries;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const RAINFALL_CHART_TITLE: &str = "Mean daily rainfall (cm)";
pub const DAY_OF_YEAR_LABEL: &str = "Day of Year";
pub const RAINFALL_LABEL: &str = "Rainfall (cm)";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: u16,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend: bool,
    pub points: Vec<ChartPoint>,
}

/// File format for [`ChartSpec::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartFormat {
    #[default]
    Json,
    Html,
}

impl ChartFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ChartFormat::Json => "json",
            ChartFormat::Html => "html",
        }
    }
}

impl fmt::Display for ChartFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ChartFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ChartFormat::Json),
            "html" => Ok(ChartFormat::Html),
            other => Err(format!("unknown chart format '{}' (expected json or html)", other)),
        }
    }
}

impl ChartSpec {
    /// Line chart of rainfall (cm) against day of year, without a legend.
    pub fn rainfall(series: &RegionalSeries) -> Self {
        Self {
            title: RAINFALL_CHART_TITLE.to_string(),
            x_label: DAY_OF_YEAR_LABEL.to_string(),
            y_label: RAINFALL_LABEL.to_string(),
            legend: false,
            points: series
                .iter()
                .map(|s| ChartPoint {
                    x: s.doy,
                    y: s.rainfall_cm,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ExportError> {
        std::fs::write(path, self.to_json()?)
            .map_err(|e| ExportError::Write(path.to_path_buf(), e))
    }

    #[cfg(feature = "plotting")]
    pub fn write_html(&self, path: &Path) -> Result<(), ExportError> {
        use plotlars::{Legend, LinePlot, Plot, Text};
        use polars::prelude::{Column, DataFrame};

        let days: Vec<u32> = self.points.iter().map(|p| u32::from(p.x)).collect();
        let values: Vec<Option<f64>> = self.points.iter().map(|p| p.y).collect();
        let df = DataFrame::new(vec![
            Column::new("doy".into(), days),
            Column::new("rainfall".into(), values),
        ])
        .map_err(ExportError::Frame)?;

        // A single trace renders without a legend unless one is configured.
        let legend = self.legend.then(|| Legend::new().x(0.05).y(0.9));
        LinePlot::builder()
            .data(&df)
            .x("doy")
            .y("rainfall")
            .plot_title(Text::from(self.title.as_str()))
            .x_title(Text::from(self.x_label.as_str()))
            .y_title(Text::from(self.y_label.as_str()))
            .maybe_legend(legend.as_ref())
            .build()
            .write_html(path.to_string_lossy().to_string());
        Ok(())
    }

    #[cfg(not(feature = "plotting"))]
    pub fn write_html(&self, _path: &Path) -> Result<(), ExportError> {
        Err(ExportError::PlottingDisabled)
    }

    /// Writes `<folder>/<stem>.<ext>` and returns the path.
    pub fn write(&self, folder: &Path, stem: &str, format: ChartFormat) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(folder)
            .map_err(|e| ExportError::CreateFolder(folder.to_path_buf(), e))?;
        let path = folder.join(format!("{}.{}", stem, format.extension()));
        match format {
            ChartFormat::Json => self.write_json(&path)?,
            ChartFormat::Html => self.write_html(&path)?,
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample::RegionalSample;

    fn series() -> RegionalSeries {
        RegionalSeries::new(vec![
            RegionalSample {
                doy: 2,
                rainfall_cm: Some(0.4),
            },
            RegionalSample {
                doy: 1,
                rainfall_cm: None,
            },
        ])
    }

    #[test]
    fn test_rainfall_chart_labels_and_order() {
        let chart = ChartSpec::rainfall(&series());
        assert_eq!(chart.title, "Mean daily rainfall (cm)");
        assert_eq!(chart.x_label, "Day of Year");
        assert_eq!(chart.y_label, "Rainfall (cm)");
        assert!(!chart.legend);
        assert_eq!(
            chart.points,
            vec![ChartPoint { x: 1, y: None }, ChartPoint { x: 2, y: Some(0.4) }]
        );
    }

    #[test]
    fn test_json_has_null_for_missing_days() {
        let json: serde_json::Value =
            serde_json::from_str(&ChartSpec::rainfall(&series()).to_json().unwrap()).unwrap();
        assert_eq!(json["points"][0]["y"], serde_json::Value::Null);
        assert_eq!(json["points"][1]["x"], 2);
    }

    #[test]
    fn test_write_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = ChartSpec::rainfall(&series())
            .write(dir.path(), "KEN_rainfall_chart", ChartFormat::Json)
            .unwrap();
        assert_eq!(path, dir.path().join("KEN_rainfall_chart.json"));
        assert!(std::fs::read_to_string(path).unwrap().contains("Day of Year"));
    }

    #[test]
    fn test_json_carries_legend_setting() {
        let mut chart = ChartSpec::rainfall(&series());
        let json: serde_json::Value = serde_json::from_str(&chart.to_json().unwrap()).unwrap();
        assert_eq!(json["legend"], false);

        chart.legend = true;
        let json: serde_json::Value = serde_json::from_str(&chart.to_json().unwrap()).unwrap();
        assert_eq!(json["legend"], true);
    }

    #[cfg(feature = "plotting")]
    #[test]
    fn test_write_html_with_and_without_legend() {
        let dir = tempfile::tempdir().unwrap();
        let mut chart = ChartSpec::rainfall(&series());
        let plain = chart
            .write(dir.path(), "plain", ChartFormat::Html)
            .unwrap();
        chart.legend = true;
        let with_legend = chart
            .write(dir.path(), "with_legend", ChartFormat::Html)
            .unwrap();

        let plain = std::fs::read_to_string(plain).unwrap();
        let with_legend = std::fs::read_to_string(with_legend).unwrap();
        assert!(plain.contains("Mean daily rainfall (cm)"));
        assert_ne!(plain, with_legend);
    }

    #[test]
    fn test_chart_format_parsing() {
        assert_eq!("HTML".parse::<ChartFormat>(), Ok(ChartFormat::Html));
        assert_eq!(ChartFormat::default().to_string(), "json");
        assert!("png".parse::<ChartFormat>().is_err());
    }

    #[cfg(not(feature = "plotting"))]
    #[test]
    fn test_html_needs_plotting_feature() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ChartSpec::rainfall(&series()).write_html(&dir.path().join("c.html")),
            Err(ExportError::PlottingDisabled)
        ));
    }
}
