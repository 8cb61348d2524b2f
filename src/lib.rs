mod boundaries;
mod climatology;
mod collection;
mod download;
mod error;
mod export;
mod pipeline;
mod types;
mod utils;

pub use error::ClimatologyError;
pub use pipeline::*;

pub use boundaries::boundary_set::{BoundaryFeature, BoundarySet, DEFAULT_NAME_FIELD};
pub use collection::image_collection::{
    ImageCollection, TaggedCollection, DATE_COLUMN, DOY_COLUMN, LAT_COLUMN, LON_COLUMN,
    YEAR_COLUMN,
};
pub use collection::loader::ImageLoader;

pub use climatology::composite_collection::{
    centimeter_band, CompositeCollection, RAINFALL_CM_COLUMN,
};
pub use climatology::day_of_year::{
    adjust_relative_day, adjusted_day_of_year, is_leap_year, LeapRule, DAYS_PER_YEAR,
    FEB_28_RELATIVE_DAY,
};
pub use climatology::region_mask::{RegionMask, DEFAULT_SCALE_M};

pub use export::chart::{ChartFormat, ChartPoint, ChartSpec};
pub use export::csv_export::{CsvExport, DEFAULT_EXPORT_FOLDER};
pub use export::job::{ExportJob, ExportState, DEFAULT_POLL_INTERVAL};

pub use types::composite::Composite;
pub use types::data_source::DataSource;
pub use types::date_range::DateRange;
pub use types::image::{DailyImage, Grid};
pub use types::region::Region;
pub use types::sample::{RegionalSample, RegionalSeries};

pub use boundaries::error::RegionError;
pub use collection::error::CollectionError;
pub use download::DownloadError;
pub use export::error::ExportError;
