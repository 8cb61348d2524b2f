use chrono::{Datelike, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use geo::{polygon, MultiPolygon};
use rainfall_climatology::{
    compute_series, CompositeCollection, DailyImage, DataSource, DateRange, Grid,
    ImageCollection, LeapRule, PipelineConfig, Region, DEFAULT_BAND,
};
use std::path::Path;
use std::sync::Arc;

fn eleven_years() -> ImageCollection {
    let grid = Arc::new(Grid::regular(-1.0, 35.0, 0.25, 12, 12));
    let start = NaiveDate::from_ymd_opt(2009, 1, 1).unwrap();
    let images: Vec<DailyImage> = start
        .iter_days()
        .take_while(|d| d.year() <= 2019)
        .map(|d| DailyImage::constant(d, grid.clone(), DEFAULT_BAND, 0.0001 * d.ordinal() as f64))
        .collect();
    ImageCollection::from_images(&images).unwrap()
}

fn region() -> Region {
    Region::new(
        "Box",
        "BOX",
        MultiPolygon::new(vec![polygon![
            (x: 35.1, y: -0.9),
            (x: 37.4, y: -0.9),
            (x: 37.4, y: 1.6),
            (x: 35.1, y: 1.6),
            (x: 35.1, y: -0.9),
        ]]),
    )
}

fn bench_climatology(c: &mut Criterion) {
    let images = eleven_years();
    let region = region();
    let config = PipelineConfig::builder()
        .country_name("Box")
        .country_prefix("BOX")
        .images(DataSource::from(Path::new("unused.parquet")))
        .boundaries(DataSource::from(Path::new("unused.geojson")))
        .build();

    c.bench_function("aggregate_by_day_of_year", |b| {
        b.iter(|| {
            let tagged = images
                .filter_date(DateRange::default())
                .drop_leap_days()
                .tag_day_of_year(black_box(LeapRule::Mod4));
            CompositeCollection::from_tagged(&tagged).collect().unwrap()
        })
    });
    c.bench_function("compute_series", |b| {
        b.iter(|| compute_series(black_box(&images), &region, &config).unwrap())
    });
}

criterion_group!(benches, bench_climatology);
criterion_main!(benches);
