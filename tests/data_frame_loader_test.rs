//! Integration tests for the cache-first data-frame loader

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use expdash::loader::{CacheDataFrameLoader, DataFrame, DataFrameLoader};
use expdash::location::LocationConfig;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;

/// Create a metrics table with `num_rows` epochs
fn create_metrics_batch(num_rows: i32) -> RecordBatch {
    let schema = Schema::new(vec![
        Field::new("epoch", DataType::Int32, false),
        Field::new("loss", DataType::Float64, false),
        Field::new("split", DataType::Utf8, false),
    ]);

    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int32Array::from_iter_values(0..num_rows)),
            Arc::new(Float64Array::from_iter_values(
                (0..num_rows).map(|i| 1.0 / f64::from(i + 1)),
            )),
            Arc::new(StringArray::from_iter_values(
                (0..num_rows).map(|i| if i % 2 == 0 { "train" } else { "val" }),
            )),
        ],
    )
    .unwrap()
}

/// Write a parquet file split into two row groups
fn write_parquet(path: &Path, num_rows: i32) {
    let batch = create_metrics_batch(num_rows);
    let file = File::create(path).unwrap();
    let props = WriterProperties::builder()
        .set_max_row_group_size(usize::try_from(num_rows).unwrap() / 2)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

/// Write a single row group with the given codec
fn write_compressed_parquet(path: &Path, num_rows: i32, compression: Compression) {
    let batch = create_metrics_batch(num_rows);
    let file = File::create(path).unwrap();
    let props = WriterProperties::builder()
        .set_compression(compression)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[test]
fn test_load_parquet_through_cache() {
    let source = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    write_parquet(&source.path().join("metrics.parquet"), 100);

    let loader = CacheDataFrameLoader::new(LocationConfig::from(cache.path()));
    let frame = loader
        .load_data_frame(&LocationConfig::from(source.path()), "metrics.parquet")
        .unwrap();

    assert_eq!(frame.num_rows(), 100);
    assert_eq!(frame.column_names(), vec!["epoch", "loss", "split"]);
    assert!(cache.path().join("metrics.parquet").exists());
}

#[test]
fn test_cached_frame_survives_source_removal() {
    let source = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let source_file = source.path().join("metrics.parquet");
    write_parquet(&source_file, 10);
    let source_location = LocationConfig::from(source.path());

    let loader = CacheDataFrameLoader::new(LocationConfig::from(cache.path()));
    let first = loader.load_data_frame(&source_location, "metrics.parquet").unwrap();

    fs::remove_file(&source_file).unwrap();
    let second = loader.load_data_frame(&source_location, "metrics.parquet").unwrap();

    assert_eq!(first.num_rows(), second.num_rows());
    assert_eq!(
        first.to_single_batch().unwrap().columns(),
        second.to_single_batch().unwrap().columns()
    );
}

#[test]
fn test_cache_is_not_revalidated() {
    let source = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let source_file = source.path().join("metrics.parquet");
    write_parquet(&source_file, 10);
    let source_location = LocationConfig::from(source.path());

    let loader = CacheDataFrameLoader::new(LocationConfig::from(cache.path()));
    loader.load_data_frame(&source_location, "metrics.parquet").unwrap();

    write_parquet(&source_file, 40);
    let frame = loader.load_data_frame(&source_location, "metrics.parquet").unwrap();
    assert_eq!(frame.num_rows(), 10);
}

#[test]
fn test_missing_frame_is_not_found() {
    let source = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();

    let loader = CacheDataFrameLoader::new(LocationConfig::from(cache.path()));
    let err = loader
        .load_data_frame(&LocationConfig::from(source.path()), "absent.parquet")
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_non_parquet_source_fails_and_is_not_cached() {
    let source = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    fs::write(source.path().join("table.parquet"), b"epoch,loss\n1,0.5\n").unwrap();

    let loader = CacheDataFrameLoader::new(LocationConfig::from(cache.path()));
    let err = loader
        .load_data_frame(&LocationConfig::from(source.path()), "table.parquet")
        .unwrap_err();
    assert!(matches!(err, expdash::Error::Parquet(_)));
    assert!(!cache.path().join("table.parquet").exists());
}

#[test]
fn test_column_access_across_row_groups() {
    let source = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    write_parquet(&source.path().join("metrics.parquet"), 20);

    let loader = CacheDataFrameLoader::new(LocationConfig::from(cache.path()));
    let frame = loader
        .load_data_frame(&LocationConfig::from(source.path()), "metrics.parquet")
        .unwrap();

    let epochs = frame.column_by_name("epoch").unwrap().unwrap();
    let epochs = epochs.as_any().downcast_ref::<Int32Array>().unwrap();
    assert_eq!(epochs.len(), 20);
    assert_eq!(epochs.value(19), 19);

    assert!(frame.column_by_name("accuracy").unwrap().is_none());
}

#[test]
fn test_memory_cache_with_key_locking() {
    let source = tempfile::tempdir().unwrap();
    write_parquet(&source.path().join("metrics.parquet"), 8);

    let loader =
        CacheDataFrameLoader::new(LocationConfig::new("memory://df-test-cache/frames"))
            .with_key_locking();
    let frame = loader
        .load_data_frame(&LocationConfig::from(source.path()), "metrics.parquet")
        .unwrap();
    assert_eq!(frame.num_rows(), 8);

    let cached = LocationConfig::new("memory://df-test-cache/frames")
        .open()
        .unwrap()
        .read("metrics.parquet")
        .unwrap();
    assert_eq!(DataFrame::from_parquet_bytes(&cached).unwrap().num_rows(), 8);
}

#[test]
fn test_compressed_tables_decode() {
    let source = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let codecs = [
        ("snappy.parquet", Compression::SNAPPY),
        ("zstd.parquet", Compression::ZSTD(ZstdLevel::default())),
        ("lz4.parquet", Compression::LZ4_RAW),
        ("gzip.parquet", Compression::GZIP(GzipLevel::default())),
    ];
    for (file_name, compression) in codecs {
        write_compressed_parquet(&source.path().join(file_name), 3, compression);
    }

    let loader = CacheDataFrameLoader::new(LocationConfig::from(cache.path()));
    for (file_name, _) in codecs {
        let frame = loader
            .load_data_frame(&LocationConfig::from(source.path()), file_name)
            .unwrap();
        assert_eq!(frame.num_rows(), 3, "{file_name}");
        assert_eq!(frame.column_names(), vec!["epoch", "loss", "split"]);
    }
}

#[test]
fn test_escaping_file_names_are_rejected() {
    let source = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let outside_file = outside.path().join("metrics.parquet");
    write_parquet(&outside_file, 4);

    let loader = CacheDataFrameLoader::new(LocationConfig::from(cache.path()));
    let source_location = LocationConfig::from(source.path());
    for file_name in [outside_file.to_string_lossy().into_owned(), "../x.parquet".to_string()] {
        let err = loader.load_data_frame(&source_location, &file_name).unwrap_err();
        assert!(matches!(err, expdash::Error::InvalidPath { .. }), "{file_name}");
    }
}
