//! Cache-first data-frame loader (Arrow/Parquet)

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::{cache_location_from_env, load_cache_first, CacheLocks};
use super::{DATA_FRAME_CACHE_ENV, DEFAULT_DATA_FRAME_CACHE};
use crate::location::LocationConfig;
use crate::{Error, Result};

/// Tabular artifact held as Arrow record batches.
#[derive(Debug, Clone)]
pub struct DataFrame {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl DataFrame {
    /// Create a data frame from batches sharing `schema`.
    ///
    /// # Errors
    ///
    /// Returns error if any batch schema differs from `schema`
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        let mut frame = Self {
            schema,
            batches: Vec::with_capacity(batches.len()),
        };
        for batch in batches {
            frame.append_batch(batch)?;
        }
        Ok(frame)
    }

    /// Create a data frame holding a single batch.
    #[must_use]
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batches: vec![batch],
        }
    }

    /// Decode a parquet file held in memory.
    ///
    /// # Errors
    /// Returns error if the bytes are not a readable parquet file
    pub fn from_parquet_bytes(data: &[u8]) -> Result<Self> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(data))?;
        let schema = builder.schema().clone();
        let reader = builder.build()?;

        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch?);
        }

        Ok(Self { schema, batches })
    }

    /// Encode as a parquet file.
    ///
    /// # Errors
    /// Returns error if parquet encoding fails
    pub fn to_parquet_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ArrowWriter::try_new(Vec::new(), Arc::clone(&self.schema), None)?;
        for batch in &self.batches {
            writer.write(batch)?;
        }
        Ok(writer.into_inner()?)
    }

    /// Append a batch.
    ///
    /// # Errors
    ///
    /// Returns error if batch schema doesn't match the frame schema
    pub fn append_batch(&mut self, batch: RecordBatch) -> Result<()> {
        if batch.schema() != self.schema {
            return Err(Error::StorageError(format!(
                "Schema mismatch: expected {:?}, got {:?}",
                self.schema,
                batch.schema()
            )));
        }
        self.batches.push(batch);
        Ok(())
    }

    /// Frame schema.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// All record batches.
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    /// Column names in schema order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.fields().iter().map(|f| f.name().as_str()).collect()
    }

    /// Whole column `name` across all batches, `None` if there is no such column.
    ///
    /// # Errors
    /// Returns error if the column chunks cannot be concatenated
    pub fn column_by_name(&self, name: &str) -> Result<Option<ArrayRef>> {
        let Ok(index) = self.schema.index_of(name) else {
            return Ok(None);
        };
        let chunks: Vec<&dyn arrow::array::Array> = self
            .batches
            .iter()
            .map(|batch| batch.column(index).as_ref())
            .collect();
        if chunks.is_empty() {
            return Ok(Some(arrow::array::new_empty_array(
                self.schema.field(index).data_type(),
            )));
        }
        Ok(Some(arrow::compute::concat(&chunks)?))
    }

    /// All rows as one batch.
    ///
    /// # Errors
    /// Returns error if the batches cannot be concatenated
    pub fn to_single_batch(&self) -> Result<RecordBatch> {
        Ok(arrow::compute::concat_batches(&self.schema, &self.batches)?)
    }
}

/// Loads tabular artifacts from a location.
pub trait DataFrameLoader: Send + Sync {
    /// Load the parquet file `file_name` from `data_frame_location`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the file is absent, or a decode error
    /// if the bytes are not parquet.
    fn load_data_frame(
        &self,
        data_frame_location: &LocationConfig,
        file_name: &str,
    ) -> Result<DataFrame> {
        self.load_data_frame_cached_as(data_frame_location, file_name, file_name)
    }

    /// Like [`DataFrameLoader::load_data_frame`], caching under `cache_key`.
    ///
    /// # Errors
    ///
    /// Same as [`DataFrameLoader::load_data_frame`].
    fn load_data_frame_cached_as(
        &self,
        data_frame_location: &LocationConfig,
        file_name: &str,
        cache_key: &str,
    ) -> Result<DataFrame>;
}

/// Data-frame loader with a cache in front of the source.
#[derive(Debug, Clone)]
pub struct CacheDataFrameLoader {
    cache_location: LocationConfig,
    locks: Option<Arc<CacheLocks>>,
}

impl CacheDataFrameLoader {
    /// Create a loader caching into `cache_location`.
    #[must_use]
    pub fn new(cache_location: LocationConfig) -> Self {
        Self {
            cache_location,
            locks: None,
        }
    }

    /// Create a loader caching into `$DATAFRAME_CACHE_PATH` or `./dataframe_cache`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(cache_location_from_env(
            DATA_FRAME_CACHE_ENV,
            DEFAULT_DATA_FRAME_CACHE,
        ))
    }

    /// Serialize cache lookups per cache path.
    #[must_use]
    pub fn with_key_locking(mut self) -> Self {
        self.locks = Some(Arc::new(CacheLocks::default()));
        self
    }

    /// Cache location this loader writes to.
    #[must_use]
    pub const fn cache_location(&self) -> &LocationConfig {
        &self.cache_location
    }
}

impl Default for CacheDataFrameLoader {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DataFrameLoader for CacheDataFrameLoader {
    fn load_data_frame_cached_as(
        &self,
        data_frame_location: &LocationConfig,
        file_name: &str,
        cache_key: &str,
    ) -> Result<DataFrame> {
        load_cache_first(
            &self.cache_location,
            data_frame_location,
            file_name,
            cache_key,
            self.locks.as_deref(),
            DataFrame::from_parquet_bytes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    fn sample_batch(ids: Vec<i32>, labels: Vec<&str>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("label", DataType::Utf8, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(ids)),
                Arc::new(StringArray::from(labels)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parquet_bytes_preserve_rows() {
        let frame = DataFrame::from_batch(sample_batch(vec![1, 2, 3], vec!["a", "b", "c"]));
        let bytes = frame.to_parquet_bytes().unwrap();

        let decoded = DataFrame::from_parquet_bytes(&bytes).unwrap();
        assert_eq!(decoded.num_rows(), 3);
        assert_eq!(decoded.column_names(), vec!["id", "label"]);
        assert_eq!(
            decoded.to_single_batch().unwrap().columns(),
            frame.to_single_batch().unwrap().columns()
        );
    }

    #[test]
    fn test_garbage_is_not_parquet() {
        assert!(DataFrame::from_parquet_bytes(b"definitely not parquet").is_err());
    }

    #[test]
    fn test_column_by_name_spans_batches() {
        let first = sample_batch(vec![1, 2], vec!["a", "b"]);
        let second = sample_batch(vec![3], vec!["c"]);
        let frame = DataFrame::try_new(first.schema(), vec![first, second]).unwrap();

        let column = frame.column_by_name("id").unwrap().unwrap();
        let ids = column.as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(ids.values().to_vec(), vec![1, 2, 3]);
        assert!(frame.column_by_name("missing").unwrap().is_none());
    }

    #[test]
    fn test_append_batch_schema_mismatch() {
        let mut frame = DataFrame::from_batch(sample_batch(vec![1], vec!["a"]));
        let other_schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Int32, false)]));
        let other =
            RecordBatch::try_new(other_schema, vec![Arc::new(Int32Array::from(vec![9]))]).unwrap();

        let err = frame.append_batch(other).unwrap_err();
        assert!(err.to_string().contains("Schema mismatch"));
        assert_eq!(frame.num_rows(), 1);
    }
}
