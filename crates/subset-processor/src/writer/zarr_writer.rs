//! Zarr V3 writer for subset chunks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use subset_common::{SubsetError, SubsetResult};
use tracing::debug;
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType as ZarrDataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs::storage::{ReadableStorageTraits, WritableStorageTraits};
use zarrs_filesystem::FilesystemStore;

use super::{ARRAY_DIMENSIONS_ATTR, COORDINATES_ATTR, VARIABLES_ATTR};
use crate::config::{WriteConfig, ZarrCompression};
use crate::dataset::{Attributes, DataType, Dataset, VariableData, LAT_DIM, LON_DIM, TIME_DIM};

/// Result of writing one dataset.
#[derive(Debug, Clone)]
pub struct ZarrWriteResult {
    /// Directory holding the Zarr hierarchy, when written to the filesystem.
    pub path: Option<PathBuf>,
    /// Names of the data variables written.
    pub variables: Vec<String>,
    /// Uncompressed bytes of all arrays.
    pub bytes_written: u64,
}

/// Writes datasets as Zarr V3 hierarchies.
pub struct ZarrDatasetWriter {
    config: WriteConfig,
}

impl ZarrDatasetWriter {
    /// Create a new writer with the given configuration.
    pub fn new(config: WriteConfig) -> Self {
        Self { config }
    }

    /// Write `ds` into a new directory at `path`.
    pub fn write_to_path(&self, ds: &Dataset, path: &Path) -> SubsetResult<ZarrWriteResult> {
        std::fs::create_dir_all(path)?;
        let store = FilesystemStore::new(path)
            .map_err(|e| SubsetError::storage_error(format!("{}: {}", path.display(), e)))?;
        let mut result = self.write(Arc::new(store), ds)?;
        result.path = Some(path.to_path_buf());
        Ok(result)
    }

    /// Write `ds` into `storage`.
    pub fn write<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
        &self,
        storage: Arc<S>,
        ds: &Dataset,
    ) -> SubsetResult<ZarrWriteResult> {
        let variables: Vec<String> = ds.variables().iter().map(|v| v.name().to_string()).collect();
        let mut coordinates = Vec::new();
        let mut bytes_written = 0u64;

        if let Some(time) = ds.time() {
            let units = match time.first() {
                Some(first) => format!("days since {}", first.format_iso().replace('T', " ")),
                None => "days since 1970-01-01 00:00:00".to_string(),
            };
            let values = time.to_cf(&units)?;

            let mut attrs = Attributes::new();
            attrs.insert("units".to_string(), serde_json::json!(units));
            attrs.insert("calendar".to_string(), serde_json::json!(time.calendar().cf_name()));
            attrs.insert("standard_name".to_string(), serde_json::json!("time"));
            bytes_written += self.write_array(
                storage.clone(),
                TIME_DIM,
                &[TIME_DIM.to_string()],
                &[values.len()],
                &VariableData::Float64(values),
                attrs,
            )?;
            coordinates.push(TIME_DIM);
        }

        for (name, values, units) in [
            (LAT_DIM, ds.lat(), "degrees_north"),
            (LON_DIM, ds.lon(), "degrees_east"),
        ] {
            let mut attrs = Attributes::new();
            attrs.insert("units".to_string(), serde_json::json!(units));
            bytes_written += self.write_array(
                storage.clone(),
                name,
                &[name.to_string()],
                &[values.len()],
                &VariableData::Float64(values.to_vec()),
                attrs,
            )?;
            coordinates.push(name);
        }

        for var in ds.variables() {
            bytes_written += self.write_array(
                storage.clone(),
                var.name(),
                var.dims(),
                var.shape(),
                var.data(),
                var.attributes().clone(),
            )?;
        }

        let mut root_attrs = ds.attributes().clone();
        root_attrs.insert(VARIABLES_ATTR.to_string(), serde_json::json!(variables));
        root_attrs.insert(COORDINATES_ATTR.to_string(), serde_json::json!(coordinates));
        let group = GroupBuilder::new()
            .attributes(root_attrs)
            .build(storage, "/")
            .map_err(|e| SubsetError::storage_error(e.to_string()))?;
        group
            .store_metadata()
            .map_err(|e| SubsetError::storage_error(e.to_string()))?;

        debug!(
            variables = variables.len(),
            bytes_written,
            compression = %self.config.zarr_compression,
            "Wrote Zarr dataset"
        );

        Ok(ZarrWriteResult {
            path: None,
            variables,
            bytes_written,
        })
    }

    /// Write one array with its `_ARRAY_DIMENSIONS` attribute. Returns the
    /// uncompressed size in bytes.
    fn write_array<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
        &self,
        storage: Arc<S>,
        name: &str,
        dims: &[String],
        shape: &[usize],
        data: &VariableData,
        mut attrs: Attributes,
    ) -> SubsetResult<u64> {
        attrs.insert(ARRAY_DIMENSIONS_ATTR.to_string(), serde_json::json!(dims));

        let array_shape: Vec<u64> = shape.iter().map(|&len| len as u64).collect();
        // Chunk lengths must be non-zero even for empty dimensions.
        let chunk_shape: Vec<u64> = shape.iter().map(|&len| len.max(1) as u64).collect();
        let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
            .try_into()
            .map_err(|e| SubsetError::ConfigError(format!("{:?}", e)))?;

        let (data_type, fill_value) = match data.data_type() {
            DataType::Float32 => (ZarrDataType::Float32, FillValue::from(f32::NAN)),
            DataType::Float64 => (ZarrDataType::Float64, FillValue::from(f64::NAN)),
        };

        let mut binding = ArrayBuilder::new(array_shape.clone(), data_type, chunk_grid, fill_value);
        let mut builder = binding.attributes(attrs);
        if self.config.zarr_compression != ZarrCompression::None {
            let codec = self.create_compression_codec(data.data_type())?;
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        let path = format!("/{}", name);
        let array: Array<S> = builder
            .build(storage, &path)
            .map_err(|e| SubsetError::storage_error(e.to_string()))?;
        array
            .store_metadata()
            .map_err(|e| SubsetError::storage_error(e.to_string()))?;

        if data.is_empty() {
            return Ok(0);
        }

        let subset = ArraySubset::new_with_shape(array_shape);
        match data {
            VariableData::Float32(values) => array.store_array_subset_elements(&subset, values.as_slice()),
            VariableData::Float64(values) => array.store_array_subset_elements(&subset, values.as_slice()),
        }
        .map_err(|e| SubsetError::storage_error(format!("{}: {}", name, e)))?;

        Ok((data.len() * data.data_type().size_bytes()) as u64)
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(
        &self,
        data_type: DataType,
    ) -> SubsetResult<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.zarr_compression_level)
            .map_err(|_| SubsetError::ConfigError("Invalid compression level".to_string()))?;

        let compressor = match self.config.zarr_compression {
            ZarrCompression::None => {
                return Err(SubsetError::ConfigError(
                    "No compression configured".to_string(),
                ))
            }
            ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        // typesize is required when shuffle is enabled
        let codec = BloscCodec::new(
            compressor,
            level,
            None,
            BloscShuffleMode::Shuffle,
            Some(data_type.size_bytes()),
        )
        .map_err(|e| SubsetError::ConfigError(e.to_string()))?;

        Ok(Arc::new(codec))
    }
}
