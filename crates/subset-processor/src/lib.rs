//! Calendar-aware subsetting of climate model output.
//!
//! This crate cuts gridded `(time, lat, lon)` datasets down to a requested
//! time range and bounding box, and splits the result into chunks that each
//! stay within a size budget. It enables:
//!
//! - **Calendar-aware time selection**: `360_day`, `noleap` and friends, with
//!   request bounds snapped to the nearest available time value
//! - **Parameter normalization**: raw strings and numbers or pre-validated
//!   parameters are both accepted
//! - **Size-bounded output**: chunks in memory, as Zarr V3 directories or
//!   as netCDF-4 files
//!
//! # Architecture
//!
//! ```text
//! subset(ds, params)
//!      │
//!      ├─► map_params: validate selectors, snap dates to the time axis
//!      │
//!      ├─► subset_bbox: cut time range and bounding box
//!      │
//!      ├─► chunk_dataset: split along time so each chunk fits the budget
//!      │
//!      └─► memory chunks, or one Zarr directory or netCDF file per chunk
//! ```
//!
//! # Example
//!
//! ```ignore
//! use subset_processor::{subset, DatasetSource, OutputType, SelectionRequest, SubsetParams};
//!
//! let request = SelectionRequest::new()
//!     .with_time("2001-01-01", "2200-12-30")
//!     .with_area([0.0, 49.0, 10.0, 65.0]);
//! let params = SubsetParams::new(request)
//!     .with_output_type(OutputType::Zarr)
//!     .with_output_dir("/tmp/out")
//!     .with_file_size_limit("100MB");
//!
//! let output = subset(Some(DatasetSource::from(paths)), &params)?;
//! ```

pub mod chunking;
pub mod config;
pub mod dataset;
pub mod namer;
pub mod ops;
pub mod params;
pub mod resolver;
pub mod subset;
pub mod writer;

// Re-export commonly used types at crate root
pub use chunking::{chunk_dataset, get_time_slices, OutputChunk, SizeEstimate};
pub use config::{
    current_config, parse_size, set_config, ConfigOverride, SelectorPolicy, SubsetConfig,
    WriteConfig, ZarrCompression,
};
pub use dataset::{
    Attributes, DataType, Dataset, DimSelection, TimeCoordinate, Variable, VariableData,
};
pub use namer::{FileNamer, FileNamerKind, SimpleFileNamer, StandardFileNamer};
pub use ops::{subset, DatasetSource, OutputType, SubsetOutput, SubsetParams};
pub use params::{
    map_params, AreaParameter, AreaSelector, LevelParameter, LevelSelector, ResolvedBounds,
    SelectionRequest, Selector, TimeParameter, TimeSelector,
};
pub use resolver::{get_nearest_time, resolve_bound, BoundSide, SnappedTime};
pub use subset::{subset_bbox, subset_time, SubsetArgs};
pub use subset_common::{
    AreaValue, BoundingBox, Calendar, CfDatetime, SubsetError, SubsetResult, TimeBound,
};
pub use writer::{
    open_dataset, read_dataset, NetCdfDatasetWriter, NetCdfWriteResult, ZarrDatasetWriter,
    ZarrWriteResult,
};
