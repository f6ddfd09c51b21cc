//! File output for subset chunks.
//!
//! A chunk is written either as a Zarr V3 group holding one array per
//! coordinate and per variable, or as a netCDF-4 file. [`open_dataset`]
//! reads the Zarr layout back.

mod netcdf_writer;
mod zarr_reader;
mod zarr_writer;

pub use netcdf_writer::{NetCdfDatasetWriter, NetCdfWriteResult};
pub use zarr_reader::{open_dataset, read_dataset};
pub use zarr_writer::{ZarrDatasetWriter, ZarrWriteResult};

/// Attribute naming the dimensions of an array, as used by xarray.
pub const ARRAY_DIMENSIONS_ATTR: &str = "_ARRAY_DIMENSIONS";

/// Root group attribute listing the data variables.
pub const VARIABLES_ATTR: &str = "_VARIABLES";

/// Root group attribute listing the coordinate arrays.
pub const COORDINATES_ATTR: &str = "_COORDINATES";
