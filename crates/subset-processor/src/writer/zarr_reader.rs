//! Reads datasets written by [`super::ZarrDatasetWriter`].

use std::path::Path;
use std::sync::Arc;

use subset_common::{SubsetError, SubsetResult};
use tracing::debug;
use zarrs::array::{Array, DataType as ZarrDataType};
use zarrs::array_subset::ArraySubset;
use zarrs::group::Group;
use zarrs::storage::ReadableStorageTraits;
use zarrs_filesystem::FilesystemStore;

use super::{ARRAY_DIMENSIONS_ATTR, COORDINATES_ATTR, VARIABLES_ATTR};
use crate::dataset::{
    Attributes, Dataset, TimeCoordinate, Variable, VariableData, LAT_DIM, LON_DIM, TIME_DIM,
};

/// Open a Zarr dataset directory.
pub fn open_dataset(path: impl AsRef<Path>) -> SubsetResult<Dataset> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Err(SubsetError::storage_error(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    let store = FilesystemStore::new(path)
        .map_err(|e| SubsetError::storage_error(format!("{}: {}", path.display(), e)))?;
    read_dataset(Arc::new(store))
}

/// Read a dataset from the root group of `storage`.
pub fn read_dataset<S: ReadableStorageTraits + 'static>(storage: Arc<S>) -> SubsetResult<Dataset> {
    let group = Group::open(storage.clone(), "/")
        .map_err(|e| SubsetError::storage_error(e.to_string()))?;

    let mut attributes: Attributes = group.attributes().clone();
    let variable_names = string_list(attributes.remove(VARIABLES_ATTR), VARIABLES_ATTR)?;
    let coordinates = string_list(attributes.remove(COORDINATES_ATTR), COORDINATES_ATTR)?;

    let time = if coordinates.iter().any(|c| c == TIME_DIM) {
        let array = open_array(&storage, TIME_DIM)?;
        let units = array
            .attributes()
            .get("units")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SubsetError::invalid_dataset("time array has no units"))?
            .to_string();
        let calendar = array
            .attributes()
            .get("calendar")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let values = read_values(&array, TIME_DIM)?.to_f64_vec();
        Some(TimeCoordinate::from_cf(&values, &units, calendar.as_deref())?)
    } else {
        None
    };

    let lat = read_values(&open_array(&storage, LAT_DIM)?, LAT_DIM)?.to_f64_vec();
    let lon = read_values(&open_array(&storage, LON_DIM)?, LON_DIM)?.to_f64_vec();

    let mut variables = Vec::with_capacity(variable_names.len());
    for name in &variable_names {
        let array = open_array(&storage, name)?;
        let mut var_attrs = array.attributes().clone();
        let dims = string_list(var_attrs.remove(ARRAY_DIMENSIONS_ATTR), ARRAY_DIMENSIONS_ATTR)?;
        let dims: Vec<&str> = dims.iter().map(String::as_str).collect();
        let shape: Vec<usize> = array.shape().iter().map(|&len| len as usize).collect();
        let data = read_values(&array, name)?;
        variables.push(Variable::new(name.as_str(), &dims, shape, data)?.with_attributes(var_attrs));
    }

    debug!(
        variables = variables.len(),
        time_steps = time.as_ref().map_or(0, TimeCoordinate::len),
        "Read Zarr dataset"
    );

    Dataset::new(time, lat, lon, variables, attributes)
}

fn open_array<S: ReadableStorageTraits + 'static>(
    storage: &Arc<S>,
    name: &str,
) -> SubsetResult<Array<S>> {
    Array::open(storage.clone(), &format!("/{}", name))
        .map_err(|e| SubsetError::storage_error(format!("{}: {}", name, e)))
}

fn read_values<S: ReadableStorageTraits + 'static>(
    array: &Array<S>,
    name: &str,
) -> SubsetResult<VariableData> {
    let shape = array.shape().to_vec();
    let is_empty = shape.iter().any(|&len| len == 0);
    let subset = ArraySubset::new_with_shape(shape);
    let storage_err = |e: zarrs::array::ArrayError| SubsetError::storage_error(format!("{}: {}", name, e));

    match array.data_type() {
        ZarrDataType::Float32 if is_empty => Ok(VariableData::Float32(Vec::new())),
        ZarrDataType::Float64 if is_empty => Ok(VariableData::Float64(Vec::new())),
        ZarrDataType::Float32 => Ok(VariableData::Float32(
            array
                .retrieve_array_subset_elements::<f32>(&subset)
                .map_err(storage_err)?,
        )),
        ZarrDataType::Float64 => Ok(VariableData::Float64(
            array
                .retrieve_array_subset_elements::<f64>(&subset)
                .map_err(storage_err)?,
        )),
        other => Err(SubsetError::invalid_dataset(format!(
            "array '{}' has unsupported data type {:?}",
            name, other
        ))),
    }
}

fn string_list(value: Option<serde_json::Value>, key: &str) -> SubsetResult<Vec<String>> {
    let value = value.ok_or_else(|| SubsetError::invalid_dataset(format!("missing '{}' attribute", key)))?;
    Ok(serde_json::from_value(value)?)
}
