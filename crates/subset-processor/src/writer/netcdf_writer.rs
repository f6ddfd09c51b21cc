//! netCDF-4 writer for subset chunks.
//!
//! Each chunk becomes one file with a dimension per axis, CF-encoded time
//! and the dataset's global and variable attributes.

use std::path::{Path, PathBuf};

use netcdf::AttributeValue;
use serde_json::Value;
use subset_common::{SubsetError, SubsetResult};
use tracing::debug;

use crate::config::WriteConfig;
use crate::dataset::{Attributes, Dataset, VariableData, LAT_DIM, LON_DIM, TIME_DIM};

/// Result of writing one netCDF file.
#[derive(Debug, Clone)]
pub struct NetCdfWriteResult {
    pub path: PathBuf,
    /// Names of the data variables written.
    pub variables: Vec<String>,
    /// Uncompressed bytes of all variables and coordinates.
    pub bytes_written: u64,
}

/// Writes datasets as netCDF-4 files.
pub struct NetCdfDatasetWriter {
    config: WriteConfig,
}

impl NetCdfDatasetWriter {
    pub fn new(config: WriteConfig) -> Self {
        Self { config }
    }

    /// Write `ds` to a new file at `path`, replacing any existing file.
    pub fn write_to_path(&self, ds: &Dataset, path: &Path) -> SubsetResult<NetCdfWriteResult> {
        let nc_err =
            |e: netcdf::Error| SubsetError::storage_error(format!("{}: {}", path.display(), e));

        let mut file = netcdf::create(path).map_err(nc_err)?;
        let mut dims: Vec<String> = Vec::new();
        let mut bytes_written = 0u64;

        if let Some(time) = ds.time() {
            let units = match time.first() {
                Some(first) => format!("days since {}", first.format_iso().replace('T', " ")),
                None => "days since 1970-01-01 00:00:00".to_string(),
            };
            let values = time.to_cf(&units)?;

            let mut attrs = Attributes::new();
            attrs.insert("units".to_string(), Value::from(units));
            attrs.insert("calendar".to_string(), Value::from(time.calendar().cf_name()));
            attrs.insert("standard_name".to_string(), Value::from("time"));
            bytes_written += self
                .write_variable(
                    &mut file,
                    &mut dims,
                    TIME_DIM,
                    &[TIME_DIM.to_string()],
                    &[values.len()],
                    &VariableData::Float64(values),
                    &attrs,
                )
                .map_err(nc_err)?;
        }

        for (name, values, units, standard_name) in [
            (LAT_DIM, ds.lat(), "degrees_north", "latitude"),
            (LON_DIM, ds.lon(), "degrees_east", "longitude"),
        ] {
            let mut attrs = Attributes::new();
            attrs.insert("units".to_string(), Value::from(units));
            attrs.insert("standard_name".to_string(), Value::from(standard_name));
            bytes_written += self
                .write_variable(
                    &mut file,
                    &mut dims,
                    name,
                    &[name.to_string()],
                    &[values.len()],
                    &VariableData::Float64(values.to_vec()),
                    &attrs,
                )
                .map_err(nc_err)?;
        }

        for var in ds.variables() {
            bytes_written += self
                .write_variable(
                    &mut file,
                    &mut dims,
                    var.name(),
                    var.dims(),
                    var.shape(),
                    var.data(),
                    var.attributes(),
                )
                .map_err(nc_err)?;
        }

        for (key, value) in ds.attributes() {
            match to_attribute_value(value) {
                Some(value) => {
                    file.add_attribute(key, value).map_err(nc_err)?;
                }
                None => debug!(
                    attribute = %key,
                    "Skipping global attribute without a netCDF type"
                ),
            }
        }

        let variables: Vec<String> = ds.variables().iter().map(|v| v.name().to_string()).collect();
        debug!(
            path = %path.display(),
            variables = variables.len(),
            bytes_written,
            deflate_level = self.config.netcdf_deflate_level,
            "Wrote netCDF dataset"
        );

        Ok(NetCdfWriteResult {
            path: path.to_path_buf(),
            variables,
            bytes_written,
        })
    }

    /// Define one variable, creating its dimensions on first use, and store
    /// its values. Returns the uncompressed size in bytes.
    #[allow(clippy::too_many_arguments)]
    fn write_variable(
        &self,
        file: &mut netcdf::FileMut,
        defined: &mut Vec<String>,
        name: &str,
        dims: &[String],
        shape: &[usize],
        data: &VariableData,
        attrs: &Attributes,
    ) -> Result<u64, netcdf::Error> {
        for (dim, &len) in dims.iter().zip(shape) {
            if !defined.contains(dim) {
                // A zero length would define an unlimited dimension.
                if len == 0 {
                    file.add_unlimited_dimension(dim)?;
                } else {
                    file.add_dimension(dim, len)?;
                }
                defined.push(dim.clone());
            }
        }
        let dim_names: Vec<&str> = dims.iter().map(String::as_str).collect();

        let mut var = match data {
            VariableData::Float32(_) => file.add_variable::<f32>(name, &dim_names)?,
            VariableData::Float64(_) => file.add_variable::<f64>(name, &dim_names)?,
        };
        if self.config.netcdf_deflate_level > 0 && !dims.is_empty() {
            var.set_compression(self.config.netcdf_deflate_level as i32, true)?;
        }
        for (key, value) in attrs {
            match to_attribute_value(value) {
                Some(value) => {
                    var.put_attribute(key, value)?;
                }
                None => debug!(
                    variable = name,
                    attribute = %key,
                    "Skipping attribute without a netCDF type"
                ),
            }
        }

        if data.is_empty() {
            return Ok(0);
        }
        match data {
            VariableData::Float32(values) => var.put_values(values.as_slice(), ..)?,
            VariableData::Float64(values) => var.put_values(values.as_slice(), ..)?,
        }
        Ok((data.len() * data.data_type().size_bytes()) as u64)
    }
}

/// netCDF attribute for a JSON value. Objects, nulls and mixed arrays have
/// no netCDF counterpart.
fn to_attribute_value(value: &Value) -> Option<AttributeValue> {
    match value {
        Value::String(s) => Some(AttributeValue::Str(s.clone())),
        Value::Bool(b) => Some(AttributeValue::Int(i32::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => match i32::try_from(i) {
                Ok(i) => Some(AttributeValue::Int(i)),
                Err(_) => Some(AttributeValue::Longlong(i)),
            },
            None => n.as_f64().map(AttributeValue::Double),
        },
        Value::Array(items) if !items.is_empty() => {
            let strs = items
                .iter()
                .map(|v| v.as_str().map(String::from))
                .collect::<Option<Vec<String>>>();
            if let Some(strs) = strs {
                Some(AttributeValue::Strs(strs))
            } else {
                items
                    .iter()
                    .map(Value::as_f64)
                    .collect::<Option<Vec<f64>>>()
                    .map(AttributeValue::Doubles)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(value: serde_json::Value) -> Option<AttributeValue> {
        to_attribute_value(&value)
    }

    #[test]
    fn test_attribute_conversion() {
        assert!(matches!(
            attribute(serde_json::json!("K")),
            Some(AttributeValue::Str(s)) if s == "K"
        ));
        assert!(matches!(attribute(serde_json::json!(1)), Some(AttributeValue::Int(1))));
        assert!(matches!(
            attribute(serde_json::json!(10_000_000_000i64)),
            Some(AttributeValue::Longlong(10_000_000_000))
        ));
        assert!(matches!(
            attribute(serde_json::json!(1.5)),
            Some(AttributeValue::Double(v)) if v == 1.5
        ));
        assert!(matches!(
            attribute(serde_json::json!(["time", "lat"])),
            Some(AttributeValue::Strs(v)) if v == ["time", "lat"]
        ));
        assert!(matches!(
            attribute(serde_json::json!([1, 2.5])),
            Some(AttributeValue::Doubles(v)) if v == [1.0, 2.5]
        ));
    }

    #[test]
    fn test_attributes_without_netcdf_type() {
        assert!(attribute(serde_json::json!(null)).is_none());
        assert!(attribute(serde_json::json!({"a": 1})).is_none());
        assert!(attribute(serde_json::json!([])).is_none());
        assert!(attribute(serde_json::json!(["a", 1])).is_none());
    }
}
