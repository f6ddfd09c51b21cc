//! Output file naming.

use serde::{Deserialize, Serialize};
use subset_common::{SubsetError, SubsetResult};

use crate::chunking::OutputChunk;
use crate::dataset::Dataset;

/// Assigns a file name to an output chunk.
pub trait FileNamer: Send + Sync {
    /// File name (without directory) for `chunk`, ending in `.{extension}`.
    fn file_name(&self, chunk: &OutputChunk, extension: &str) -> String;
}

/// Sequential names: `output_001.zarr`, `output_002.zarr`, ...
#[derive(Debug, Clone, Default)]
pub struct SimpleFileNamer {
    prefix: String,
}

impl SimpleFileNamer {
    pub fn new() -> Self {
        Self {
            prefix: "output".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl FileNamer for SimpleFileNamer {
    fn file_name(&self, chunk: &OutputChunk, extension: &str) -> String {
        format!("{}_{:03}.{}", self.prefix, chunk.index + 1, extension)
    }
}

/// Names derived from CMIP5 metadata:
/// `tas_mon_HadGEM2-ES_rcp85_r1i1p1_20051216-20301116.zarr`.
///
/// Missing metadata degrades to `{var}_{start}-{end}.zarr`, and a chunk
/// without a time extent drops the date range.
#[derive(Debug, Clone, Default)]
pub struct StandardFileNamer;

const CMIP5_FACETS: [&str; 3] = ["frequency", "model_id", "experiment_id"];

impl StandardFileNamer {
    fn ensemble_member(ds: &Dataset) -> Option<String> {
        let r = attribute_string(ds, "realization")?;
        let i = attribute_string(ds, "initialization_method")?;
        let p = attribute_string(ds, "physics_version")?;
        Some(format!("r{}i{}p{}", r, i, p))
    }

    fn facets(ds: &Dataset) -> Option<Vec<String>> {
        let mut facets = CMIP5_FACETS
            .iter()
            .map(|key| attribute_string(ds, key))
            .collect::<Option<Vec<_>>>()?;
        facets.push(Self::ensemble_member(ds)?);
        Some(facets)
    }
}

impl FileNamer for StandardFileNamer {
    fn file_name(&self, chunk: &OutputChunk, extension: &str) -> String {
        let ds = &chunk.dataset;
        let var_id = ds
            .main_variable()
            .map(|v| v.name().to_string())
            .unwrap_or_else(|| "output".to_string());

        let mut parts = vec![var_id];
        if let Some(facets) = Self::facets(ds) {
            parts.extend(facets);
        }
        if let Some((start, end)) = chunk.time_extent {
            parts.push(format!(
                "{}-{}",
                start.format_compact_date(),
                end.format_compact_date()
            ));
        }

        format!("{}.{}", sanitize(&parts.join("_")), extension)
    }
}

/// Attribute as a string, accepting string and numeric JSON values.
fn attribute_string(ds: &Dataset, key: &str) -> Option<String> {
    match ds.attributes().get(key)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Keep names portable: path separators and whitespace become dashes.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' || c.is_whitespace() { '-' } else { c })
        .collect()
}

/// Naming scheme selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNamerKind {
    #[default]
    Standard,
    Simple,
}

impl FileNamerKind {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> SubsetResult<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "simple" => Ok(Self::Simple),
            other => Err(SubsetError::invalid_parameter(
                "file_namer",
                format!("unknown file namer '{}', expected 'simple' or 'standard'", other),
            )),
        }
    }

    /// Instantiate the namer.
    pub fn namer(&self) -> Box<dyn FileNamer> {
        match self {
            Self::Standard => Box::new(StandardFileNamer),
            Self::Simple => Box::new(SimpleFileNamer::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::chunk_dataset;
    use crate::dataset::{Attributes, TimeCoordinate, Variable};
    use subset_common::{Calendar, CfDatetime};

    fn chunks(attributes: Attributes) -> Vec<OutputChunk> {
        let values = vec![
            CfDatetime::from_ymd(Calendar::Day360, 2005, 12, 16).unwrap(),
            CfDatetime::from_ymd(Calendar::Day360, 2006, 1, 16).unwrap(),
            CfDatetime::from_ymd(Calendar::Day360, 2030, 11, 16).unwrap(),
        ];
        let time = TimeCoordinate::new(Calendar::Day360, values).unwrap();
        let tas = Variable::new("tas", &["time", "lat", "lon"], vec![3, 1, 1], vec![1.0f32; 3]).unwrap();
        let ds = Dataset::new(Some(time), vec![0.0], vec![0.0], vec![tas], attributes).unwrap();
        chunk_dataset(&ds, Some(8)).unwrap()
    }

    fn cmip5_attributes() -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("frequency".into(), "mon".into());
        attrs.insert("model_id".into(), "HadGEM2-ES".into());
        attrs.insert("experiment_id".into(), "rcp85".into());
        attrs.insert("realization".into(), 1.into());
        attrs.insert("initialization_method".into(), 1.into());
        attrs.insert("physics_version".into(), "1".into());
        attrs
    }

    #[test]
    fn test_simple_namer() {
        let chunks = chunks(Attributes::new());
        let namer = SimpleFileNamer::new();
        let names: Vec<String> = chunks.iter().map(|c| namer.file_name(c, "zarr")).collect();
        assert_eq!(names, vec!["output_001.zarr", "output_002.zarr"]);
    }

    #[test]
    fn test_standard_namer_cmip5() {
        let chunks = chunks(cmip5_attributes());
        let namer = StandardFileNamer;
        assert_eq!(
            namer.file_name(&chunks[0], "zarr"),
            "tas_mon_HadGEM2-ES_rcp85_r1i1p1_20051216-20060116.zarr"
        );
        assert_eq!(
            namer.file_name(&chunks[1], "nc"),
            "tas_mon_HadGEM2-ES_rcp85_r1i1p1_20301116-20301116.nc"
        );
    }

    #[test]
    fn test_standard_namer_without_metadata() {
        let chunks = chunks(Attributes::new());
        assert_eq!(
            StandardFileNamer.file_name(&chunks[0], "zarr"),
            "tas_20051216-20060116.zarr"
        );
    }

    #[test]
    fn test_namer_kind() {
        assert_eq!(FileNamerKind::parse("SIMPLE").unwrap(), FileNamerKind::Simple);
        assert_eq!(FileNamerKind::parse("standard").unwrap(), FileNamerKind::Standard);
        assert!(FileNamerKind::parse("fancy").unwrap_err().is_parameter_error());
    }
}
