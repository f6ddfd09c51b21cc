//! The subsetting entry point.
//!
//! ```text
//! SelectionRequest ─► map_params ─► ResolvedBounds ─► subset_bbox
//!                                                         │
//!                     Files / Memory ◄─ namer + writer ◄─ chunk_dataset
//! ```

use std::path::{Path, PathBuf};

use subset_common::{SubsetError, SubsetResult};
use tracing::{info, instrument};

use crate::chunking::{chunk_dataset, OutputChunk};
use crate::config::{current_config, parse_size, SubsetConfig};
use crate::dataset::Dataset;
use crate::namer::FileNamerKind;
use crate::params::{map_params, SelectionRequest};
use crate::subset::{subset_bbox, SubsetArgs};
use crate::writer::{open_dataset, NetCdfDatasetWriter, ZarrDatasetWriter};

/// Where the input data comes from.
#[derive(Debug, Clone)]
pub enum DatasetSource {
    /// A dataset already in memory.
    Memory(Dataset),
    /// The parts of a multi-file time series, in any order.
    MemoryParts(Vec<Dataset>),
    /// A Zarr directory.
    Path(PathBuf),
    /// Several Zarr directories forming one time series.
    Paths(Vec<PathBuf>),
}

impl DatasetSource {
    /// Materialize the source as one dataset.
    pub fn load(self) -> SubsetResult<Dataset> {
        match self {
            Self::Memory(ds) => Ok(ds),
            Self::MemoryParts(parts) => Dataset::concat_time(parts),
            Self::Path(path) => open_dataset(&path),
            Self::Paths(paths) => {
                let parts = paths
                    .iter()
                    .map(open_dataset)
                    .collect::<SubsetResult<Vec<_>>>()?;
                Dataset::concat_time(parts)
            }
        }
    }
}

impl From<Dataset> for DatasetSource {
    fn from(ds: Dataset) -> Self {
        Self::Memory(ds)
    }
}

impl From<Vec<Dataset>> for DatasetSource {
    fn from(parts: Vec<Dataset>) -> Self {
        Self::MemoryParts(parts)
    }
}

impl From<PathBuf> for DatasetSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for DatasetSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<PathBuf>> for DatasetSource {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self::Paths(paths)
    }
}

/// How subset chunks are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    /// Chunks are returned in memory.
    #[default]
    Memory,
    /// Each chunk is written to a Zarr directory.
    Zarr,
    /// Each chunk is written to a netCDF-4 file.
    NetCdf,
}

impl OutputType {
    /// Parse an output type selector: `xarray`/`memory`, `zarr` or `nc`.
    pub fn parse(s: &str) -> SubsetResult<Self> {
        match s.to_lowercase().as_str() {
            "xarray" | "memory" => Ok(Self::Memory),
            "zarr" => Ok(Self::Zarr),
            "nc" | "netcdf" => Ok(Self::NetCdf),
            other => Err(SubsetError::UnsupportedFormat(format!(
                "unknown output type '{}', expected 'xarray', 'zarr' or 'nc'",
                other
            ))),
        }
    }

    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Memory => None,
            Self::Zarr => Some("zarr"),
            Self::NetCdf => Some("nc"),
        }
    }
}

/// Options of one [`subset`] call.
#[derive(Debug, Clone, Default)]
pub struct SubsetParams {
    /// Time, area and level selectors.
    pub request: SelectionRequest,
    /// Directory for file output.
    pub output_dir: Option<PathBuf>,
    pub output_type: OutputType,
    pub file_namer: FileNamerKind,
    /// Size budget for this call, overriding `write.file_size_limit`.
    pub file_size_limit: Option<String>,
    /// Configuration for this call instead of the process-wide one.
    pub config: Option<SubsetConfig>,
}

impl SubsetParams {
    pub fn new(request: SelectionRequest) -> Self {
        Self {
            request,
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }

    pub fn with_file_namer(mut self, namer: FileNamerKind) -> Self {
        self.file_namer = namer;
        self
    }

    pub fn with_file_size_limit(mut self, limit: impl Into<String>) -> Self {
        self.file_size_limit = Some(limit.into());
        self
    }

    pub fn with_config(mut self, config: SubsetConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Result of a [`subset`] call.
#[derive(Debug, Clone)]
pub enum SubsetOutput {
    /// In-memory chunks, in chronological order.
    Memory(Vec<OutputChunk>),
    /// Written Zarr directories or netCDF files, in chronological order.
    Files(Vec<PathBuf>),
}

impl SubsetOutput {
    /// Number of chunks produced.
    pub fn len(&self) -> usize {
        match self {
            Self::Memory(chunks) => chunks.len(),
            Self::Files(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn chunks(&self) -> Option<&[OutputChunk]> {
        match self {
            Self::Memory(chunks) => Some(chunks),
            Self::Files(_) => None,
        }
    }

    pub fn paths(&self) -> Option<&[PathBuf]> {
        match self {
            Self::Files(paths) => Some(paths),
            Self::Memory(_) => None,
        }
    }
}

/// Subset a dataset and split the result into size-bounded chunks.
///
/// The configuration is read once at the start; all parameters are
/// validated before the dataset is loaded or touched.
#[instrument(skip(ds, params), fields(output_type = ?params.output_type, namer = ?params.file_namer))]
pub fn subset(ds: Option<DatasetSource>, params: &SubsetParams) -> SubsetResult<SubsetOutput> {
    let config = params.config.clone().unwrap_or_else(current_config);
    config.validate().map_err(SubsetError::ConfigError)?;

    let source = ds.ok_or_else(|| SubsetError::MissingParameter("ds".to_string()))?;

    let output_dir = match params.output_type {
        OutputType::Zarr | OutputType::NetCdf => Some(
            params
                .output_dir
                .clone()
                .ok_or_else(|| SubsetError::MissingParameter("output_dir".to_string()))?,
        ),
        _ => None,
    };

    let budget = match &params.file_size_limit {
        Some(limit) => parse_size(limit)
            .map_err(|e| SubsetError::invalid_parameter("file_size_limit", e.to_string()))?,
        None => config.write.file_size_limit_bytes()?,
    };

    let ds = source.load()?;
    let bounds = map_params(&ds, &params.request, config.selectors.policy)?;
    let args = SubsetArgs {
        fail_on_empty: config.selectors.fail_on_empty,
        ..bounds.to_subset_args()
    };
    let result = subset_bbox(&ds, &args)?;
    let chunks = chunk_dataset(&result, Some(budget))?;

    info!(
        chunks = chunks.len(),
        time_steps = result.time_len(),
        budget,
        "Subset complete"
    );

    let Some(dir) = output_dir else {
        return Ok(SubsetOutput::Memory(chunks));
    };
    let extension = params.output_type.extension().unwrap_or("zarr");
    let namer = params.file_namer.namer();
    let mut paths: Vec<PathBuf> = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let path = dir.join(namer.file_name(chunk, extension));
        if paths.contains(&path) {
            return Err(SubsetError::storage_error(format!(
                "two chunks map to the same file name {}",
                path.display()
            )));
        }
        paths.push(path);
    }

    match params.output_type {
        OutputType::NetCdf => {
            std::fs::create_dir_all(&dir)?;
            let writer = NetCdfDatasetWriter::new(config.write.clone());
            for (chunk, path) in chunks.iter().zip(&paths) {
                writer.write_to_path(&chunk.dataset, path)?;
            }
        }
        _ => {
            let writer = ZarrDatasetWriter::new(config.write.clone());
            for (chunk, path) in chunks.iter().zip(&paths) {
                writer.write_to_path(&chunk.dataset, path)?;
            }
        }
    }
    Ok(SubsetOutput::Files(paths))
}
