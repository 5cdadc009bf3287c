//! Configuration types for pipeline execution

use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};

/// Lane count used by `parallel()` when none is given
pub const DEFAULT_LANES: usize = 4;

/// How a pipeline is driven by its terminal operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One consumer, strictly ordered pulls
    #[default]
    Sequential,
    /// The stage chain fanned out across lanes over one shared source
    Parallel,
}

/// Fan-out configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    #[serde(default = "default_lanes")]
    pub lanes: usize,
}

fn default_lanes() -> usize {
    DEFAULT_LANES
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES,
        }
    }
}

impl ParallelConfig {
    pub fn with_lanes(lanes: usize) -> StreamResult<Self> {
        let config = Self { lanes };
        config.validate()?;
        Ok(config)
    }

    /// One lane per available CPU.
    pub fn from_cpus() -> Self {
        Self {
            lanes: num_cpus::get().max(1),
        }
    }

    pub fn validate(&self) -> StreamResult<()> {
        if self.lanes == 0 {
            return Err(StreamError::Build(
                "parallel execution needs at least one lane".to_string(),
            ));
        }
        Ok(())
    }
}

/// Execution settings carried by every pipeline definition
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub parallel: ParallelConfig,
}

impl ExecutionConfig {
    /// Number of lanes a drive under this configuration builds.
    pub fn lane_count(&self) -> usize {
        match self.mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel => self.parallel.lanes,
        }
    }
}
