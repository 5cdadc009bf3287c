//! fanout-stream - lazy, composable async pipelines
//!
//! A [`Pipeline`] chains filter/map/flat-map/distinct/peek/sorted stages over
//! a lazily pulled source and runs them when a terminal operation pulls.
//! Pipelines run sequentially by default; [`Pipeline::parallel`] fans the
//! whole chain out over several lanes sharing one source and emits elements
//! in completion order.

pub mod error;
pub mod functions;
pub mod source;
pub mod stage;
pub mod composition;
pub mod sequential;
pub mod parallel;
pub mod sort;
pub mod pipeline;
pub mod terminal;
pub mod collectors;
pub mod builder;
pub mod stream_configuration;

pub use builder::StreamBuilder;
pub use error::{StreamError, StreamResult};
pub use functions::{Accumulator, Comparator, Consumer, FlatMapper, Mapper, Predicate};
pub use pipeline::Pipeline;
pub use source::PullSequence;
pub use stage::{Stage, StageKind};
pub use stream_configuration::{ExecutionConfig, ExecutionMode, ParallelConfig, DEFAULT_LANES};
