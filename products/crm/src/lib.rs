//! Deals pipeline: the stage guard, the deal store and pipeline statistics.

pub mod error;
pub mod stats;
pub mod status;
pub mod store;

pub use entity::deal::{Model as Deal, Status as DealStatus};
pub use error::{DealError, DealResult};
pub use stats::{PipelineStats, PipelineSummary, StageBreakdown};
pub use store::{DealDetail, DealFilter, DealInput, DealStore};
