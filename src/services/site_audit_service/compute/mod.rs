pub mod normalize;
pub mod stats;

pub use normalize::normalize;
pub use stats::{compute_insights, compute_score_stats, recompute_aggregate, update_aggregate};
