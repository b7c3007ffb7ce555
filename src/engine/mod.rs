pub mod aggregator;
pub mod neighborhood;
pub mod weighting;

pub use aggregator::{NeighborFailurePolicy, RecommendationAggregator};
pub use neighborhood::NeighborhoodCollector;
