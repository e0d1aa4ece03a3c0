pub mod aggregate;
pub mod area;
pub mod geometry;
pub mod insight;
pub mod page;
pub mod recommendation;
pub mod tile;
pub mod variables;

pub use aggregate::{AreaAggregate, DominantCrop, TileStatusCounts};
pub use area::{
    Area, AreaId, AreaResult, AreaStatus, AreaStatusView, AreaSummary, NewArea, SubmitArea,
    TileCommit,
};
pub use geometry::{count_distinct_vertices, Boundary, BoundingBox, Centroid};
pub use insight::{Bounds, HyperlocalPayload, InsightContext, InsightItem};
pub use page::{Page, PageRequest};
pub use recommendation::{rank_recommendations, Recommendation, MAX_RECOMMENDATIONS};
pub use tile::{Tile, TileFootprint, TileStatus};
pub use variables::{MetricPath, PathSegment, VariableBag, VariableCategory};
