use thiserror::Error;

/// Reasons a point set cannot become a convex polygon fixture.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("polygon needs at least 3 distinct vertices, got {count}")]
    TooFewVertices { count: usize },
    #[error("polygon has {count} vertices, fixtures hold at most {max}")]
    TooManyVertices { count: usize, max: usize },
    #[error("polygon has no area")]
    Degenerate,
    #[error("polygon is not convex at vertex {index}")]
    NonConvex { index: usize },
}
