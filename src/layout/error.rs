use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid floor plan JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("region \"{region}\" has invalid coordinates")]
    InvertedRegion { region: String },
    #[error("region \"{region}\" is out of bounds for {width}x{height} grid")]
    OutOfBounds {
        region: String,
        width: u32,
        height: u32,
    },
    #[error("floor grid {width}x{height} exceeds the {limit} cell limit")]
    TooLarge {
        width: u32,
        height: u32,
        limit: usize,
    },
    #[error("region \"{region}\" overlaps with \"{other}\" at ({x}, {y})")]
    Overlap {
        region: String,
        other: String,
        x: i32,
        y: i32,
    },
}
