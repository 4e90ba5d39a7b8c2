use thiserror::Error;

/// Failures while building or querying a terrain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerrainError {
    #[error("Invalid resolution {cols}x{rows}: both must be at least 1")]
    InvalidResolution { cols: usize, rows: usize },
    #[error("Raster has no samples")]
    EmptyInput,
    #[error("Height scale must be finite and non-zero, got {0}")]
    InvalidScale(f32),
    #[error("World extent {width}x{height} must be finite and positive")]
    InvalidExtent { width: f32, height: f32 },
    #[error("Raster holds {actual} samples, expected {expected}")]
    RasterSizeMismatch { expected: usize, actual: usize },
    #[error("Sample {index} is not a finite height")]
    NonFiniteSample { index: usize },
    #[error("Resolution {cols}x{rows} exceeds the 32-bit index space")]
    TooLarge { cols: usize, rows: usize },
    #[error("Quad {quad} has collinear corners")]
    DegenerateTriangle { quad: usize },
    #[error("Rectangle {w}x{h} at ({x}, {z}) is empty or leaves the {cols}x{rows} grid")]
    InvalidRect {
        x: usize,
        z: usize,
        w: usize,
        h: usize,
        cols: usize,
        rows: usize,
    },
    #[error("Cell ({x}, {z}) is covered by more than one rectangle")]
    OverlappingRects { x: usize, z: usize },
    #[error("Cell ({x}, {z}) is not covered by any rectangle")]
    UncoveredCell { x: usize, z: usize },
    #[error("Color buffers need at least 3 channels, got {0}")]
    UnsupportedChannels(usize),
}
