//! Raster input for terrain builds.
//!
//! A [`Raster`] is a rectangular grid of scalar intensity samples. It can be
//! produced from decoded image bytes, an image file on disk, or a plain-text
//! grid of numbers (one row per line).

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use super::TerrainError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot open file: {0}")]
    FileNotFound(String),
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },
    #[error("Row {row} has {actual} values, expected {expected}")]
    InconsistentRow {
        row: usize,
        actual: usize,
        expected: usize,
    },
    #[error("File is empty")]
    EmptyFile,
    #[error("Read failed: {0}")]
    Io(#[from] io::Error),
    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Row-major grid of raw intensity samples, indexed as `samples[z * width + x]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub samples: Vec<f32>,
}

impl Raster {
    /// Wrap an existing sample buffer.
    ///
    /// Fails with [`TerrainError::EmptyInput`] for a zero-sized raster and
    /// [`TerrainError::RasterSizeMismatch`] when `samples` does not hold
    /// exactly `width * height` values.
    pub fn new(width: usize, height: usize, samples: Vec<f32>) -> Result<Self, TerrainError> {
        if width == 0 || height == 0 || samples.is_empty() {
            return Err(TerrainError::EmptyInput);
        }
        let expected = width * height;
        if samples.len() != expected {
            return Err(TerrainError::RasterSizeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Build a raster from interleaved color bytes, averaging the first three
    /// channels of each pixel. `channels` is 3 for RGB and 4 for RGBA.
    pub fn from_color_bytes(
        width: usize,
        height: usize,
        bytes: &[u8],
        channels: usize,
    ) -> Result<Self, TerrainError> {
        if channels < 3 {
            return Err(TerrainError::UnsupportedChannels(channels));
        }
        let samples = bytes
            .chunks_exact(channels)
            .map(|px| (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0)
            .collect();
        Self::new(width, height, samples)
    }

    /// Sample at `(x, z)`; callers guarantee the coordinate is in range.
    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.samples[z * self.width + x]
    }

    /// Returns the minimum and maximum sample values.
    pub fn value_bounds(&self) -> (f32, f32) {
        self.samples
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

/// Load a raster from disk.
///
/// `.txt` files are parsed as text grids; anything else goes through the
/// image decoder.
pub fn load_raster<P: AsRef<Path>>(path: P) -> Result<Raster, LoadError> {
    let path = path.as_ref();

    if path.extension().and_then(|e| e.to_str()) == Some("txt") {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::FileNotFound(path.display().to_string()),
            _ => LoadError::Io(e),
        })?;
        return parse_grid_content(&content);
    }

    if !path.exists() {
        return Err(LoadError::FileNotFound(path.display().to_string()));
    }
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    Raster::from_color_bytes(width, height, rgb.as_raw(), 3).map_err(|_| LoadError::EmptyFile)
}

fn parse_value(s: &str, line: usize) -> Result<f32, LoadError> {
    s.parse().map_err(|_| LoadError::ParseError {
        line,
        message: format!("expected number, got '{}'", s),
    })
}

/// Parse a whitespace-separated text grid (useful for testing)
pub fn parse_grid_content(content: &str) -> Result<Raster, LoadError> {
    let mut samples: Vec<f32> = Vec::new();
    let mut expected_width: Option<usize> = None;
    let mut rows = 0;

    for (line_idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut count = 0;
        for value in line.split_whitespace() {
            samples.push(parse_value(value, line_idx + 1)?);
            count += 1;
        }

        // Check row width consistency
        if let Some(expected) = expected_width {
            if count != expected {
                return Err(LoadError::InconsistentRow {
                    row: line_idx + 1,
                    actual: count,
                    expected,
                });
            }
        } else {
            expected_width = Some(count);
        }
        rows += 1;
    }

    let width = expected_width.ok_or(LoadError::EmptyFile)?;
    Raster::new(width, rows, samples).map_err(|_| LoadError::EmptyFile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_simple_grid() {
        let content = "0 1 2\n3 4 5";
        let raster = parse_grid_content(content).unwrap();

        assert_eq!(raster.width, 3);
        assert_eq!(raster.height, 2);
        assert_eq!(raster.samples, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(raster.get(2, 1), 5.0);
    }

    #[test]
    fn test_parse_rejects_color_suffix() {
        let result = parse_grid_content("0 1\n2,0x0000FF 3");
        assert!(matches!(result, Err(LoadError::ParseError { line: 2, .. })));
    }

    #[test]
    fn test_parse_inconsistent_rows() {
        let content = "0 1 2\n3 4";
        let result = parse_grid_content(content);

        assert!(matches!(result, Err(LoadError::InconsistentRow { .. })));
    }

    #[test]
    fn test_parse_empty_file() {
        let result = parse_grid_content("\n  \n");
        assert!(matches!(result, Err(LoadError::EmptyFile)));
    }

    #[test]
    fn test_parse_bad_number() {
        let result = parse_grid_content("1 x 3");
        assert!(matches!(result, Err(LoadError::ParseError { line: 1, .. })));
    }

    #[test]
    fn test_raster_size_mismatch() {
        let result = Raster::new(2, 2, vec![1.0, 2.0, 3.0]);
        assert_eq!(
            result,
            Err(TerrainError::RasterSizeMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_raster_empty() {
        assert_eq!(Raster::new(0, 3, vec![]), Err(TerrainError::EmptyInput));
    }

    #[test]
    fn test_color_bytes_average_channels() {
        // Two RGBA pixels; alpha must not contribute
        let bytes = [30, 60, 90, 255, 0, 0, 255, 0];
        let raster = Raster::from_color_bytes(2, 1, &bytes, 4).unwrap();

        assert_eq!(raster.samples, vec![60.0, 85.0]);
    }

    #[test]
    fn test_color_bytes_need_three_channels() {
        let bytes = [10, 20, 30, 40];
        assert_eq!(
            Raster::from_color_bytes(2, 1, &bytes, 2),
            Err(TerrainError::UnsupportedChannels(2))
        );
        assert_eq!(
            Raster::from_color_bytes(4, 1, &bytes, 1),
            Err(TerrainError::UnsupportedChannels(1))
        );
    }

    #[test]
    fn test_value_bounds() {
        let raster = parse_grid_content("-5 0 5\n-10 0 10").unwrap();
        assert_eq!(raster.value_bounds(), (-10.0, 10.0));
    }

    #[test]
    fn test_load_text_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "1 2\n3 4").unwrap();

        let raster = load_raster(file.path()).unwrap();
        assert_eq!((raster.width, raster.height), (2, 2));
    }

    #[test]
    fn test_load_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("height.png");
        let img = image::RgbImage::from_fn(3, 2, |x, _| image::Rgb([x as u8 * 10; 3]));
        img.save(&path).unwrap();

        let raster = load_raster(&path).unwrap();
        assert_eq!((raster.width, raster.height), (3, 2));
        assert_eq!(raster.get(2, 1), 20.0);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_raster("/definitely/not/here.png");
        assert!(matches!(result, Err(LoadError::FileNotFound(_))));
        let result = load_raster("/definitely/not/here.txt");
        assert!(matches!(result, Err(LoadError::FileNotFound(_))));
    }

    #[test]
    fn test_unreadable_text_reports_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.txt");
        std::fs::create_dir(&path).unwrap();

        assert!(matches!(load_raster(&path), Err(LoadError::Io(_))));
    }
}
