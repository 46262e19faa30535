use crate::error::{Result, TerrainError};

/// Bytes per pixel in the sample buffer. Only the first channel carries elevation.
pub const CHANNEL_STRIDE: usize = 4;

/// Read-only grid of 8-bit elevation samples scaled by `amplitude`.
///
/// Samples are laid out row-major, `CHANNEL_STRIDE` bytes per pixel, the way
/// an RGBA8 heightmap decodes.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    width: u32,
    height: u32,
    amplitude: f32,
    samples: Vec<u8>,
}

impl HeightField {
    pub fn new(width: u32, height: u32, amplitude: f32, samples: Vec<u8>) -> Result<Self> {
        let required = width as usize * height as usize * CHANNEL_STRIDE;
        if width == 0 || height == 0 || samples.len() < required {
            return Err(TerrainError::MalformedHeightField {
                width,
                height,
                len: samples.len(),
                required,
            });
        }
        Ok(Self {
            width,
            height,
            amplitude,
            samples,
        })
    }

    /// A field with every sample at zero elevation.
    pub fn flat(width: u32, height: u32, amplitude: f32) -> Result<Self> {
        let len = width as usize * height as usize * CHANNEL_STRIDE;
        Self::new(width, height, amplitude, vec![0; len])
    }

    /// Builds a field from one elevation byte per pixel, expanding each into
    /// a full RGBA sample.
    pub fn from_luma(width: u32, height: u32, amplitude: f32, luma: &[u8]) -> Result<Self> {
        let mut samples = Vec::with_capacity(luma.len() * CHANNEL_STRIDE);
        for &value in luma {
            samples.extend_from_slice(&[value, value, value, 255]);
        }
        Self::new(width, height, amplitude, samples)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Raw first-channel value, with coordinates clamped into the grid.
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        self.samples[(y * self.width as usize + x) * CHANNEL_STRIDE]
    }

    /// Nearest pixel for a normalized coordinate: `min(floor(u * width), width - 1)`.
    pub fn pixel_coords(&self, u: f32, v: f32) -> (u32, u32) {
        (
            nearest_index(u, self.width),
            nearest_index(v, self.height),
        )
    }

    /// Elevation of a single pixel in world units before any tile scaling.
    pub fn height_at_pixel(&self, x: u32, y: u32) -> f32 {
        self.pixel(x, y) as f32 / 255.0 * self.amplitude
    }

    /// Nearest-pixel elevation at normalized `(u, v)`.
    pub fn height_at(&self, u: f32, v: f32) -> f32 {
        let (x, y) = self.pixel_coords(u, v);
        self.height_at_pixel(x, y)
    }
}

fn nearest_index(t: f32, extent: u32) -> u32 {
    let scaled = (t * extent as f32).floor();
    if scaled <= 0.0 {
        return 0;
    }
    (scaled as u32).min(extent - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffers() {
        let err = HeightField::new(2, 2, 1.0, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            TerrainError::MalformedHeightField {
                len: 15,
                required: 16,
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(HeightField::flat(0, 4, 1.0).is_err());
        assert!(HeightField::flat(4, 0, 1.0).is_err());
    }

    #[test]
    fn clamps_out_of_range_lookups() {
        let field = HeightField::from_luma(2, 2, 10.0, &[0, 128, 255, 64]).unwrap();
        assert_eq!(field.pixel(5, 0), 128);
        assert_eq!(field.pixel(0, 9), 255);
        assert_eq!(field.pixel_coords(-0.5, 1.0), (0, 1));
        assert_eq!(field.pixel_coords(2.0, 0.49), (1, 0));
    }

    #[test]
    fn only_first_channel_is_read() {
        let samples = vec![51, 200, 200, 200];
        let field = HeightField::new(1, 1, 5.0, samples).unwrap();
        assert!((field.height_at(0.5, 0.5) - 1.0).abs() < 1e-6);
    }
}
