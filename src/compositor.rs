//! Brightness-to-alpha compositing.
//!
//! Every pixel gets an alpha derived from its brightness score
//! `max(R, G, B)` through a three-zone piecewise rule:
//!
//! | brightness              | alpha                                        |
//! |-------------------------|----------------------------------------------|
//! | `< low`                 | 0                                            |
//! | `low ..= high`          | `(brightness - low) / (high - low) * 255`    |
//! | `> high`                | 255                                          |
//!
//! Colour channels are never touched. Alpha depends only on brightness, so
//! the whole transform is captured by a 256-entry table built once per
//! [`Compositor`].

use image::{Rgba, RgbaImage};

use crate::error::Result;
use crate::thresholds::{MatteOptions, RampRounding, Thresholds};

/// Number of channels in an RGBA pixel.
const CHANNELS: usize = 4;

/// Index of the alpha channel within a pixel.
const ALPHA: usize = 3;

/// Brightness score of a pixel: the largest of its colour components.
///
/// Using the maximum lets saturated dark colours (e.g. pure dark blue)
/// contribute to opacity as much as grey of the same peak value.
#[must_use]
pub fn brightness(pixel: &Rgba<u8>) -> u8 {
    pixel[0].max(pixel[1]).max(pixel[2])
}

/// Applies the alpha ramp to RGBA rasters.
#[derive(Debug, Clone)]
pub struct Compositor {
    thresholds: Thresholds,
    rounding: RampRounding,
    table: [u8; 256],
}

impl Compositor {
    /// Build a compositor for a validated threshold pair.
    #[must_use]
    pub fn new(thresholds: Thresholds, rounding: RampRounding) -> Self {
        let mut table = [0u8; 256];
        for (value, slot) in (0..=u8::MAX).zip(table.iter_mut()) {
            *slot = ramp(value, thresholds, rounding);
        }
        Self {
            thresholds,
            rounding,
            table,
        }
    }

    /// Build a compositor from raw thresholds with nearest rounding.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfiguration`] if `low >= high`.
    pub fn with_thresholds(low: u8, high: u8) -> Result<Self> {
        Ok(Self::new(Thresholds::new(low, high)?, RampRounding::Nearest))
    }

    /// Build a compositor from job options.
    #[must_use]
    pub fn from_options(opts: &MatteOptions) -> Self {
        Self::new(opts.thresholds, opts.rounding)
    }

    /// Thresholds this compositor was built with.
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Rounding policy this compositor was built with.
    #[must_use]
    pub fn rounding(&self) -> RampRounding {
        self.rounding
    }

    /// Brightness → alpha lookup table.
    #[must_use]
    pub fn table(&self) -> &[u8; 256] {
        &self.table
    }

    /// Alpha for a given brightness score.
    #[must_use]
    pub fn alpha_for(&self, brightness: u8) -> u8 {
        self.table[usize::from(brightness)]
    }

    /// Replace the alpha channel of every pixel in place.
    pub fn apply(&self, image: &mut RgbaImage) {
        for px in image.pixels_mut() {
            px[ALPHA] = self.alpha_for(brightness(px));
        }
    }

    /// Consume a raster and return it with its alpha channel replaced.
    #[must_use]
    pub fn composite(&self, mut image: RgbaImage) -> RgbaImage {
        self.apply(&mut image);
        image
    }

    /// Row-parallel variant of [`Compositor::apply`] with identical output.
    #[cfg(feature = "cli")]
    pub fn apply_parallel(&self, image: &mut RgbaImage) {
        use rayon::prelude::*;

        let row_len = image.width() as usize * CHANNELS;
        if row_len == 0 {
            return;
        }
        image.par_chunks_mut(row_len).for_each(|row| {
            for px in row.chunks_exact_mut(CHANNELS) {
                px[ALPHA] = self.table[usize::from(px[0].max(px[1]).max(px[2]))];
            }
        });
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::from_options(&MatteOptions::default())
    }
}

/// Validate `low`/`high` and apply the ramp in place.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidConfiguration`] if `low >= high`; the
/// raster is left untouched in that case.
pub fn composite(image: &mut RgbaImage, low: u8, high: u8) -> Result<()> {
    Compositor::with_thresholds(low, high)?.apply(image);
    Ok(())
}

fn ramp(brightness: u8, thresholds: Thresholds, rounding: RampRounding) -> u8 {
    if brightness < thresholds.low() {
        0
    } else if brightness > thresholds.high() {
        u8::MAX
    } else {
        let offset = f32::from(brightness - thresholds.low());
        rounding.to_u8(offset / f32::from(thresholds.span()) * 255.0)
    }
}
