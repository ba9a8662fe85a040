//! Turn image brightness into a graduated transparency mask.
//!
//! Each pixel's brightness score is the largest of its red, green and blue
//! components. Scores below a low threshold become fully transparent, scores
//! above a high threshold stay fully opaque, and the band in between ramps
//! linearly. Colour channels are left untouched, which makes the transform a
//! cheap way to lift a light logo off a dark, flat background.
//!
//! # Quick Start
//!
//! ```no_run
//! use alpha_threshold::Compositor;
//!
//! let compositor = Compositor::with_thresholds(10, 40).expect("valid thresholds");
//! let mut img = image::open("input.png").unwrap().to_rgba8();
//! compositor.apply(&mut img);
//! img.save("output_clean.png").unwrap();
//! ```
//!
//! # Jobs
//!
//! [`MatteEngine`] wraps decode, composite and encode around a
//! [`RasterStore`], with the filesystem as the default store.
//!
//! ```no_run
//! use alpha_threshold::{JobConfig, MatteEngine, MatteOptions};
//!
//! let engine = MatteEngine::new(MatteOptions::default());
//! let result = engine.process_file(&JobConfig::new("input.png", "output_clean.png"));
//! println!("{}", result.message);
//! ```

#![deny(missing_docs)]

pub mod compositor;
mod engine;
pub mod error;
#[cfg(feature = "cli")]
pub mod logger;
pub mod store;
pub mod thresholds;

pub use compositor::{brightness, composite, Compositor};
pub use engine::{
    decode, default_output_path, encode, is_supported_image, supports_alpha, JobConfig,
    JobSummary, MatteEngine, ProcessResult,
};
pub use error::{Error, Result};
pub use store::{FsStore, MemoryStore, RasterStore};
pub use thresholds::{MatteOptions, RampRounding, Thresholds, DEFAULT_HIGH, DEFAULT_LOW};
