//! Matte jobs: read, decode, composite, encode, write.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use tracing::{debug, info, instrument, warn};

use crate::compositor::Compositor;
use crate::error::{Error, Result};
use crate::store::{FsStore, RasterStore};
use crate::thresholds::MatteOptions;

/// Source and destination of a single matte job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    /// Image to read.
    pub source_path: PathBuf,
    /// Where to write the result.
    pub destination_path: PathBuf,
}

impl JobConfig {
    /// Create a job with explicit paths.
    pub fn new(source_path: impl Into<PathBuf>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
        }
    }

    /// Create a job writing next to the source, see [`default_output_path`].
    pub fn beside(source_path: impl Into<PathBuf>) -> Self {
        let source_path = source_path.into();
        let destination_path = default_output_path(&source_path);
        Self {
            source_path,
            destination_path,
        }
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSummary {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Format the result was encoded in.
    pub format: ImageFormat,
    /// Pixels that ended up fully transparent.
    pub transparent: u64,
    /// Pixels that ended up fully opaque.
    pub opaque: u64,
}

impl JobSummary {
    fn from_raster(raster: &RgbaImage, format: ImageFormat) -> Self {
        let (mut transparent, mut opaque) = (0u64, 0u64);
        for px in raster.pixels() {
            match px[3] {
                0 => transparent += 1,
                u8::MAX => opaque += 1,
                _ => {}
            }
        }
        Self {
            width: raster.width(),
            height: raster.height(),
            format,
            transparent,
            opaque,
        }
    }

    /// Pixels with an alpha strictly between 0 and 255.
    #[must_use]
    pub fn partial(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) - self.transparent - self.opaque
    }
}

/// Outcome of a job as reported at the outer boundary.
#[derive(Debug)]
pub struct ProcessResult {
    /// Source path of the job.
    pub path: PathBuf,
    /// Whether the job succeeded.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
    /// Job details when it succeeded.
    pub summary: Option<JobSummary>,
}

/// Runs matte jobs against a [`RasterStore`].
///
/// Create once and reuse for many images; the compositor's lookup table is
/// built at construction.
#[derive(Debug)]
pub struct MatteEngine<S = FsStore> {
    store: S,
    compositor: Compositor,
}

impl MatteEngine<FsStore> {
    /// Create an engine working on the local filesystem.
    #[must_use]
    pub fn new(opts: MatteOptions) -> Self {
        Self::with_store(FsStore, opts)
    }

    /// Process all supported images in a directory (non-recursive).
    ///
    /// Each image is written to `output_dir` under its original file name.
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    #[must_use]
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Vec<ProcessResult> {
        if same_directory(input_dir, output_dir) {
            warn!(dir = %input_dir.display(), "output directory is the input directory");
            return vec![ProcessResult {
                path: input_dir.to_path_buf(),
                success: false,
                message: "Output directory must differ from the input directory".to_string(),
                summary: None,
            }];
        }

        let jobs = match collect_jobs(input_dir, output_dir) {
            Ok(jobs) => jobs,
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    message: format!("Failed to read directory: {e}"),
                    summary: None,
                }];
            }
        };
        if jobs.is_empty() {
            warn!(dir = %input_dir.display(), "no supported images found");
        }

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            jobs.par_iter().map(|job| self.process_file(job)).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            jobs.iter().map(|job| self.process_file(job)).collect()
        }
    }
}

impl<S: RasterStore> MatteEngine<S> {
    /// Create an engine on top of an arbitrary store.
    pub fn with_store(store: S, opts: MatteOptions) -> Self {
        Self {
            store,
            compositor: Compositor::from_options(&opts),
        }
    }

    /// The compositor used for every job.
    #[must_use]
    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one job and return a typed result.
    ///
    /// The output format follows the destination's extension, or the
    /// source's format when the destination has none.
    ///
    /// # Errors
    ///
    /// Returns a decode-side error if the source is missing or not a
    /// recognised raster, [`Error::UnsupportedFormat`] if the output format
    /// cannot carry alpha, and an encode-side error if the result cannot be
    /// encoded or written.
    #[instrument(skip(self, job), fields(
        source = %job.source_path.display(),
        destination = %job.destination_path.display()
    ))]
    pub fn run(&self, job: &JobConfig) -> Result<JobSummary> {
        let bytes = self.store.read(&job.source_path)?;
        let source_format = image::guess_format(&bytes).map_err(Error::Decode)?;
        let format = output_format(&job.destination_path, source_format)?;

        let mut raster = decode(&bytes)?;
        debug!(
            width = raster.width(),
            height = raster.height(),
            ?source_format,
            "decoded source"
        );

        {
            let _span = tracing::debug_span!("composite").entered();
            self.composite(&mut raster);
        }

        let summary = JobSummary::from_raster(&raster, format);
        let encoded = encode(&raster, format)?;
        self.store.write(&job.destination_path, &encoded)?;

        info!(
            width = summary.width,
            height = summary.height,
            transparent = summary.transparent,
            partial = summary.partial(),
            opaque = summary.opaque,
            "matte written"
        );
        Ok(summary)
    }

    /// Run one job, turning any error into a failed [`ProcessResult`].
    #[must_use]
    pub fn process_file(&self, job: &JobConfig) -> ProcessResult {
        match self.run(job) {
            Ok(summary) => ProcessResult {
                path: job.source_path.clone(),
                success: true,
                message: format!(
                    "Successfully processed image ({}x{}) into {}",
                    summary.width,
                    summary.height,
                    job.destination_path.display()
                ),
                summary: Some(summary),
            },
            Err(e) => ProcessResult {
                path: job.source_path.clone(),
                success: false,
                message: e.to_string(),
                summary: None,
            },
        }
    }

    fn composite(&self, raster: &mut RgbaImage) {
        #[cfg(feature = "cli")]
        self.compositor.apply_parallel(raster);

        #[cfg(not(feature = "cli"))]
        self.compositor.apply(raster);
    }
}

/// Decode image bytes into an RGBA raster.
///
/// Sources without an alpha channel get a fully opaque one.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the bytes are not a recognised image.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)
        .map_err(Error::Decode)?
        .to_rgba8())
}

/// Encode an RGBA raster in a format that keeps its alpha channel.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for formats without alpha support and
/// [`Error::Encode`] if the encoder fails.
pub fn encode(raster: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>> {
    if !supports_alpha(format) {
        return Err(Error::UnsupportedFormat(format!(
            "{format:?} cannot store an alpha channel"
        )));
    }
    let mut buf = Cursor::new(Vec::new());
    raster.write_to(&mut buf, format).map_err(Error::Encode)?;
    Ok(buf.into_inner())
}

/// Whether `format` is one the engine writes.
#[must_use]
pub fn supports_alpha(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::Tiff | ImageFormat::WebP | ImageFormat::Bmp | ImageFormat::Tga
    )
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "png" | "tif" | "tiff" | "webp" | "bmp" | "tga"
        ),
        None => false,
    }
}

/// Generate a default output path from an input path.
///
/// Example: `"logo.png"` becomes `"logo_clean.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    match input.extension() {
        Some(ext) => parent.join(format!("{stem}_clean.{}", ext.to_string_lossy())),
        None => parent.join(format!("{stem}_clean")),
    }
}

fn output_format(destination: &Path, source_format: ImageFormat) -> Result<ImageFormat> {
    let format = if destination.extension().is_none() {
        source_format
    } else {
        ImageFormat::from_path(destination).map_err(|e| Error::UnsupportedFormat(e.to_string()))?
    };
    if !supports_alpha(format) {
        return Err(Error::UnsupportedFormat(format!(
            "{format:?} cannot store an alpha channel"
        )));
    }
    Ok(format)
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn collect_jobs(input_dir: &Path, output_dir: &Path) -> Result<Vec<JobConfig>> {
    let mut jobs = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() || !is_supported_image(&path) {
            continue;
        }
        if let Some(name) = path.file_name() {
            let destination_path = output_dir.join(name);
            jobs.push(JobConfig {
                source_path: path,
                destination_path,
            });
        }
    }
    jobs.sort_by(|a, b| a.source_path.cmp(&b.source_path));
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::thresholds::{RampRounding, Thresholds};
    use image::{Rgb, RgbImage, Rgba};

    fn png_bytes(raster: &RgbaImage) -> Vec<u8> {
        encode(raster, ImageFormat::Png).unwrap()
    }

    fn scenario() -> RgbaImage {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([5, 5, 5, 255]));
        img.put_pixel(1, 0, Rgba([25, 25, 25, 255]));
        img.put_pixel(2, 0, Rgba([50, 50, 50, 255]));
        img
    }

    #[test]
    fn run_through_memory_store() {
        let store = MemoryStore::new();
        store.insert("input.png", png_bytes(&scenario()));
        let engine = MatteEngine::with_store(store, MatteOptions::default());

        let summary = engine
            .run(&JobConfig::new("input.png", "output_clean.png"))
            .unwrap();
        assert_eq!((summary.width, summary.height), (3, 1));
        assert_eq!(summary.format, ImageFormat::Png);
        assert_eq!((summary.transparent, summary.partial(), summary.opaque), (1, 1, 1));

        let out = decode(&engine.store().get(Path::new("output_clean.png")).unwrap()).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [5, 5, 5, 0]);
        assert_eq!(out.get_pixel(1, 0).0, [25, 25, 25, 128]);
        assert_eq!(out.get_pixel(2, 0).0, [50, 50, 50, 255]);
    }

    #[test]
    fn truncating_engine_reproduces_integer_cast() {
        let store = MemoryStore::new();
        store.insert("in.png", png_bytes(&scenario()));
        let opts = MatteOptions {
            thresholds: Thresholds::default(),
            rounding: RampRounding::Truncate,
        };
        let engine = MatteEngine::with_store(store, opts);
        engine.run(&JobConfig::new("in.png", "out.png")).unwrap();

        let out = decode(&engine.store().get(Path::new("out.png")).unwrap()).unwrap();
        assert_eq!(out.get_pixel(1, 0)[3], 127);
    }

    #[test]
    fn rgb_source_gains_alpha_channel() {
        let rgb = RgbImage::from_pixel(2, 2, Rgb([200, 0, 0]));
        let mut buf = Cursor::new(Vec::new());
        rgb.write_to(&mut buf, ImageFormat::Png).unwrap();

        let raster = decode(buf.get_ref()).unwrap();
        assert!(raster.pixels().all(|px| px.0 == [200, 0, 0, 255]));
    }

    #[test]
    fn missing_source_is_a_decode_failure() {
        let engine = MatteEngine::with_store(MemoryStore::new(), MatteOptions::default());
        let err = engine.run(&JobConfig::new("input.png", "out.png")).unwrap_err();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn garbage_source_is_a_decode_failure() {
        let store = MemoryStore::new();
        store.insert("input.png", b"definitely not an image".to_vec());
        let engine = MatteEngine::with_store(store, MatteOptions::default());
        let err = engine.run(&JobConfig::new("input.png", "out.png")).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn jpeg_destination_is_rejected_before_writing() {
        let store = MemoryStore::new();
        store.insert("input.png", png_bytes(&scenario()));
        let engine = MatteEngine::with_store(store, MatteOptions::default());

        let err = engine.run(&JobConfig::new("input.png", "out.jpg")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(!engine.store().contains(Path::new("out.jpg")));
    }

    #[test]
    fn destination_without_extension_keeps_source_format() {
        let store = MemoryStore::new();
        store.insert("input.png", png_bytes(&scenario()));
        let engine = MatteEngine::with_store(store, MatteOptions::default());

        let summary = engine.run(&JobConfig::new("input.png", "result")).unwrap();
        assert_eq!(summary.format, ImageFormat::Png);
        let bytes = engine.store().get(Path::new("result")).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn process_file_reports_failures_as_messages() {
        let engine = MatteEngine::with_store(MemoryStore::new(), MatteOptions::default());
        let result = engine.process_file(&JobConfig::new("gone.png", "out.png"));
        assert!(!result.success);
        assert!(result.summary.is_none());
        assert!(result.message.contains("gone.png"));
    }

    #[test]
    fn default_output_path_appends_clean_suffix() {
        let p = default_output_path(Path::new("/tmp/logo.png"));
        assert_eq!(p, PathBuf::from("/tmp/logo_clean.png"));

        let p = default_output_path(Path::new("input.png"));
        assert_eq!(p.file_name().unwrap().to_str().unwrap(), "input_clean.png");

        let p = default_output_path(Path::new("raw"));
        assert_eq!(p.file_name().unwrap().to_str().unwrap(), "raw_clean");
    }

    #[test]
    fn is_supported_image_accepts_alpha_formats() {
        assert!(is_supported_image(Path::new("logo.png")));
        assert!(is_supported_image(Path::new("logo.PNG")));
        assert!(is_supported_image(Path::new("logo.tiff")));
        assert!(is_supported_image(Path::new("logo.webp")));
        assert!(is_supported_image(Path::new("logo.tga")));
    }

    #[test]
    fn is_supported_image_rejects_formats_without_alpha() {
        assert!(!is_supported_image(Path::new("photo.jpg")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("logo")));
    }

    #[test]
    fn encode_refuses_jpeg() {
        let err = encode(&scenario(), ImageFormat::Jpeg).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
