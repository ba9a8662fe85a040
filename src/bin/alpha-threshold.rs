use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::debug;

use alpha_threshold::{
    default_output_path, logger, JobConfig, MatteEngine, MatteOptions, ProcessResult,
    RampRounding, Thresholds, DEFAULT_HIGH, DEFAULT_LOW,
};

/// Source read when no input is given.
const DEFAULT_INPUT: &str = "input.png";

/// Destination written for [`DEFAULT_INPUT`] when no output is given.
const DEFAULT_OUTPUT: &str = "output_clean.png";

#[derive(Parser)]
#[command(
    name = "alpha-threshold",
    about = "Make dark backgrounds transparent by mapping brightness to alpha",
    version,
    after_help = "Simple usage: alpha-threshold <image>  (writes {name}_clean.{ext})\n\n\
                  Brightness is max(R, G, B). Below --low the pixel becomes transparent,\n\
                  above --high it stays opaque, and in between alpha ramps linearly."
)]
struct Cli {
    /// Input image file or directory
    #[arg(default_value = DEFAULT_INPUT)]
    input: String,

    /// Output file or directory (default: {name}_clean.{ext}, or output_clean.png for input.png)
    #[arg(short, long)]
    output: Option<String>,

    /// Brightness below which pixels become fully transparent (0-255)
    #[arg(long, default_value_t = i64::from(DEFAULT_LOW), allow_negative_numbers = true)]
    low: i64,

    /// Brightness above which pixels stay fully opaque (0-255)
    #[arg(long, default_value_t = i64::from(DEFAULT_HIGH), allow_negative_numbers = true)]
    high: i64,

    /// Truncate ramp values instead of rounding to nearest
    #[arg(long)]
    truncate: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    logger::init(if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    });

    let thresholds = match Thresholds::try_from((cli.low, cli.high)) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };

    let opts = MatteOptions {
        thresholds,
        rounding: if cli.truncate {
            RampRounding::Truncate
        } else {
            RampRounding::Nearest
        },
    };
    debug!(?opts, "configuration");

    let engine = MatteEngine::new(opts);

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        return;
    }

    let results = if input_path.is_dir() {
        let Some(output_dir) = &cli.output else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: alpha-threshold <input_dir> -o <output_dir>");
            return;
        };
        engine.process_directory(input_path, Path::new(output_dir))
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None if cli.input == DEFAULT_INPUT => PathBuf::from(DEFAULT_OUTPUT),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(&JobConfig::new(input_path, output_path))]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, cli.quiet);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }
}

fn print_result(result: &ProcessResult, quiet: bool) {
    if quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        eprintln!("[OK] {filename}: {}", result.message);
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }
}
