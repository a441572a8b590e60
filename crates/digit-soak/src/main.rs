//! # Digit Soak
//!
//! Hammers the forge from many threads at once and checks every image it
//! produces.
//!
//! ## Usage
//! ```bash
//! # 500 images across every built-in tier, all cores, decode each one
//! digit-soak --output /tmp/soak --count 500 --verify
//!
//! # Only the hardest tiers, fixed digits, purge anything older than 5 minutes afterwards
//! digit-soak --output /tmp/soak --tier expert --tier insane --digits 8675309 --cleanup-minutes 5
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rand::Rng;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use digit_forge::Forge;
use digit_forge::config::AppConfig;
use digit_forge::obfuscate::BUILTIN_TIERS;
use digits_common::DigitString;

/// Longest random digit string generated when `--digits` is not given
const MAX_RANDOM_LEN: usize = 6;

/// Mystery Digits soak tool
#[derive(Parser, Debug)]
#[command(name = "digit-soak")]
#[command(author, version, about = "Generate and verify obfuscated digit images in parallel", long_about = None)]
struct Args {
    /// Output directory for generated images
    #[arg(short, long)]
    output: PathBuf,

    /// Number of images to generate
    #[arg(short, long, default_value = "100")]
    count: usize,

    /// Number of threads (0 = auto-detect)
    #[arg(short, long, default_value = "0")]
    threads: usize,

    /// Tier to cycle through (repeatable; default: every built-in tier)
    #[arg(long = "tier")]
    tiers: Vec<String>,

    /// Fixed digit string (default: random, 1 to 6 digits)
    #[arg(short, long)]
    digits: Option<String>,

    /// Decode every image and check its dimensions
    #[arg(long)]
    verify: bool,

    /// Run retention with this age threshold once generation finishes
    #[arg(long)]
    cleanup_minutes: Option<u64>,

    /// Forge configuration file (recipes, canvas, fonts)
    #[arg(long, default_value = "config/digit-forge.toml")]
    config: String,
}

/// Counters for one soak run
#[derive(Debug, Default)]
struct Tally {
    generated: AtomicUsize,
    failed: AtomicUsize,
    verified: AtomicUsize,
    corrupt: AtomicUsize,
}

impl Tally {
    fn ok(&self) -> bool {
        self.failed.load(Ordering::Relaxed) == 0 && self.corrupt.load(Ordering::Relaxed) == 0
    }
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Execute a soak run; `Ok(false)` if any image failed
fn run(args: &Args) -> Result<bool> {
    let mut config = AppConfig::load(&args.config)?;
    config.artifact_dir = args.output.clone();
    let forge = Forge::from_config(&config).context("Failed to build forge")?;
    forge.store().ensure_dir().context("Failed to create output directory")?;

    let tiers = if args.tiers.is_empty() {
        BUILTIN_TIERS.iter().map(|t| t.to_string()).collect()
    } else {
        args.tiers.clone()
    };
    let fixed = args
        .digits
        .as_deref()
        .map(DigitString::new)
        .transpose()
        .context("Invalid --digits")?;

    let threads = if args.threads == 0 {
        num_cpus()
    } else {
        args.threads
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Failed to build thread pool")?;

    println!("🔢 Digit Soak");
    println!("=============");
    println!("Output: {}", args.output.display());
    println!("Images: {}", args.count);
    println!("Tiers: {}", tiers.join(", "));
    println!("Threads: {}", threads);
    println!();

    let pb = ProgressBar::new(args.count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {per_sec}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let tally = Tally::default();
    let start = Instant::now();
    let expected = (config.image.width, config.image.height);

    pool.install(|| {
        (0..args.count)
            .into_par_iter()
            .progress_with(pb.clone())
            .for_each(|i| {
                let tier = &tiers[i % tiers.len()];
                let mut rng = rand::rng();
                let digits = match &fixed {
                    Some(digits) => digits.clone(),
                    None => {
                        let len = rng.random_range(1..=MAX_RANDOM_LEN);
                        DigitString::random(&mut rng, len)
                    }
                };
                soak_one(&forge, &digits, tier, args.verify.then_some(expected), &tally);
            })
    });

    pb.finish_and_clear();
    report(&tally, start.elapsed(), args.verify);

    if let Some(minutes) = args.cleanup_minutes {
        let cleanup = forge.cleanup(minutes);
        println!(
            "🧹 Cleanup (> {} min): scanned {}, removed {}, failed {}",
            minutes, cleanup.scanned, cleanup.removed, cleanup.failed
        );
    }

    Ok(tally.ok())
}

/// Generate one image and optionally check it decodes at `expected` size
fn soak_one(
    forge: &Forge,
    digits: &DigitString,
    tier: &str,
    expected: Option<(u32, u32)>,
    tally: &Tally,
) {
    let artifact = match forge.generate_digits(digits, tier) {
        Ok(artifact) => artifact,
        Err(e) => {
            tracing::error!(digits = %digits, tier = %tier, error = %e, "Generation failed");
            tally.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    tally.generated.fetch_add(1, Ordering::Relaxed);

    let Some(expected) = expected else {
        return;
    };
    match verify(&forge.store().dir().join(&artifact.filename), expected) {
        Ok(()) => {
            tally.verified.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            tracing::error!(filename = %artifact.filename, error = %e, "Verification failed");
            tally.corrupt.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn verify(path: &Path, expected: (u32, u32)) -> Result<()> {
    let image = image::open(path).with_context(|| format!("cannot decode {}", path.display()))?;
    let actual = (image.width(), image.height());
    if actual != expected {
        anyhow::bail!("{}x{} instead of {}x{}", actual.0, actual.1, expected.0, expected.1);
    }
    Ok(())
}

fn report(tally: &Tally, elapsed: Duration, verified: bool) {
    let generated = tally.generated.load(Ordering::Relaxed);
    let rate = generated as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    if tally.ok() {
        println!("✅ Soak finished cleanly");
    } else {
        println!("❌ Soak finished with failures");
    }
    println!();
    println!("📊 Statistics:");
    println!("   Generated: {}", generated);
    println!("   Failed: {}", tally.failed.load(Ordering::Relaxed));
    if verified {
        println!("   Verified: {}", tally.verified.load(Ordering::Relaxed));
        println!("   Corrupt: {}", tally.corrupt.load(Ordering::Relaxed));
    }
    println!("   Time: {:.2?}", elapsed);
    println!("   Rate: {:.1} images/s", rate);
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(output: &Path) -> Args {
        Args {
            output: output.to_path_buf(),
            count: 12,
            threads: 3,
            tiers: Vec::new(),
            digits: None,
            verify: true,
            cleanup_minutes: None,
            config: "does/not/exist.toml".to_string(),
        }
    }

    #[test]
    fn test_cli_parses_repeated_tiers() {
        let args = Args::parse_from([
            "digit-soak", "--output", "/tmp/x", "--tier", "easy", "--tier", "insane", "--verify",
        ]);
        assert_eq!(args.tiers, vec!["easy", "insane"]);
        assert_eq!(args.count, 100);
        assert!(args.verify);
        assert!(args.cleanup_minutes.is_none());
    }

    #[test]
    fn test_soak_run_generates_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path());

        assert!(run(&args).unwrap());
        let pngs = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".png"))
            .count();
        assert!(pngs > 0 && pngs <= 12);
    }

    #[test]
    fn test_soak_rejects_bad_digits() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path());
        args.digits = Some("12x".to_string());
        assert!(run(&args).is_err());
    }

    #[test]
    fn test_verify_detects_wrong_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbImage::new(10, 5).save(&path).unwrap();

        assert!(verify(&path, (10, 5)).is_ok());
        assert!(verify(&path, (400, 200)).is_err());
        assert!(verify(&dir.path().join("missing.png"), (10, 5)).is_err());
    }

    #[test]
    fn test_tally_flags_failures() {
        let tally = Tally::default();
        assert!(tally.ok());
        tally.corrupt.fetch_add(1, Ordering::Relaxed);
        assert!(!tally.ok());
    }
}
