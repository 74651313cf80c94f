//! PFT CLI - train templates and detect target regions

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pft_algorithms::classification::{KmeansParams, Template};
use pft_algorithms::contour::ContourParams;
use pft_algorithms::morphology::StructuringElement;
use pft_algorithms::pipeline::{DetectionParams, TrainedModel, Trainer, TrainingParams};
use pft_algorithms::region::{MatchCleanup, RegionParams};
use pft_core::io::{read_sample, write_json};
use pft_core::{ClassLabel, Sample};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pft")]
#[command(author, version, about = "Polarization feature template classification", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from labeled sample files
    Train {
        /// Sample files of the target class
        #[arg(short, long, num_args = 1.., required = true)]
        target: Vec<PathBuf>,
        /// Sample files of the non-target class
        #[arg(short, long, num_args = 1.., required = true)]
        non_target: Vec<PathBuf>,
        /// Output model file
        #[arg(short, long)]
        model: PathBuf,
        /// Number of clusters
        #[arg(short = 'k', long, default_value = "512")]
        clusters: usize,
        /// Mini-batch size (default: 10 x clusters)
        #[arg(short, long)]
        batch_size: Option<usize>,
        /// Use full-batch K-means instead of mini-batch
        #[arg(long)]
        full_batch: bool,
        /// Maximum K-means iterations / epochs
        #[arg(long, default_value = "100")]
        max_iterations: usize,
        /// Fraction of clusters retained as template candidates
        #[arg(short, long, default_value = "0.85")]
        retention: f64,
        /// Random seed for centroid initialization
        #[arg(short, long, default_value = "2023214566")]
        seed: u64,
        /// Write the training report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Detect target regions in sample files
    Detect {
        /// Model file written by `train`
        #[arg(short, long)]
        model: PathBuf,
        /// Sample files to classify
        #[arg(required = true)]
        samples: Vec<PathBuf>,
        /// Minimum matched fraction for a positive region
        #[arg(short, long, default_value = "0.3")]
        threshold: f64,
        /// Clean the matched mask (drop small objects, fill small holes) before voting
        #[arg(long)]
        cleanup: bool,
        /// Merge structuring element shape: square, cross, disk
        #[arg(long, default_value = "square")]
        merge_shape: String,
        /// Merge structuring element radius
        #[arg(long, default_value = "3")]
        merge_radius: usize,
        /// Contour band thickness in pixels
        #[arg(long, default_value = "4")]
        thickness: usize,
        /// Directory for per-sample detection JSON files
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print model and template diagnostics
    Inspect {
        /// Model file
        #[arg(short, long)]
        model: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress(len: usize, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb
}

/// Read sample files, skipping files whose content is malformed.
///
/// Each sample is returned with the index of its path in `paths`.
fn read_samples(paths: &[PathBuf], label: Option<ClassLabel>, pb: &ProgressBar) -> Result<Vec<(usize, Sample)>> {
    let mut samples = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        pb.inc(1);
        match read_sample(path) {
            Ok(sample) => samples.push((
                i,
                match label {
                    Some(label) => sample.with_label(label),
                    None => sample,
                },
            )),
            Err(e) if e.is_sample_local() => warn!("Skipped {}: {}", path.display(), e),
            Err(e) => return Err(e).with_context(|| format!("Failed to read sample {}", path.display())),
        }
    }
    Ok(samples)
}

fn load_model(path: &Path) -> Result<TrainedModel> {
    let pb = spinner("Loading model...");
    let model = TrainedModel::load_json(path).with_context(|| format!("Failed to load model {}", path.display()))?;
    pb.finish_and_clear();
    info!(
        "Model: {} clusters, {} features, template of {}",
        model.codebook().k(),
        model.dim(),
        model.template().len()
    );
    Ok(model)
}

fn parse_se(shape: &str, radius: usize) -> Result<StructuringElement> {
    let se = match shape.to_lowercase().as_str() {
        "square" | "sq" => StructuringElement::Square(radius),
        "cross" | "cr" => StructuringElement::Cross(radius),
        "disk" | "circle" => StructuringElement::Disk(radius),
        _ => anyhow::bail!("Unknown shape: {}. Use square, cross, or disk.", shape),
    };
    se.validate()
        .map_err(|e| anyhow::anyhow!("Invalid structuring element: {}", e))?;
    Ok(se)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sample".to_string())
}

/// One `k: countT/total = p` line per cluster, template members marked `*`
fn cluster_lines(template: &Template) -> Vec<String> {
    let counts = template.counts();
    (0..template.k())
        .map(|k| {
            let mark = if template.contains(k) { "*" } else { " " };
            match template.proportion(k) {
                Some(p) => format!("{} {}: {}/{} = {:.4}", mark, k, counts.target(k), counts.total(k), p),
                None => format!("{} {}: 0/0 (excluded)", mark, k),
            }
        })
        .collect()
}

fn print_template(model: &TrainedModel) {
    let template = model.template();

    println!("Clusters: {}", model.codebook().k());
    println!("Features: {}", model.dim());
    println!("Retention fraction: {}", template.retention_fraction());
    println!("Template ({} clusters, marked *): {:?}", template.len(), template.clusters());
    println!("Contrast: {:.4}", template.contrast());
    println!("Global target fraction: {:.4}", template.global_target_fraction());
    if !template.excluded().is_empty() {
        println!("Excluded (no members): {:?}", template.excluded());
    }
    if !model.normalizer().degenerate_features().is_empty() {
        println!("Degenerate features: {:?}", model.normalizer().degenerate_features());
    }
    if !model.statistics().degenerate_clusters().is_empty() {
        println!("Degenerate clusters: {:?}", model.statistics().degenerate_clusters());
    }
    println!();
    for line in cluster_lines(template) {
        println!("{}", line);
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Train {
            target,
            non_target,
            model,
            clusters,
            batch_size,
            full_batch,
            max_iterations,
            retention,
            seed,
            report,
        } => {
            let pb = progress(target.len() + non_target.len(), "Reading samples");
            let mut samples: Vec<Sample> = read_samples(&target, Some(ClassLabel::Target), &pb)?
                .into_iter()
                .map(|(_, s)| s)
                .collect();
            samples.extend(
                read_samples(&non_target, Some(ClassLabel::NonTarget), &pb)?
                    .into_iter()
                    .map(|(_, s)| s),
            );
            pb.finish_and_clear();

            let params = TrainingParams {
                kmeans: KmeansParams {
                    k: clusters,
                    max_iterations,
                    seed,
                    batch_size,
                    ..Default::default()
                },
                retention_fraction: retention,
                mini_batch: !full_batch,
            };

            let pb = spinner("Training...");
            let start = Instant::now();
            let (trained, training_report) = Trainer::new(params).train(&samples).context("Training failed")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            for skipped in &training_report.skipped {
                warn!("Skipped {}: {}", skipped.id, skipped.reason);
            }

            trained
                .save_json(&model)
                .with_context(|| format!("Failed to write model {}", model.display()))?;
            if let Some(path) = report {
                write_json(&training_report, &path)
                    .with_context(|| format!("Failed to write report {}", path.display()))?;
            }

            println!("Model saved to: {}", model.display());
            println!(
                "  {} vectors, {} iterations (converged: {})",
                training_report.vectors, training_report.iterations, training_report.converged
            );
            println!(
                "  Template: {} of {} clusters, contrast {:.4}",
                trained.template().len(),
                trained.codebook().k(),
                trained.template().contrast()
            );
            println!("  Processing time: {:.2?}", elapsed);
        }

        Commands::Detect {
            model,
            samples,
            threshold,
            cleanup,
            merge_shape,
            merge_radius,
            thickness,
            output,
        } => {
            let trained = load_model(&model)?;

            let params = DetectionParams {
                region: RegionParams {
                    decision_threshold: threshold,
                    cleanup: cleanup.then(MatchCleanup::default),
                    ..Default::default()
                },
                contour: ContourParams {
                    merge_element: parse_se(&merge_shape, merge_radius)?,
                    thickness,
                    ..Default::default()
                },
            };

            let pb = progress(samples.len(), "Reading samples");
            let (paths, inputs): (Vec<&Path>, Vec<Sample>) = read_samples(&samples, None, &pb)?
                .into_iter()
                .map(|(i, sample)| (samples[i].as_path(), sample))
                .unzip();
            pb.finish_and_clear();

            let pb = spinner("Detecting...");
            let start = Instant::now();
            let batch = trained
                .detect_batch(&inputs, &params)
                .context("Detection failed")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            if let Some(dir) = &output {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }

            for (index, detection) in &batch.detections {
                let path = paths[*index];
                let positive = detection.regions.iter().filter(|r| r.positive).count();
                println!(
                    "{} ({}): {} regions, {} positive, {} matched pixels, contour {} px",
                    path.display(),
                    detection.sample,
                    detection.regions.len(),
                    positive,
                    detection.matched_count(),
                    detection.contour.count_true()
                );

                if let Some(dir) = &output {
                    let out = dir.join(format!("{}.detection.json", file_stem(path)));
                    write_json(detection, &out)
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                }
            }
            for skipped in &batch.skipped {
                warn!("Skipped {}: {}", skipped.id, skipped.reason);
            }
            println!("  Processing time: {:.2?}", elapsed);
        }

        Commands::Inspect { model } => {
            let trained = load_model(&model)?;
            println!("File: {}", model.display());
            print_template(&trained);
        }
    }

    Ok(())
}
