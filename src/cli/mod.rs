//! Command-line interface: one-off training, serving and prediction

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use colored::*;

use crate::cloud::{LocalModelStorage, ModelStorage, MongoDocumentStore, S3ModelStorage};
use crate::components::DataSource;
use crate::config::PipelineConfig;
use crate::pipeline::{churn_status, ChurnClassifier, ChurnData, TrainingPipeline};
use crate::server::{serve, AppState, ServerConfig};

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}

fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}

fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, value: &str) {
    println!("  {:<18} {}", muted(key), value.white());
}

#[derive(Parser)]
#[command(name = "telco-churn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Telecom customer-churn training pipeline and prediction service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the training pipeline once
    Train {
        /// Keep model buckets in this directory instead of S3
        #[arg(long)]
        local_storage: Option<PathBuf>,

        /// Read the raw table from this CSV instead of MongoDB
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Start the prediction server
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Keep model buckets in this directory instead of S3
        #[arg(long)]
        local_storage: Option<PathBuf>,

        /// Source for `/train` runs instead of MongoDB
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Predict churn for one customer record (JSON file)
    Predict {
        #[arg(short, long)]
        record: PathBuf,

        /// Keep model buckets in this directory instead of S3
        #[arg(long)]
        local_storage: Option<PathBuf>,
    },
}

fn model_storage(local: Option<&Path>, settings: &PipelineConfig) -> anyhow::Result<Arc<dyn ModelStorage>> {
    Ok(match local {
        Some(dir) => Arc::new(LocalModelStorage::new(dir)),
        None => Arc::new(S3ModelStorage::from_env(&settings.aws_region)?),
    })
}

pub async fn cmd_train(local_storage: Option<&Path>, csv: Option<&Path>) -> anyhow::Result<()> {
    section("Train");
    let settings = PipelineConfig::default();
    let storage = model_storage(local_storage, &settings)?;
    let source = match csv {
        Some(path) => DataSource::CsvFile(path.to_path_buf()),
        None => DataSource::Collection(Arc::new(MongoDocumentStore::from_env().await?)),
    };

    let start = Instant::now();
    let pipeline = TrainingPipeline::new(settings, source, storage);
    kv("Run directory", &pipeline.run_config().artifact_dir.display().to_string());
    let run = pipeline.run_pipeline().await?;

    let metrics = run.trainer.metric_artifact;
    kv("Accuracy", &format!("{:.4}", metrics.accuracy));
    kv("F1", &format!("{:.4}", metrics.f1_score));
    kv("Precision", &format!("{:.4}", metrics.precision_score));
    kv("Recall", &format!("{:.4}", metrics.recall_score));
    kv("F1 change", &format!("{:+.4}", run.evaluation.changed_accuracy));
    match run.pusher {
        Some(pushed) => println!(
            "  {} pushed to {}/{}",
            ok("✓"),
            pushed.bucket_name,
            pushed.s3_model_path
        ),
        None => println!("  {}", "Deployed model kept".yellow()),
    }
    kv("Time", &format!("{:.1}s", start.elapsed().as_secs_f64()));
    println!();
    Ok(())
}

pub async fn cmd_serve(
    host: &str,
    port: u16,
    local_storage: Option<&Path>,
    csv: Option<&Path>,
) -> anyhow::Result<()> {
    section("Serve");
    kv("Web UI", &format!("http://{host}:{port}"));
    kv("Health", &format!("http://{host}:{port}/api/health"));
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    let settings = PipelineConfig::default();
    let storage = model_storage(local_storage, &settings)?;
    let config = ServerConfig {
        host: host.to_string(),
        port,
    };
    let mut state = AppState::new(config, settings, storage);
    if let Some(path) = csv {
        state = state.with_training_source(DataSource::CsvFile(path.to_path_buf()));
    }
    serve(Arc::new(state)).await
}

pub async fn cmd_predict(record: &Path, local_storage: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");
    let record: ChurnData = serde_json::from_str(&std::fs::read_to_string(record)?)?;
    let settings = PipelineConfig::default();
    let storage = model_storage(local_storage, &settings)?;

    let classifier = ChurnClassifier::new(storage, settings.model_bucket, settings.model_key);
    let prediction = classifier.predict_one(&record).await?;
    kv("Prediction", &format!("{prediction}"));
    println!("  {} {}", ok("›"), churn_status(prediction).bold());
    println!();
    Ok(())
}
