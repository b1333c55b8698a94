mod data;
mod error;
mod model;
mod report;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use data::{load_domains, CharVocab};
use error::Error;
use model::{DgaNet, ModelArtifact, ModelConfig};
use report::ClassificationReport;

#[derive(Parser)]
#[command(name = "dgacaps", version, about = "Capsule-network DGA domain classifier")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a freshly initialized model artifact (and optionally the
    /// default character vocabulary)
    Init {
        /// Output path for the model artifact
        #[arg(long)]
        model: PathBuf,
        /// Seed for reproducible weight initialization
        #[arg(long)]
        seed: Option<u64>,
        /// Also write the default vocabulary to this path
        #[arg(long)]
        vocab: Option<PathBuf>,
    },
    /// Classify a CSV of domains (expects a `urls` column)
    Classify {
        /// Path to the model artifact
        #[arg(long)]
        model: PathBuf,
        /// Input CSV file
        #[arg(long)]
        input: PathBuf,
        /// Vocabulary file; the built-in default is used when omitted
        #[arg(long)]
        vocab: Option<PathBuf>,
        /// Write the report as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Process-scoped inference context, built once at startup and borrowed by
/// everything downstream.
struct AppContext {
    net: DgaNet,
    vocab: CharVocab,
}

impl AppContext {
    fn load(model: &PathBuf, vocab: Option<&PathBuf>) -> anyhow::Result<Self> {
        let net = ModelArtifact::load(model)
            .and_then(ModelArtifact::into_network)
            .with_context(|| format!("loading model from {}", model.display()))?;

        let vocab = match vocab {
            Some(path) => CharVocab::load(path)
                .with_context(|| format!("loading vocabulary from {}", path.display()))?,
            None => CharVocab::dga_default(),
        };

        if vocab.size() != net.config.vocab_size {
            return Err(Error::Input(format!(
                "vocabulary has {} symbols but the model expects {}",
                vocab.size(),
                net.config.vocab_size
            ))
            .into());
        }
        Ok(Self { net, vocab })
    }
}

fn classify(ctx: &AppContext, input: &PathBuf, output: Option<&PathBuf>) -> anyhow::Result<()> {
    let domains = load_domains(input)
        .with_context(|| format!("reading domains from {}", input.display()))?;
    info!(count = domains.len(), "classifying domains");

    let batch = ctx.vocab.encode_batch(&domains, ctx.net.config.seq_len);
    let labels = ctx.net.predict(&batch.view());

    let report = ClassificationReport::new(domains, labels);
    print!("{report}");

    if let Some(path) = output {
        report
            .write_json(path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Init { model, seed, vocab } => {
            let artifact = ModelArtifact::initialized(ModelConfig::default(), seed)?;
            artifact.save(&model)?;
            if let Some(path) = vocab {
                CharVocab::dga_default().save(&path)?;
                info!(path = %path.display(), "vocabulary written");
            }
            Ok(())
        }
        Command::Classify {
            model,
            input,
            vocab,
            output,
        } => {
            let ctx = AppContext::load(&model, vocab.as_ref())?;
            classify(&ctx, &input, output.as_ref())
        }
    }
}
