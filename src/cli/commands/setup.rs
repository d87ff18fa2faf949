use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::{ValidationSummary, get_formatter};
use crate::models::{Config, EmbeddingBackend, OutputFormat, StoreBackend};
use crate::services::{
    Pipeline, PipelineSettings, create_backend, create_embedder, load_reviews,
};

#[derive(Debug, Args)]
pub struct SetupArgs {
    #[arg(long, value_name = "PATH", help = "Reviews document (default: reviews.json)")]
    pub file: Option<PathBuf>,

    #[arg(long, short = 'n', help = "Namespace to upsert into")]
    pub namespace: Option<String>,

    #[arg(long, help = "Index name")]
    pub index: Option<String>,

    #[arg(long, help = "Embedding backend: gemini, vertex, or http")]
    pub embedding: Option<EmbeddingBackend>,

    #[arg(long, help = "Index backend: pinecone or qdrant")]
    pub store: Option<StoreBackend>,

    #[arg(long, help = "Assume the index exists and skip provisioning")]
    pub skip_provision: bool,

    #[arg(long, help = "Only load and validate the reviews document")]
    pub validate_only: bool,
}

impl SetupArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(ref file) = self.file {
            config.pipeline.reviews_file = file.clone();
        }
        if let Some(ref namespace) = self.namespace {
            config.index.namespace = namespace.clone();
        }
        if let Some(ref index) = self.index {
            config.index.name = index.clone();
        }
        if let Some(backend) = self.embedding {
            config.embedding.backend = backend;
        }
        if let Some(backend) = self.store {
            config.index.backend = backend;
        }
    }
}

pub async fn handle_setup(args: SetupArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let mut config = Config::load().context("failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;
    let formatter = get_formatter(format);

    if args.validate_only {
        let reviews = load_reviews(
            &config.pipeline.reviews_file,
            config.pipeline.allow_missing_reviews,
        )?;
        let with_text = reviews.iter().filter(|r| r.text().is_some()).count();
        let summary = ValidationSummary {
            file: config.pipeline.reviews_file.display().to_string(),
            reviews: reviews.len(),
            with_text,
            without_text: reviews.len() - with_text,
        };
        print!("{}", formatter.format_validation(&summary));
        return Ok(());
    }

    let embedder =
        create_embedder(&config.embedding).context("failed to configure embedding backend")?;
    let store = create_backend(&config.index).context("failed to configure index backend")?;

    let mut settings = PipelineSettings::from_config(&config);
    settings.skip_provision = args.skip_provision;

    let mut pipeline = Pipeline::new(embedder.as_ref(), store.as_ref(), settings);
    if format == OutputFormat::Text && !verbose && std::io::stderr().is_terminal() {
        pipeline = pipeline.with_progress(progress_bar());
    }

    let report = pipeline.run().await.map_err(|e| {
        let stage = e.stage();
        anyhow::Error::new(e).context(format!("setup failed after stage '{stage}'"))
    })?;

    print!("{}", formatter.format_run_report(&report));
    Ok(())
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
