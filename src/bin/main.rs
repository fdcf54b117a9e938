use clap::{Parser, Subcommand};
use finsight::{
    app::App,
    config::AppConfig,
    credentials::{CredentialStore, FileCredentialStore, GEMINI_API_KEY_SLOT},
    documents::{DocumentSource, PathDocumentSource},
    AnalysisOutcome, FeatureKind, PromptContext, Variant,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "finsight", about = "AI analysis of bank statements and payslips")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one statement or up to three payslips
    Analyze {
        /// statement | planning | payslip
        #[arg(long)]
        variant: Option<Variant>,
        /// Run a single feature; all features of the variant run otherwise
        #[arg(long)]
        feature: Option<FeatureKind>,
        #[arg(long)]
        goals: Option<String>,
        #[arg(long)]
        situation: Option<String>,
        /// PDF files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Store the Gemini API key
    SetKey { api_key: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;

    match cli.command {
        Command::SetKey { api_key } => {
            let store = FileCredentialStore::open(&config.credentials_path)?;
            store.set(GEMINI_API_KEY_SLOT, api_key.trim())?;
            println!("API key saved to {}", store.path().display());
            Ok(())
        }
        Command::Analyze {
            variant,
            feature,
            goals,
            situation,
            files,
        } => {
            if let Some(variant) = variant {
                config.variant = variant;
            }
            let variant = config.variant;
            let app = App::from_config(config)?;

            let picked = PathDocumentSource::new(files)
                .pick(variant.max_documents())
                .await?;

            let orchestrator = app.orchestrator;
            orchestrator.select_documents(picked).await?;
            if let Some(set) = orchestrator.current_document_set().await {
                info!(documents = ?set.names(), variant = %variant, "Starting analysis");
            }
            orchestrator
                .set_prompt_context(PromptContext { goals, situation })
                .await;

            let features: Vec<FeatureKind> = match feature {
                Some(feature) => vec![feature],
                None => variant.features().to_vec(),
            };

            let mut pending = Vec::with_capacity(features.len());
            for feature in features {
                pending.push(orchestrator.trigger(feature).await?);
            }
            for dispatch in pending {
                dispatch.wait().await;
            }

            let snapshot = orchestrator.snapshot().await;
            let mut failures = 0;

            println!("\n=== ANALYSIS RESULTS ===");
            for (feature, outcome) in &snapshot.outcomes {
                println!("\n## {}\n", feature);
                match outcome {
                    AnalysisOutcome::Succeeded(text) => println!("{}", text),
                    AnalysisOutcome::Failed(reason) => {
                        failures += 1;
                        println!("Error analyzing {}: {}", feature, reason.message);
                    }
                    AnalysisOutcome::Pending | AnalysisOutcome::Loading => {
                        println!("(not run)");
                    }
                }
            }

            if failures > 0 {
                eprintln!("\n{} analysis(es) failed", failures);
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
