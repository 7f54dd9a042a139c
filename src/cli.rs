use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use openx_preprocess::{DatasetReader, MalformedStepPolicy, PreprocessConfig, Preprocessor};

#[derive(Parser)]
#[command(name = "openx-preprocess")]
#[command(about = "Normalize Open X-Embodiment episodes into the unified arm-action schema", long_about = None)]
struct Cli {
    /// JSON config file (defaults apply to absent keys)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Root directory holding the datasets
    #[arg(long, global = true)]
    dataset_dir: Option<PathBuf>,
    /// Dataset name under the root directory
    #[arg(long, global = true)]
    dataset: Option<String>,
    /// What to do with malformed steps: abort or skip
    #[arg(long, global = true)]
    on_malformed: Option<MalformedStepPolicy>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the first transformed steps of the first episodes
    Inspect {
        /// Episodes to print
        #[arg(long)]
        episodes: Option<usize>,
        /// Steps to print per episode
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Transform episodes and write them as JSON lines
    Convert {
        /// Maximum number of episodes (all when omitted)
        #[arg(long)]
        episodes: Option<usize>,
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    fn load_config(&self) -> Result<PreprocessConfig> {
        let mut config = match &self.config {
            Some(path) => PreprocessConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => PreprocessConfig::default(),
        };
        if let Some(dir) = &self.dataset_dir {
            config.dataset_dir = dir.clone();
        }
        if let Some(name) = &self.dataset {
            config.dataset_name = name.clone();
        }
        if let Some(policy) = self.on_malformed {
            config.on_malformed = policy;
        }
        Ok(config)
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = cli.load_config()?;

    let preprocessor = Preprocessor::from_config(&config)?;
    let reader = DatasetReader::from_name(&config.dataset_name, &config.dataset_dir)
        .with_context(|| format!("failed to open dataset {}", config.dataset_name))?;
    info!(path = %reader.path().display(), policy = %config.on_malformed, "loaded dataset");

    match cli.command {
        Commands::Inspect { episodes, steps } => {
            if let Some(episodes) = episodes {
                config.inspect.episodes = episodes;
            }
            if let Some(steps) = steps {
                config.inspect.steps = steps;
            }
            let stdout = std::io::stdout();
            preprocessor.inspect(reader.episodes(), config.inspect, &mut stdout.lock())?;
        }
        Commands::Convert { episodes, output } => {
            let mut out: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path)
                        .with_context(|| format!("failed to create {}", path.display()))?,
                )),
                None => Box::new(std::io::stdout().lock()),
            };
            let summary = preprocessor.convert(reader.episodes(), episodes, &mut out)?;
            if let Some(path) = output {
                info!(?summary, path = %path.display(), "wrote episodes");
            }
        }
    }

    Ok(())
}
