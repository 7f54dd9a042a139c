//! CLI binary for Open X-Embodiment preprocessing

mod cli;

use anyhow::Result;

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only records.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    cli::run()
}
