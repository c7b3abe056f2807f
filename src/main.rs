//! prompt-runner - CLI entry point.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use prompt_runner::llm::models;
use prompt_runner::{Config, PromptRequest, PromptRunner, Schema};

/// Run a prompt against an LLM and print a schema-validated JSON object.
#[derive(Parser, Debug)]
#[command(name = "prompt-runner")]
#[command(about = "Run a prompt against an LLM and print a schema-validated JSON object")]
#[command(version)]
struct Cli {
    /// Prompt text (read from stdin when omitted)
    prompt: Option<String>,

    /// Path to a JSON Schema file describing the expected output
    #[arg(short, long, required_unless_present = "list_models")]
    schema: Option<PathBuf>,

    /// System instructions sent alongside the prompt
    #[arg(long)]
    system: Option<String>,

    /// Model to use (overrides LLM_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// List supported models and exit
    #[arg(long)]
    list_models: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if cli.list_models {
        print_models();
        return Ok(());
    }

    // Step 1: Load configuration
    let config = Config::from_env_with_model(cli.model)
        .context("Missing configuration. Set LLM_MODEL and LLM_API_KEY.")?;

    // Step 2: Load schema
    let schema_path = cli.schema.context("--schema is required")?;
    let schema = Schema::from_path(&schema_path)
        .with_context(|| format!("Failed to load schema from {}", schema_path.display()))?;

    // Step 3: Read prompt
    let prompt = match cli.prompt {
        Some(prompt) => prompt,
        None => read_stdin().context("Failed to read prompt from stdin")?,
    };
    if prompt.trim().is_empty() {
        bail!("Prompt is empty");
    }

    let mut request = PromptRequest::new(prompt, schema);
    if let Some(system) = cli.system {
        request = request.with_system_prompt(system);
    }

    // Step 4: Run
    let runner = PromptRunner::new(config);
    let value = runner
        .run_prompt(&request)
        .await
        .with_context(|| format!("Prompt failed on model {}", runner.config().llm_model))?;

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Print the model registry.
fn print_models() {
    for entry in models() {
        let mode = if entry.supports_structured_output {
            "structured"
        } else {
            "text + self-correction"
        };
        println!("{:<40} {:<10} {}", entry.name, entry.family.as_str(), mode);
    }
}

fn read_stdin() -> std::io::Result<String> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}
