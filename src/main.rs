//! ollama-fluent - CLI entry point

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use ollama_fluent::cli::{Args, Commands, Verbosity};
use ollama_fluent::models::{format_size, PullProgress};
use ollama_fluent::streaming::{ReaderSource, StreamDecoder};
use ollama_fluent::types::{ChatResponse, GenerateResponse};
use ollama_fluent::{ChatMessage, ClientConfig, OllamaClient, OllamaError};
use serde_json::Value;
use std::io::{self, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbosity());

    if let Err(err) = run(&args).await {
        report(&err);
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(args: &Args) -> Result<()> {
    if let Commands::Replay { file, chunk_size } = &args.command {
        return replay(file, *chunk_size);
    }

    let mut config = ClientConfig::load(args.config.clone())?;
    args.apply(&mut config);
    config.validate()?;

    if !args.command.needs_server() {
        return show_config(&config, args.verbosity());
    }

    let client = OllamaClient::new(config)?;
    dispatch(&client, &args.command, args.verbosity()).await
}

async fn dispatch(client: &OllamaClient, command: &Commands, verbosity: Verbosity) -> Result<()> {
    let model = client.config().model.clone();

    match command {
        Commands::Models => list_models(client).await?,
        Commands::Show => {
            let info = client.models().show(&model).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Pull => pull_model(client, &model, verbosity).await?,
        Commands::Copy { destination } => {
            client.models().copy(&model, destination).await?;
            println!("{} {} -> {}", "Copied".green(), model, destination);
        }
        Commands::Delete => {
            client.models().delete(&model).await?;
            println!("{} {}", "Deleted".green(), model);
        }
        Commands::Embed { prompt } => {
            let response = client.embeddings(&model, prompt).await?;
            println!("{}", serde_json::to_string(&response.embedding)?);
        }
        Commands::Ask {
            prompt,
            system,
            format,
            stream,
        } => {
            let mut request = client.generate_request(prompt.as_str());
            if let Some(system) = system {
                request = request.system(system.as_str());
            }
            if let Some(format) = format {
                request = request.format(format.clone());
            }

            if *stream {
                let chunks = client
                    .generate_stream(&request, |chunk| print_token(chunk.get("response")))
                    .await?;
                println!();
                print_summary(chunks.last(), verbosity);
            } else {
                let response = client.generate(&request).await?;
                println!("{}", response.response);
                print_generate_metrics(&response, verbosity);
            }
        }
        Commands::Chat {
            message,
            system,
            stream,
        } => {
            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(ChatMessage::system(system.as_str()));
            }
            messages.push(ChatMessage::user(message.as_str()));
            let request = client.chat_request(messages);

            if *stream {
                let chunks = client
                    .chat_stream(&request, |chunk| {
                        print_token(chunk.pointer("/message/content"))
                    })
                    .await?;
                println!();
                print_summary(chunks.last(), verbosity);
            } else {
                let response: ChatResponse = client.chat(&request).await?;
                if let Some(message) = response.message {
                    println!("{}", message.content);
                }
            }
        }
        Commands::Replay { .. } | Commands::Config => {
            bail!("'{}' does not use a server connection", command.name())
        }
    }

    Ok(())
}

async fn list_models(client: &OllamaClient) -> Result<()> {
    let models = client.models().list().await?;

    if models.is_empty() {
        println!("No models installed.");
        println!("\nPull a model with:");
        println!("  ollama-fluent pull -m llama2");
        return Ok(());
    }

    println!("Available models:");
    for model in models {
        println!(
            "  • {:<32} {:>10}  {}",
            model.name.bold(),
            format_size(model.size),
            model.description().dimmed()
        );
    }
    Ok(())
}

async fn pull_model(client: &OllamaClient, model: &str, verbosity: Verbosity) -> Result<()> {
    let pb = if verbosity.show_progress() {
        ProgressBar::new(0)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:30} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );

    let on_progress = |progress: &PullProgress| {
        pb.set_message(progress.status.clone());
        if let (Some(done), Some(total)) = (progress.completed, progress.total) {
            pb.set_length(total);
            pb.set_position(done);
        }
    };

    let result = client.models().pull_stream(model, on_progress).await;
    pb.finish_and_clear();

    let updates = result?;
    match updates.last() {
        Some(last) if last.is_success() => println!("{} {}", "Pulled".green(), model),
        Some(last) => println!("Pull ended with status: {}", last),
        None => println!("Pull returned no progress updates"),
    }
    Ok(())
}

/// Decode a recorded stream with the blocking decoder
fn replay(file: &Path, chunk_size: usize) -> Result<()> {
    let decoder = StreamDecoder::with_chunk_size(chunk_size);
    let print = |value: &Value| println!("{}", value);

    let objects = if file == Path::new("-") {
        let mut source = ReaderSource::new(io::stdin().lock());
        decoder.decode(&mut source, print)?
    } else {
        let handle = std::fs::File::open(file)
            .with_context(|| format!("Failed to open {}", file.display()))?;
        let mut source = ReaderSource::new(io::BufReader::new(handle));
        decoder.decode(&mut source, print)?
    };

    eprintln!("{} {} object(s)", "Decoded".green(), objects.len());
    Ok(())
}

fn show_config(config: &ClientConfig, verbosity: Verbosity) -> Result<()> {
    println!("Ollama:");
    println!("  URL:        {}", config.url);
    println!("  Model:      {}", config.model);
    println!(
        "  Keep alive: {}",
        config.keep_alive.as_deref().unwrap_or("server default")
    );
    println!("  Timeout:    {}s", config.timeout_secs);
    println!("  Verify SSL: {}", config.verify_ssl);
    println!("  Auth:       {:?}", config.auth.kind);
    if !config.headers.is_empty() {
        println!("  Headers:    {}", config.headers.keys().cloned().collect::<Vec<_>>().join(", "));
    }
    println!();

    if let Some(path) = ClientConfig::default_path() {
        println!("Config file:  {}", path.display());
    }
    println!("Verbosity:    {:?}", verbosity);
    Ok(())
}

fn print_token(token: Option<&Value>) {
    if let Some(text) = token.and_then(Value::as_str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }
}

fn print_summary(last: Option<&Value>, verbosity: Verbosity) {
    if let Some(final_chunk) = last.and_then(|v| serde_json::from_value(v.clone()).ok()) {
        print_generate_metrics(&final_chunk, verbosity);
    }
}

fn print_generate_metrics(response: &GenerateResponse, verbosity: Verbosity) {
    if !matches!(verbosity, Verbosity::Verbose | Verbosity::VeryVerbose | Verbosity::Trace) {
        return;
    }
    let metrics = &response.metrics;
    eprintln!(
        "{}",
        format!(
            "{} tokens in {}ms ({:.1} tok/s, load {}ms)",
            metrics.eval_count,
            metrics.total_duration_ms(),
            metrics.tokens_per_sec(),
            metrics.load_duration_ms()
        )
        .dimmed()
    );
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<OllamaError>() {
        Some(OllamaError::Decode(decode)) => {
            eprintln!("{} {}", "Error:".red().bold(), "stream ended mid-message");
            eprintln!("  undecodable fragment: {}", decode.remainder_lossy());
            eprintln!("  parser: {}", decode.reason());
            eprintln!("\nThe server connection may have been cut off while responding.");
        }
        Some(OllamaError::Http(_)) => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            eprintln!("\nIs Ollama running? Start with: ollama serve");
        }
        _ => eprintln!("{} {:#}", "Error:".red().bold(), err),
    }
}
