//! mcp-chat binary entry point.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use mcp_chat::cli::{is_quit_command, resolve_server, Cli};
use mcp_chat::config::ChatConfig;
use mcp_chat::conversation::{ChatEvent, ChatEventEnvelope, Orchestrator};
use mcp_chat::mcp::ServerTarget;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mcp_chat=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.apply(ChatConfig::load(cli.config.as_deref())?);
    let server = resolve_server(&config);

    let mut orchestrator =
        Orchestrator::from_config(&config)?.with_event_sink(Arc::new(print_event));
    orchestrator.connect(&ServerTarget::parse(&server)).await?;

    let result = match &cli.query {
        Some(query) => orchestrator
            .process_query(query)
            .await
            .map(|answer| println!("{answer}"))
            .map_err(Into::into),
        None => chat_loop(&mut orchestrator).await,
    };

    orchestrator.close().await;
    result
}

async fn chat_loop(orchestrator: &mut Orchestrator) -> Result<(), Box<dyn std::error::Error>> {
    println!("\nMCP Client Started!");
    println!("Type your queries or 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nQuery: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if is_quit_command(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        match orchestrator.process_query(&line).await {
            Ok(answer) => println!("\n{answer}"),
            Err(e) => println!("\nError: {e}"),
        }
    }
    Ok(())
}

fn print_event(envelope: ChatEventEnvelope) {
    if let ChatEvent::Connected { target, tools } = envelope.event {
        println!("Connected to MCP server at {target} with tools: {tools:?}");
    }
}
