use clap::Parser;

use octagon_relay::octagon::{OctagonClientConfig, OctagonRelayBuilderExt};
use octagon_relay::prelude::*;

/// Ask an Octagon agent a question and print the aggregated answer.
#[derive(Parser, Debug)]
#[command(name = "ask_agent")]
struct Args {
    /// Tool to call (octagon-agent, octagon-scraper-agent, octagon-deep-research-agent).
    #[arg(short, long, default_value = "octagon-agent")]
    tool: String,

    /// Do not append the SOURCES block.
    #[arg(long)]
    no_citations: bool,

    /// List available tools and exit.
    #[arg(long)]
    list: bool,

    /// Natural-language prompt.
    prompt: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), RelayError> {
    octagon_relay::init_observability();
    let args = Args::parse();

    if args.list {
        for tool in AgentTool::ALL {
            println!("- {}: {}", tool.name(), tool.description());
        }
        return Ok(());
    }

    let relay = Relay::builder()
        .octagon(OctagonClientConfig::from_env()?)?
        .aggregate_options(AggregateOptions::default().append_citations(!args.no_citations))
        .build()?;

    let response = relay
        .call_tool(&args.tool, PromptInput::new(args.prompt.join(" ")))
        .await;
    if response.is_error {
        eprintln!("{}", response.joined_text());
        std::process::exit(1);
    }
    println!("{}", response.joined_text());
    Ok(())
}
