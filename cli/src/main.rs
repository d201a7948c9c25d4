//! Turns a street graph extract into a network for microsimulation, and checks the result.

#[macro_use]
extern crate log;

mod convert;

use anyhow::{Context, Result};
use structopt::StructOpt;

use convert_osm::ConversionConfig;

#[derive(StructOpt)]
#[structopt(name = "osm2sim", about = "Street graph to simulation network converter")]
enum Command {
    /// Converts a JSON extract into a network with lanes and signal plans
    Convert {
        /// The path to a JSON extract with nodes, ways, and restriction relations
        #[structopt(long)]
        input: String,
        /// A JSON file overriding some of the default configuration
        #[structopt(long)]
        config: Option<String>,
        /// The path to write the network
        #[structopt(long)]
        output: String,
        /// Also write everything unusual found along the way here
        #[structopt(long)]
        report: Option<String>,
        /// Fail on signalized junctions with more than 4 incoming links, instead of giving them a
        /// default plan
        #[structopt(long)]
        strict: bool,
    },
    /// Prints the default configuration as JSON, as a starting point for overrides
    DefaultConfig,
    /// Checks a network written by `convert` for consistency
    Validate {
        #[structopt()]
        network: String,
        /// The intergreen comes from here
        #[structopt(long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    let cmd = Command::from_args();

    // Keep stdout clean for piping the config somewhere
    if !matches!(cmd, Command::DefaultConfig) {
        abstutil::logger::setup();
    }

    match cmd {
        Command::Convert {
            input,
            config,
            output,
            report,
            strict,
        } => {
            let mut config = load_config(config)?;
            config.strict |= strict;
            convert::run(input, config, output, report)?
        }
        Command::DefaultConfig => {
            println!("{}", abstutil::to_json(&ConversionConfig::default()))
        }
        Command::Validate { network, config } => validate(network, load_config(config)?)?,
    }
    Ok(())
}

fn load_config(path: Option<String>) -> Result<ConversionConfig> {
    match path {
        Some(path) => ConversionConfig::load(&path),
        None => Ok(ConversionConfig::default()),
    }
}

fn validate(path: String, config: ConversionConfig) -> Result<()> {
    let network: map_model::Network = abstutil::read_json(&path)?;
    network
        .validate(config.signal_timings.intergreen())
        .with_context(|| format!("checking {}", path))?;
    info!("{} is consistent: {}", path, network.describe());
    Ok(())
}
