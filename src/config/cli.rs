use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "people-search")]
#[command(about = "Search the web through an OAuth-protected search API and scrape record pages")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "people-search.toml", global = true)]
    pub config: PathBuf,

    #[arg(short, long, help = "Enable verbose output", global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines regardless of the config file
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the search form over HTTP
    Serve {
        /// Override server.bind from the config file
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one search and print the results
    Search {
        query: String,
    },
    /// Extract name/address records from a page
    Scrape {
        url: String,

        /// Write the extracted records to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Obtain (or refresh) the stored credential
    Auth,
}
