use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "eth-gas-window", version, about = "Ethereum gas price tracker with a 3 hour window")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the gas fee proxy server
    Serve {
        /// Override bind address, e.g. 0.0.0.0:3000
        #[arg(long)]
        addr: Option<String>,
    },
    /// Fetch once from the proxy, store the sample and print the chart
    Refresh {
        /// Override proxy base URL
        #[arg(long)]
        server: Option<String>,
    },
    /// Print the stored chart without fetching
    Show,
    /// Refresh on every Enter, expire stale data on a timer; `q` quits
    Monitor {
        /// Override proxy base URL
        #[arg(long)]
        server: Option<String>,
    },
}
