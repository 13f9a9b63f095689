//! Load test CLI for the photo keeper.

use clap::{Parser, Subcommand};
use keeper_common::RenderSize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "load-test")]
#[command(about = "Smoke and load testing tool for the photo keeper", long_about = None)]
struct Cli {
    /// Photo keeper UDP address
    #[arg(short, long, global = true, default_value = "127.0.0.1:4770")]
    server: SocketAddr,

    /// Seconds to wait for each reply
    #[arg(short, long, global = true, default_value = "10")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one render request and print the reply
    Request {
        /// Image id
        image_id: u64,

        /// Longer edge in pixels (0 for the original)
        #[arg(default_value = "0")]
        size: u32,

        /// Render instructions, one per line (use \n in the shell)
        #[arg(short, long, default_value = "")]
        instructions: String,
    },

    /// Drop every cached render of an image
    Clear {
        /// Image id
        image_id: u64,
    },

    /// Fire concurrent render requests and report latency
    Burst {
        /// Concurrent clients
        #[arg(short, long, default_value = "4")]
        concurrency: u32,

        /// Total requests
        #[arg(short, long, default_value = "100")]
        requests: u64,

        /// Image ids to pick from
        #[arg(long, value_delimiter = ',', default_value = "42")]
        ids: Vec<u64>,

        /// Sizes to pick from
        #[arg(long, value_delimiter = ',', default_value = "350,640,1024")]
        sizes: Vec<u32>,

        /// Render instructions for every request
        #[arg(long, default_value = "")]
        instructions: String,

        /// Seed for the request mix
        #[arg(long)]
        seed: Option<u64>,

        /// Output format: table (default), json
        #[arg(short, long, default_value = "table")]
        output: String,
    },

    /// Ask the server to shut down
    Shutdown,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Commands::Request {
            image_id,
            size,
            instructions,
        } => {
            let size = if size == 0 {
                RenderSize::Original
            } else {
                RenderSize::Edge(size)
            };
            let instructions = instructions.replace("\\n", "\n");
            let mut client = load_test::KeeperClient::connect(cli.server, timeout).await?;
            let (reply, latency) = client.request(image_id, size, &instructions).await?;
            println!("{} ({:.1} ms)", reply.body, latency.as_secs_f64() * 1000.0);
            Ok(())
        }
        Commands::Clear { image_id } => {
            let mut client = load_test::KeeperClient::connect(cli.server, timeout).await?;
            let (reply, _) = client.clear(image_id).await?;
            println!("{}", reply.body);
            Ok(())
        }
        Commands::Burst {
            concurrency,
            requests,
            ids,
            sizes,
            instructions,
            seed,
            output,
        } => {
            let config = load_test::BurstConfig {
                server: cli.server,
                concurrency,
                requests,
                image_ids: ids,
                sizes,
                instructions: instructions.replace("\\n", "\n"),
                timeout,
                seed,
            };

            println!("Starting burst against {}", config.server);
            println!("  Requests: {}", config.requests);
            println!("  Concurrency: {}", config.concurrency);
            println!();

            let results = load_test::BurstRunner::new(config).run().await?;

            match output.as_str() {
                "json" => println!("{}", load_test::ResultsReport::format_json(&results)?),
                _ => println!("{}", load_test::ResultsReport::format_table(&results)),
            }
            Ok(())
        }
        Commands::Shutdown => {
            let client = load_test::KeeperClient::connect(cli.server, timeout).await?;
            client.shutdown().await?;
            println!("Shutdown sent to {}", cli.server);
            Ok(())
        }
    }
}
