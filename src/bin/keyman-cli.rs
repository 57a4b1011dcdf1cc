use clap::{Parser, Subcommand};
use keyman_sdk::{ClientError, KeyManClient};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "keyman-cli")]
#[command(about = "Command line client for the KeyMan key service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:9902")]
    url: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under a key
    Get { key: String },
    /// Print `key=value` for each of the given keys that exists
    GetMany {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Store a new key
    Create { key: String, value: String },
    /// Replace the value of an existing key
    Update { key: String, value: String },
    /// Remove a key
    Delete { key: String },
    /// List the routes the service answers
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .build()?;
    let client = KeyManClient::with_client(http, &cli.url);

    match run(&client, cli.command).await {
        Ok(()) => Ok(()),
        Err(ClientError::Rejected { status, message }) => {
            eprintln!("Error: {} returned {}: {}", client.base_url(), status, message);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(client: &KeyManClient, command: Commands) -> Result<(), ClientError> {
    match command {
        Commands::Get { key } => {
            println!("{}", client.get(&key).await?);
        }
        Commands::GetMany { keys } => {
            let pairs = client.get_many(&keys).await?;
            let mut found: Vec<_> = pairs.into_iter().collect();
            found.sort();
            for (key, value) in found {
                println!("{}={}", key, value);
            }
        }
        Commands::Create { key, value } => {
            client.create(&key, &value).await?;
            println!("created {}", key);
        }
        Commands::Update { key, value } => {
            client.update(&key, &value).await?;
            println!("updated {}", key);
        }
        Commands::Delete { key } => {
            client.delete(&key).await?;
            println!("deleted {}", key);
        }
        Commands::Routes => {
            for route in client.routes().await? {
                println!("{}", route);
            }
        }
    }
    Ok(())
}
