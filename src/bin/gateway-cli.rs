use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the service gateway", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    /// Gateway base URL, used by `register`.
    #[arg(long, default_value = "http://localhost:8080")]
    gateway: String,

    #[arg(long, default_value = "discovery")]
    discovery_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List registered services and their status
    Services,
    /// Stop probing and routing to a service
    Pause { path: String },
    /// Return a paused service to health checking
    Resume { path: String },
    /// Remove a service from the registry
    Remove { path: String },
    /// Register a service through the discovery endpoint
    Register {
        #[arg(long)]
        host: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        health_check_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client.get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Services => {
            client.get(format!("{}/admin/services", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Pause { path } => {
            client.post(format!("{}/admin/services/{}/pause", cli.url, path))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Resume { path } => {
            client.post(format!("{}/admin/services/{}/resume", cli.url, path))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Remove { path } => {
            client.delete(format!("{}/admin/services/{}", cli.url, path))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Register { host, path, health_check_url } => {
            client.post(format!("{}/{}", cli.gateway, cli.discovery_path.trim_matches('/')))
                .json(&serde_json::json!({
                    "host": host,
                    "path": path,
                    "healthCheckURL": health_check_url,
                }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
