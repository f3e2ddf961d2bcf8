use clap::Parser;
use mcp_client::McpClient;

#[derive(Debug, Parser)]
struct Args {
    /// Gateway execute endpoint.
    #[arg(long, default_value = "http://localhost:8000/api/execute")]
    url: String,

    /// Module to call. Without it the available modules are listed.
    #[arg(long)]
    module: Option<String>,

    /// Parameters as a JSON object.
    #[arg(long, default_value = "{}")]
    params: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = McpClient::new(args.url)?;

    let Some(module) = args.module else {
        for m in client.modules().await? {
            println!("{}: {}", m.name, m.description);
        }
        return Ok(());
    };

    let raw: serde_json::Value = serde_json::from_str(&args.params)?;
    let params = mcp_gateway::params::validate(&raw)?;

    let resp = client.call(&module, params).await;
    if resp.success {
        println!(
            "Result: {}",
            resp.result.unwrap_or(serde_json::Value::Null)
        );
    } else {
        println!("Error: {}", resp.error.unwrap_or_default());
    }
    Ok(())
}
