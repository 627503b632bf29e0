use std::collections::HashMap;
use std::sync::Arc;

use shardcache::registry::Registry;
use shardcache::{ClientPicker, Groups, MemoryRegistry, PickerConfig, Server};

/// Demo cluster: several cache nodes in one process sharing an in-process
/// registry, fronting a static score table.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut host = "127.0.0.1".to_string();
    let mut base_port: u16 = 8100;
    let mut node_count: usize = 3;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                host = args[i + 1].clone();
                i += 2;
            }
            "--base-port" => {
                base_port = args[i + 1].parse()?;
                i += 2;
            }
            "--nodes" => {
                node_count = args[i + 1].parse()?;
                i += 2;
            }
            "--help" => {
                eprintln!(
                    "Usage: {} [--host <ip>] [--base-port <port>] [--nodes <n>]",
                    args[0]
                );
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    let registry = MemoryRegistry::new();
    let db = Arc::new(HashMap::from([
        ("Tom".to_string(), "630".to_string()),
        ("Jack".to_string(), "589".to_string()),
        ("Sam".to_string(), "567".to_string()),
    ]));

    tracing::info!("starting {} cache nodes on {}", node_count, host);

    for n in 0..node_count {
        let addr = format!("{}:{}", host, base_port + n as u16);

        let groups = Groups::new();
        let scores = db.clone();
        let group = groups.create("scores", 2 << 10, move |key: String| {
            let scores = scores.clone();
            async move {
                tracing::info!(key = %key, "loading from the score table");
                scores
                    .get(&key)
                    .cloned()
                    .map(String::into_bytes)
                    .ok_or_else(|| anyhow::anyhow!("no record for {}", key))
            }
        })?;

        let picker = ClientPicker::start(
            &addr,
            registry.clone() as Arc<dyn Registry>,
            PickerConfig::default(),
        )
        .await?;
        group.register_picker(picker);

        let server = Server::new(&addr, groups)?;
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                tracing::error!("node exited: {}", e);
            }
        });
    }

    tracing::info!(
        "try: curl 'http://{}:{}/_cache/scores?key=Tom'",
        host,
        base_port
    );
    tracing::info!("press Ctrl+C to shut down");

    tokio::signal::ctrl_c().await?;
    Ok(())
}
