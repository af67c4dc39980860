//! Stores a memory, searches for it, and builds prompt context from it.
//!
//! Expects a Ucotron server at `UCOTRON_SERVER_URL` (default
//! `http://localhost:8420`).
//!
//! Run with: `cargo run --example quickstart`

use ucotron::{AddMemoryOptions, Client, Error, Metadata, SearchOptions};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("ucotron=debug,quickstart=info")
        .init();

    let client = Client::from_env()?;
    let session = client.session()?;

    let health = session.health().await?;
    println!("Server {} is {} ({})", health.version, health.status, health.storage_mode);
    println!();

    println!("=== Add Memory ===");
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), "quickstart".into());
    let created = session
        .add_memory(
            "Juan moved to Madrid in 2021 and works at Acme.",
            Some(&AddMemoryOptions {
                metadata: Some(metadata),
                namespace: None,
            }),
        )
        .await?;
    println!("Chunks: {:?}", created.chunk_node_ids);
    println!("Entities: {:?}", created.entity_node_ids);
    println!("Ingestion took {}us", created.metrics.total_us);
    println!();

    println!("=== Search ===");
    let opts = SearchOptions {
        limit: Some(5),
        ..Default::default()
    };
    let found = session.search("Where does Juan live?", Some(&opts)).await?;
    for item in &found.results {
        println!("[{:.3}] {} ({})", item.score, item.content, item.node_type);
    }
    println!();

    println!("=== Augment ===");
    match session.augment("Tell me about Juan", None).await {
        Ok(context) => println!("{}", context.context_text),
        Err(e) if e.status().is_some() => eprintln!("Server rejected augment: {}", e),
        Err(e) => return Err(e),
    }

    Ok(())
}
