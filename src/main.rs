use k8s_crd_provider::{init_logging, serve_with_options, CrdProvider, ServeOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let options = ServeOptions::from_env()?;
    let provider = CrdProvider::with_all_resources();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        resources = ?provider.resource_types(),
        "Starting provider"
    );

    serve_with_options(provider, options).await
}
