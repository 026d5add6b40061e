use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskara=info")),
        )
        .init();

    match cli::run() {
        cli::RunOutcome::Serve(addr, config) => {
            tracing::info!("listening on http://{addr}");
            taskara::serve(addr, config).await;
        }
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    }
}
