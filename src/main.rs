use std::env;

use pension_stress::api::{render_report, run_http_server};
use pension_stress::core::{SimulationConfig, run_stress_test};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = run_http_server(port).await {
                tracing::error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        None => {
            let config = SimulationConfig::default();
            let outcome = tokio::task::spawn_blocking(move || run_stress_test(&config)).await;
            match outcome {
                Ok(Ok(result)) => print!("{}", render_report(&result)),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "stress test failed");
                    std::process::exit(1);
                }
                Err(e) => {
                    tracing::error!(error = %e, "stress test task panicked");
                    std::process::exit(1);
                }
            }
        }
        Some(_) => {
            eprintln!("Usage: pension-stress [serve [port]]");
            std::process::exit(1);
        }
    }
}
