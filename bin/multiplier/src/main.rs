//! Multiplication demo.
//!
//! Every tick, each generator draws a random number; the multiplier joins
//! one number from each generator and the sink prints the expression,
//! e.g. `3 * 4 * 5 = 60`. Enter a line (or press Ctrl-C) to stop.

mod config;

use crate::config::MultiplierConfig;
use rand::Rng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weft_core::Result;
use weft_engine::{Graph, GraphError, PeriodicTimer};
use weft_samples::{Generator, Multiplier, TextSink};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = MultiplierConfig::from_env()?;
    tracing::info!(
        inputs = config.inputs,
        interval_ms = config.interval_ms,
        "Loaded configuration"
    );

    let timer = PeriodicTimer::new(config.interval())?;
    let mut graph = build_graph(&config, &timer)?;
    graph.start()?;

    wait_for_shutdown().await;
    tracing::info!("Shutting down");
    graph.stop().await?;

    Ok(())
}

/// Wires `inputs` random generators `g1..gN` into multiplier `me1`, which
/// feeds the stdout sink `o1`.
fn build_graph(config: &MultiplierConfig, timer: &PeriodicTimer) -> Result<Graph, GraphError> {
    let mut graph = Graph::with_config(config.graph.clone());
    let (min, max) = (config.min_value, config.max_value);

    graph.add(Multiplier::<i64>::new(config.inputs), "me1")?;
    graph.add(TextSink::<String>::stdout(), "o1")?;
    graph.connect::<String>("me1", 0, "o1", 0)?;

    for port in 0..config.inputs {
        let name = format!("g{}", port + 1);
        let generator = Generator::new(timer.clone(), move || rand::thread_rng().gen_range(min..=max));
        graph.add(generator, name.as_str())?;
        graph.connect::<i64>(&name, 0, "me1", port)?;
    }

    graph.add_timer(timer.clone())?;
    Ok(graph)
}

/// Resolves on the first line from stdin, end of input, or Ctrl-C.
async fn wait_for_shutdown() {
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut line = String::new();

    tokio::select! {
        read = stdin.read_line(&mut line) => {
            if let Err(e) = read {
                tracing::warn!(error = %e, "Failed to read stdin");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            }
        }
    }
}
