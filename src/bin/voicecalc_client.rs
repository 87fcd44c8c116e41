//! Reference stream client: subscribes to a voice calculator service and
//! prints the calculator input it would receive.

use anyhow::Result;
use voicecalc::client::{CalculatorHost, LinkState, StreamConsumer};
use voicecalc::config::ClientConfig;
use voicecalc::protocol::StatusEvent;
use voicecalc::telemetry::init_stderr_tracing;

/// Mirrors a calculator display on stdout.
#[derive(Default)]
struct ConsoleHost {
    display: String,
}

impl ConsoleHost {
    fn show(&self, label: &str) {
        println!("{label:>10} | {}", self.display);
    }
}

impl CalculatorHost for ConsoleHost {
    fn apply_expression(&mut self, expression: &str) {
        self.display = expression.to_string();
        self.show("input");
    }

    fn calculate(&mut self) {
        self.show("calculate");
    }

    fn clear(&mut self) {
        self.display.clear();
        self.show("clear");
    }

    fn backspace(&mut self) {
        self.display.pop();
        self.show("backspace");
    }

    fn voice_stopped(&mut self) {
        println!("voice control stopped");
    }

    fn link_state_changed(&mut self, state: LinkState, detail: &str) {
        eprintln!("[{}] {detail}", state.as_str());
    }

    fn status(&mut self, status: &StatusEvent) {
        eprintln!("status: {}", status.message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::parse_args()?;
    init_stderr_tracing(config.log_level);

    let (mut consumer, stop) = StreamConsumer::new(config.client_settings());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    let mut host = ConsoleHost::default();
    let state = consumer.run(&mut host).await?;
    tracing::debug!(state = state.as_str(), "client finished");
    Ok(())
}
