use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::core::source::JobSource;

mod download_station;
mod simulated;

pub use download_station::DownloadStationClient;
pub use simulated::{SimulatedSource, Simulator};

pub fn get_source(config: &AppConfig) -> Result<Arc<dyn JobSource>> {
    if config.simulation {
        let (source, controller) = SimulatedSource::new();

        std::thread::spawn(move || {
            println!("(Simulator) Use: 'set <id> <status>', 'rm <id>', 'fail-login on|off'");
            let stdin = std::io::stdin();
            for line in stdin.lines().map_while(Result::ok) {
                let parts: Vec<&str> = line.split_whitespace().collect();
                match parts.as_slice() {
                    ["set", id, status] => controller.set_job(id, status),
                    ["rm", id] => controller.remove_job(id),
                    ["fail-login", flag] => controller.reject_login(*flag == "on"),
                    _ => println!("(Simulator) Use: 'set <id> <status>', 'rm <id>', 'fail-login on|off'"),
                }
            }
        });

        return Ok(Arc::new(source));
    }

    let client = DownloadStationClient::from_config(&config.remote)
        .context("Failed to build Download Station HTTP client")?;
    Ok(Arc::new(client))
}
