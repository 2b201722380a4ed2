// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reports a handled error, a detached task failure and a panic.
//!
//! ```text
//! FAULTLINE_PROJECT_ID=proj_demo \
//! FAULTLINE_API_ENDPOINT=http://localhost:3000 \
//! FAULTLINE_API_KEY=ft_demo \
//! cargo run -p faultline --example capture
//! ```

use std::time::Duration;

use faultline::{Exception, RequestMeta};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
#[error("payment provider rejected card ending {0}")]
struct PaymentDeclined(&'static str);

async fn charge_card() -> Result<(), PaymentDeclined> {
	Err(PaymentDeclined("4242"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let config = faultline_config::load_config_from_env()?;
	let agent = faultline::init(config)?;

	if let Err(e) = charge_card().await {
		let request = RequestMeta::new("POST", "/checkout").with_ip("203.0.113.9");
		let outcome = agent
			.report_fault(Exception::from_error(&e), true, Some(request))
			.await?;
		tracing::info!(?outcome, "handled error reported");
	}

	faultline::spawn_detached(async {
		tokio::time::sleep(Duration::from_millis(10)).await;
		Err::<(), _>(Exception::capture("CacheRefreshError", "redis connection reset"))
	})
	.await?;

	let crashed = std::thread::spawn(|| {
		let quantities: Vec<u32> = Vec::new();
		quantities[3]
	})
	.join();
	tracing::info!(crashed = crashed.is_err(), "worker thread finished");

	agent.flush(Duration::from_secs(5));
	agent.shutdown();
	Ok(())
}
