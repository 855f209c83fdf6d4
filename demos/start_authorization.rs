//! Configures a broker against the default Xero endpoints and prints the URL a user must
//! visit to grant access.

// crates.io
use color_eyre::Result;
// self
use token_broker::{auth::InitMode, config::BrokerConfig, flows::ReqwestBroker};

fn main() -> Result<()> {
	color_eyre::install()?;

	let config = BrokerConfig::builder(
		"http://localhost:5001/code",
		["offline_access", "accounting.transactions", "accounting.settings.read"],
	)
	.build()?;
	let broker = ReqwestBroker::new(config, InitMode::FreshStart)?;

	broker.add_client_credentials(
		"ABCDEF0123456789ABCDEF0123456789",
		"abcdefghijklmnopqrstuvwxyz_-ABCDEFGHIJKLMNOPQRST",
		"6f9e2b1c-3d4a-4b5c-8d7e-0f1a2b3c4d5e",
	)?;

	let url = broker.auth_url()?;

	println!("Send your user to {url}.");
	println!("Broker phase: {:?}.", broker.phase());
	println!("Pass the returned `state` and `code` to Broker::exchange_code in the redirect handler.");

	Ok(())
}
