//! feedsign - sign and check price feed updates
//!
//! Usage:
//!   feedsign sign <SYMBOL> <PRICE> [TIMESTAMP] [HEARTBEAT] [DATA]
//!   feedsign reset <SYMBOL>
//!   feedsign verify <SUBMISSION.json>
//!   feedsign key-info
//!   feedsign keygen
//!
//! Submissions are printed to stdout as JSON; logs go to stderr.

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use ethers::types::U256;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use feedsign::config::AppConfig;
use feedsign::feeds::FeedStore;
use feedsign::keystore::{derive_public_key, SigningKeyHandle};
use feedsign::ledger::{submit_submission, LocalLedger};
use feedsign::protocol::build_submission;
use feedsign::types::{PriceData, PriceObservation, QuorumSubmission};

const USAGE: &str = "usage: feedsign <sign SYMBOL PRICE [TIMESTAMP] [HEARTBEAT] [DATA] | reset SYMBOL | verify FILE | key-info | keygen>";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    info!("Config: {}", config);

    match command.as_str() {
        "sign" => {
            let observation = parse_observation(&args[1..])?;
            sign_and_print(&config, observation)
        }
        "reset" => {
            let symbol = args.get(1).context(USAGE)?;
            sign_and_print(&config, PriceObservation::reset(symbol.as_str()))
        }
        "verify" => {
            let path = args.get(1).context(USAGE)?;
            verify_file(&config, path).await
        }
        "key-info" => {
            let key = load_key(&config)?;
            println!(
                "{}",
                serde_json::json!({
                    "address": key.address(),
                    "public_key": format!("0x{}", hex::encode(derive_public_key(&key))),
                })
            );
            Ok(())
        }
        "keygen" => {
            let key = SigningKeyHandle::random();
            info!(address = %key.address(), "Generated signing key");
            println!("{}", key.export_hex().as_str());
            Ok(())
        }
        other => bail!("unknown command {:?}\n{}", other, USAGE),
    }
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_observation(args: &[String]) -> Result<PriceObservation> {
    let symbol = args.first().context(USAGE)?;
    let price_raw = args.get(1).context(USAGE)?;
    let price = U256::from_dec_str(price_raw)
        .map_err(|e| anyhow!("invalid price {}: {:?}", price_raw, e))?;

    let timestamp = match args.get(2) {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("invalid timestamp {}", raw))?,
        None => u32::try_from(Utc::now().timestamp()).context("clock outside u32 range")?,
    };
    let heartbeat = match args.get(3) {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("invalid heartbeat {}", raw))?,
        None => 0,
    };
    let data = match args.get(4) {
        Some(raw) => raw
            .parse::<u8>()
            .with_context(|| format!("invalid data byte {}", raw))?,
        None => 0,
    };

    Ok(PriceObservation::full(
        symbol.as_str(),
        PriceData {
            data,
            heartbeat,
            timestamp,
            price,
        },
    ))
}

fn load_key(config: &AppConfig) -> Result<SigningKeyHandle> {
    let store = config.key_store();
    store
        .load_signing_key(&config.signer.key_id)
        .with_context(|| format!("Failed to load signing key {}", config.signer.key_id))
}

fn sign_and_print(config: &AppConfig, observation: PriceObservation) -> Result<()> {
    let context = config.signing_context()?;
    let submission = {
        let key = load_key(config)?;
        build_submission(&context, &[observation.clone()], std::slice::from_ref(&key))
            .context("Failed to sign observation")?
    };

    info!(
        symbol = %observation.symbol,
        key = %observation.key(),
        payload = %observation.payload,
        "Signed observation"
    );
    println!("{}", serde_json::to_string_pretty(&submission)?);
    Ok(())
}

async fn verify_file(config: &AppConfig, path: &str) -> Result<()> {
    config.validate()?;
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;
    let submission: QuorumSubmission =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path))?;

    let store = FeedStore::new(
        config.signing_context()?,
        config.validator_bank()?,
        config.contract.required_signatures,
        config.contract.decimals,
    )
    .context("Failed to build feed store")?;
    let ledger = LocalLedger::new(store);

    match submit_submission(&ledger, &submission).await {
        Ok(()) => {
            info!(updates = submission.updates.len(), "Submission accepted");
            println!("accepted");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, kind = ?e.rejection_kind(), "Submission rejected");
            bail!("rejected: {}", e)
        }
    }
}
