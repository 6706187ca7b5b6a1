use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use keyreg_api::config::Config;
use keyreg_registry::{ContractRegistry, KeyRegistry};

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Path to the gateway configuration file
    #[arg(long, default_value = "keyreg.toml", env = "KEYREG_CONFIG")]
    config: PathBuf,

    /// User identifier to look up
    user_id: String,
}

pub async fn run(args: LookupArgs) -> Result<()> {
    let config = Config::from_file(&args.config)?;

    let registry = ContractRegistry::connect(
        &config.network.rpc_url,
        config.contracts.key_registry,
        config.signer()?,
        Some(config.network.chain_id),
    )
    .await?;

    if !registry
        .is_user_registered(&args.user_id)
        .await
        .context("isUserRegistered call failed")?
    {
        println!("User {} is not registered", args.user_id);
        return Ok(());
    }

    let der = registry
        .get_public_key(&args.user_id)
        .await
        .context("getPublicKey call failed")?;
    let key = keyreg_core::decode(&der)
        .with_context(|| format!("stored key for {} is not valid DER", args.user_id))?;

    println!("registry: {}", registry.address());
    println!("userId: {}", args.user_id);
    println!("n: {}", key.n);
    println!("e: {}", key.e);
    println!("der: 0x{}", hex::encode(&der));

    Ok(())
}
