use anyhow::Context;
use clap::Args;

#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Modulus as a base-10 integer
    #[arg(long)]
    n: String,
    /// Public exponent
    #[arg(long, default_value_t = 65537)]
    e: u64,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// DER bytes as hex (with or without 0x)
    der: String,
}

pub(crate) fn parse_hex(s: &str) -> anyhow::Result<Vec<u8>> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).with_context(|| format!("invalid hex input: {}", s))
}

pub fn run_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let der = keyreg_core::encode(&args.n, args.e)?;
    println!("0x{}", hex::encode(der));
    Ok(())
}

pub fn run_decode(args: DecodeArgs) -> anyhow::Result<()> {
    let der = parse_hex(&args.der)?;
    let key = keyreg_core::decode(&der)?;
    println!("{}", serde_json::to_string_pretty(&key)?);
    Ok(())
}
