use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;

#[derive(Debug, Parser)]
#[command(name = "keyreg")]
#[command(about = "KeyReg operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encode an RSA public key `{n, e}` as PKCS#1 DER (hex).
    Encode(cmd::key::EncodeArgs),
    /// Decode PKCS#1 DER (hex) into its `{n, e}` JSON form.
    Decode(cmd::key::DecodeArgs),
    /// Look up a user's registered key on the configured registry.
    Lookup(cmd::lookup::LookupArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Encode(args) => cmd::key::run_encode(args)?,
        Command::Decode(args) => cmd::key::run_decode(args)?,
        Command::Lookup(args) => cmd::lookup::run(args).await?,
    }

    Ok(())
}
