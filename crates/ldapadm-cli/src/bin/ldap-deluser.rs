//! Deletes a user entry looked up by username.

use clap::Parser;
use ldapadm_cli::{build_client, fail, init_tracing};
use ldapadm_core::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ldap-deluser", about = "Delete a user entry from the directory")]
struct Args {
    /// Login of the account to delete.
    username: String,
    /// Path to the settings document.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();
    if let Err(err) = run(args).await {
        fail(err);
    }
}

async fn run(args: Args) -> Result<()> {
    let client = build_client(&args.config)?;
    let dn = client.delete_user(&args.username).await?;
    println!("User deleted: {dn}");
    Ok(())
}
