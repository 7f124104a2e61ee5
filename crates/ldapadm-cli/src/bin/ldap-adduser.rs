//! Creates a user entry in the directory.

use clap::Parser;
use ldapadm_cli::{build_client, fail, init_tracing};
use ldapadm_core::Result;
use ldapadm_directory::NewUser;
use secrecy::SecretString;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ldap-adduser", about = "Create a user entry in the directory")]
struct Args {
    /// Login for the new account.
    username: String,
    /// Initial cleartext password.
    password: String,
    /// Surname; also stored as the display and given name.
    surname: String,
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
    let user = NewUser::new(args.username, SecretString::from(args.password), args.surname);
    let dn = client.create_user(&user).await?;
    println!("User created: {dn}");
    Ok(())
}
