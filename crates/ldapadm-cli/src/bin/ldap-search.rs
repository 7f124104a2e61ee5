//! Searches users and organizational units.

use clap::{Parser, Subcommand};
use ldapadm_cli::{build_client, fail, init_tracing};
use ldapadm_core::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ldap-search", about = "Search users and organizational units")]
struct Args {
    /// Path to the settings document.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up a user by username and print its profile.
    #[command(name = "searchUser")]
    SearchUser {
        /// Login to look up.
        username: String,
    },
    /// List all groups, or the members of the named group.
    #[command(name = "searchOU")]
    SearchOu {
        /// Group name; when omitted, every group is listed.
        ouname: Option<String>,
    },
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
    match args.command {
        Command::SearchUser { username } => {
            let profile = client.find_user(&username).await?;
            println!("DN: {}", profile.dn);
            println!("CN: {}", profile.cn.unwrap_or_default());
            println!("DisPlayName: {}", profile.display_name.unwrap_or_default());
            println!("Email: {}", profile.mail.unwrap_or_default());
            println!("Titles:");
            for title in &profile.titles {
                println!("  - {title}");
            }
        }
        Command::SearchOu { ouname: Some(name) } => {
            let group = client.group_members(&name).await?;
            println!("Group: {}", group.name);
            for member in &group.members {
                println!("  Member: {member}");
            }
        }
        Command::SearchOu { ouname: None } => {
            for name in client.list_groups().await? {
                println!("OU: {name}");
            }
        }
    }
    Ok(())
}
