//! Modifies user passwords, attributes, and group membership.

use clap::{Parser, Subcommand};
use ldapadm_cli::{build_client, fail, init_tracing};
use ldapadm_core::Result;
use secrecy::SecretString;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ldap-modify",
    about = "Modify user passwords, attributes, and group membership"
)]
struct Args {
    /// Path to the settings document.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace a user's password.
    #[command(name = "modify_user_pass")]
    ModifyUserPass {
        /// Login of the account.
        username: String,
        /// New cleartext password.
        new_password: String,
    },
    /// Add one or more values to a user attribute.
    ///
    /// Values for the `title` attribute are expanded into group-style
    /// distinguished names before being stored.
    #[command(name = "add_user_attr")]
    AddUserAttr {
        /// Login of the account.
        username: String,
        /// Attribute name.
        attribute: String,
        /// Values to append.
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Add a user to one or more groups.
    #[command(name = "add_user_group")]
    AddUserGroup {
        /// Login of the account.
        username: String,
        /// Group names.
        #[arg(required = true)]
        groups: Vec<String>,
    },
    /// Remove a user from a group.
    #[command(name = "del_user_from_groups")]
    DelUserFromGroups {
        /// Login of the account.
        username: String,
        /// Group name.
        group: String,
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
        Command::ModifyUserPass {
            username,
            new_password,
        } => {
            client
                .change_password(&username, &SecretString::from(new_password))
                .await?;
            println!("Password updated for user `{username}`");
        }
        Command::AddUserAttr {
            username,
            attribute,
            values,
        } => {
            client
                .add_user_attribute(&username, &attribute, &values)
                .await?;
            println!("Attribute `{attribute}` updated for user `{username}`");
        }
        Command::AddUserGroup { username, groups } => {
            client.add_user_to_groups(&username, &groups).await?;
            println!("User `{username}` added to: {}", groups.join(", "));
        }
        Command::DelUserFromGroups { username, group } => {
            client.remove_user_from_group(&username, &group).await?;
            println!("User `{username}` removed from group `{group}`");
        }
    }
    Ok(())
}
