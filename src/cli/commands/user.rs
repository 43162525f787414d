//! Account command handlers

use crate::domain::Role;
use crate::state::SharedState;

use super::console_actor;

pub async fn cmd_user_create(
    state: &SharedState,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<()> {
    let role: Role = role.parse()?;
    let user = state.auth.create_user(name, email, password, role).await?;

    println!("✓ Created {} <{}> as {}", user.name, user.email, user.role);
    Ok(())
}

pub async fn cmd_user_promote(state: &SharedState, email: &str, role: &str) -> anyhow::Result<()> {
    let user = state.auth.promote(&console_actor(), email, role).await?;

    println!("✓ {} is now {}", user.email, user.role);
    Ok(())
}

pub async fn cmd_user_list(state: &SharedState) -> anyhow::Result<()> {
    let users = state.auth.list_users().await?;

    if users.is_empty() {
        println!("No accounts yet.");
        println!();
        println!("Create the first manager with:");
        println!("  labtrack user create --name <name> --email <email> --password <pw> --role manager");
        return Ok(());
    }

    println!("Accounts ({} total)", users.len());
    println!("{:-<70}", "");
    for user in users {
        println!(
            "{:<30} {:<25} {}",
            user.email,
            user.name,
            user.role
        );
    }

    Ok(())
}
