//! Group membership commands.

use std::io::{self, Write};

use console::style;
use hypothesis_client::HypothesisClient;

use crate::cli::icons::{dim_arrow, error, success};

pub async fn cmd_leave_groups(client: &HypothesisClient, yes: bool) -> anyhow::Result<()> {
    let groups: Vec<_> = client
        .list_groups()
        .await?
        .into_iter()
        .filter(|g| !g.is_public())
        .collect();

    if groups.is_empty() {
        eprintln!("{} Not a member of any private group", dim_arrow());
        return Ok(());
    }

    for group in &groups {
        eprintln!("  {} {} ({})", dim_arrow(), group.name, style(&group.id).dim());
    }
    if !yes && !confirm(&format!("Leave these {} group(s)?", groups.len()))? {
        return Ok(());
    }

    let mut failed = 0;
    for group in &groups {
        match client.leave_group(&group.id).await {
            Ok(()) => eprintln!("{} Left {}", success(), group.name),
            Err(e) => {
                failed += 1;
                eprintln!("{} Could not leave {}: {}", error(), group.name, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("Failed to leave {} of {} group(s)", failed, groups.len());
    }
    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    eprint!("{} [y/N] ", prompt);
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
