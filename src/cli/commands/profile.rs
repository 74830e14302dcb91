use hypothesis_client::HypothesisClient;

use crate::cli::icons::success;

pub async fn cmd_profile(client: &HypothesisClient) -> anyhow::Result<()> {
    let profile = client.get_user_profile().await?;
    match profile.userid {
        Some(ref userid) => eprintln!("{} Authenticated as {}", success(), userid),
        None => anyhow::bail!("The server did not recognize the token"),
    }
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}
