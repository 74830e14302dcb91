//! Publish command: copy private annotations into the public group.

use console::style;
use hypothesis_client::{Annotation, HypothesisClient, Progress, SearchQuery, PUBLIC_GROUP};
use serde_json::{json, Value};

use crate::cli::icons::{dim_arrow, success, warn};
use crate::cli::progress::with_progress_bar;

pub async fn cmd_publish(
    client: &HypothesisClient,
    group: &str,
    uri: Option<&str>,
) -> anyhow::Result<()> {
    if !client.is_authenticated() {
        anyhow::bail!("Publishing requires an API token (--token or HYPOTHESIS_TOKEN)");
    }
    if group == PUBLIC_GROUP {
        anyhow::bail!("Annotations in {} are already public", PUBLIC_GROUP);
    }

    let mut query = SearchQuery::new().group(group);
    if let Some(uri) = uri {
        query = query.uri(uri);
    }
    let annotations = client.search_annotations(&query).await?;

    if annotations.is_empty() {
        eprintln!("{} No annotations found in group {}", warn(), group);
        return Ok(());
    }
    eprintln!(
        "{} Publishing {} annotation(s) from {}",
        dim_arrow(),
        annotations.len(),
        style(group).cyan()
    );

    let public: Vec<Annotation> = annotations.iter().map(to_public).collect();
    let progress = Progress::new();
    let created = with_progress_bar(
        &progress,
        "Publishing",
        client.create_annotations_with_progress(public, &progress),
    )
    .await??;

    eprintln!(
        "{} Published {} annotation(s) to the public group",
        success(),
        created.len()
    );
    Ok(())
}

/// Fresh copy of `annotation` targeted at the public group, readable by everyone.
fn to_public(annotation: &Annotation) -> Annotation {
    let mut copy = annotation.as_new();
    copy.group = Some(PUBLIC_GROUP.to_string());

    let read = json!([format!("group:{}", PUBLIC_GROUP)]);
    match copy.extra.get_mut("permissions") {
        Some(Value::Object(permissions)) => {
            permissions.insert("read".to_string(), read);
        }
        _ => {
            copy.extra
                .insert("permissions".to_string(), json!({ "read": read }));
        }
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_public_rewrites_group_and_read_permission() {
        let mut stored = Annotation::new("private1")
            .with_field("text", json!("note"))
            .with_field(
                "permissions",
                json!({"read": ["group:private1"], "update": ["acct:a@hypothes.is"]}),
            );
        stored.id = Some("abc".to_string());
        stored.user = Some("acct:a@hypothes.is".to_string());

        let public = to_public(&stored);
        assert_eq!(public.id, None);
        assert_eq!(public.group.as_deref(), Some(PUBLIC_GROUP));
        assert_eq!(
            public.field("permissions"),
            Some(&json!({"read": ["group:__world__"], "update": ["acct:a@hypothes.is"]}))
        );
        assert_eq!(public.field("text"), Some(&json!("note")));
    }

    #[test]
    fn test_to_public_adds_missing_permissions() {
        let public = to_public(&Annotation::new("private1"));
        assert_eq!(
            public.field("permissions"),
            Some(&json!({"read": ["group:__world__"]}))
        );
    }
}
