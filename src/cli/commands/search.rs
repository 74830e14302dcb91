//! Search command.

use console::style;
use hypothesis_client::{
    Annotation, HypothesisClient, Progress, SearchQuery, SortField, SortOrder,
};

use crate::cli::icons::dim_arrow;
use crate::cli::progress::with_progress_bar;

/// Parsed `hyp search` arguments.
pub struct SearchArgs {
    pub group: Option<String>,
    pub uri: Option<String>,
    pub user: Option<String>,
    pub tags: Vec<String>,
    pub limit: Option<usize>,
    pub sequential: bool,
    pub sort: String,
    pub order: String,
    pub json: bool,
}

impl SearchArgs {
    fn to_query(&self) -> anyhow::Result<SearchQuery> {
        let order = SortOrder::parse(&self.order).ok_or_else(|| {
            anyhow::anyhow!("Invalid order '{}' (expected asc or desc)", self.order)
        })?;
        let sort = SortField::parse_or_default(Some(self.sort.as_str()));

        let mut query = SearchQuery::new().sorted_by(sort, order);
        if let Some(ref group) = self.group {
            query = query.group(group.as_str());
        }
        if let Some(ref uri) = self.uri {
            query = query.uri(uri.as_str());
        }
        if let Some(ref user) = self.user {
            query = query.user(user.as_str());
        }
        for tag in &self.tags {
            query = query.tag(tag.as_str());
        }
        if let Some(limit) = self.limit {
            query = query.with_limit(limit);
        }
        Ok(query)
    }
}

pub async fn cmd_search(client: &HypothesisClient, args: SearchArgs) -> anyhow::Result<()> {
    let query = args.to_query()?;

    let annotations = if args.sequential {
        let progress = Progress::new();
        with_progress_bar(
            &progress,
            "Searching",
            client.search_annotations_sequential_with_progress(&query, &progress),
        )
        .await??
    } else {
        client.search_annotations(&query).await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&annotations)?);
        return Ok(());
    }

    for annotation in &annotations {
        println!("{}", summary_line(annotation));
    }
    eprintln!(
        "{} {} annotation(s)",
        dim_arrow(),
        style(annotations.len()).bold()
    );
    Ok(())
}

/// One-line summary: id, last update, group and the start of the text.
fn summary_line(annotation: &Annotation) -> String {
    let text = annotation
        .field("text")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .replace('\n', " ");
    let text: String = text.chars().take(60).collect();

    format!(
        "{}  {}  {}  {}",
        annotation.id.as_deref().unwrap_or("-"),
        annotation.updated.as_deref().unwrap_or("-"),
        annotation.group.as_deref().unwrap_or("-"),
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SearchArgs {
        SearchArgs {
            group: Some("g1".to_string()),
            uri: None,
            user: None,
            tags: vec!["a".to_string()],
            limit: Some(50),
            sequential: false,
            sort: "created".to_string(),
            order: "asc".to_string(),
            json: false,
        }
    }

    #[test]
    fn test_args_to_query() {
        let query = args().to_query().unwrap();
        assert_eq!(query.filter_value("group"), Some("g1"));
        assert_eq!(query.filter_value("tag"), Some("a"));
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.sort, Some(SortField::Created));
        assert_eq!(query.order, Some(SortOrder::Asc));
    }

    #[test]
    fn test_unknown_sort_falls_back_to_updated() {
        let mut args = args();
        args.sort = "group".to_string();
        assert_eq!(args.to_query().unwrap().sort, Some(SortField::Updated));

        args.order = "sideways".to_string();
        assert!(args.to_query().is_err());
    }

    #[test]
    fn test_summary_line_truncates_text() {
        let mut annotation =
            Annotation::new("g1").with_field("text", serde_json::json!("x".repeat(100)));
        annotation.id = Some("abc".to_string());
        let line = summary_line(&annotation);
        assert!(line.starts_with("abc  -  g1  "));
        assert!(line.ends_with(&"x".repeat(60)));
    }
}
