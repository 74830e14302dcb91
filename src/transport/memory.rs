//! In-memory annotation store for single-process testing and offline work.
//!
//! Answers the same routes as the real API (search, annotation CRUD, groups,
//! profile) from a local store. Fault injection knobs reproduce the failure
//! modes the bulk engine has to survive: dropped connections, failing
//! searches, and creates that report success without persisting.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde_json::json;
use tokio::sync::Mutex;

use super::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::models::{
    compare_sort_values, Annotation, Group, SortField, SortOrder, PAGE_SIZE, PUBLIC_GROUP,
};

/// Page size used by the server when a search has no limit.
const DEFAULT_SEARCH_LIMIT: usize = 20;

/// First timestamp handed out by the store (2024-01-01T00:00:00Z).
const CLOCK_START: i64 = 1_704_067_200;

/// Transport backed by an in-process store.
#[derive(Debug)]
pub struct InMemoryTransport {
    userid: String,
    state: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    annotations: Vec<Annotation>,
    /// Groups the user is a member of.
    groups: Vec<Group>,
    next_id: u64,
    clock: i64,
    requests: Vec<HttpRequest>,
    fail_next: usize,
    fail_always: bool,
    fail_searches: bool,
    drop_next_creates: usize,
}

/// Routes understood by the store.
#[derive(Debug, PartialEq)]
enum Route {
    Search,
    Annotations,
    Annotation(String),
    Profile,
    Groups,
    Group(String),
    GroupMember(String, String),
    Unknown,
}

impl Route {
    fn parse(url: &str) -> Self {
        let segments: Vec<String> = match url::Url::parse(url) {
            Ok(parsed) => parsed
                .path_segments()
                .map(|s| {
                    s.filter(|seg| !seg.is_empty())
                        .map(|seg| {
                            urlencoding::decode(seg)
                                .map(|d| d.into_owned())
                                .unwrap_or_else(|_| seg.to_string())
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => return Route::Unknown,
        };

        let roots = ["search", "annotations", "profile", "groups"];
        let start = match segments.iter().position(|s| roots.contains(&s.as_str())) {
            Some(i) => i,
            None => return Route::Unknown,
        };
        let parts: Vec<&str> = segments[start..].iter().map(|s| s.as_str()).collect();

        match parts.as_slice() {
            ["search"] => Route::Search,
            ["annotations"] => Route::Annotations,
            ["annotations", id] => Route::Annotation(id.to_string()),
            ["profile"] => Route::Profile,
            ["groups"] => Route::Groups,
            ["groups", id] => Route::Group(id.to_string()),
            ["groups", id, "members", user] => Route::GroupMember(id.to_string(), user.to_string()),
            _ => Route::Unknown,
        }
    }
}

fn failure(status: StatusCode, reason: &str) -> HttpResponse {
    HttpResponse::json_body(status, &json!({"status": "failure", "reason": reason}))
}

fn ok_json<T: serde::Serialize>(value: &T) -> HttpResponse {
    match serde_json::to_value(value) {
        Ok(v) => HttpResponse::json_body(StatusCode::OK, &v),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

impl InMemoryTransport {
    /// Create an empty store acting on behalf of `userid`.
    pub fn new(userid: &str) -> Self {
        let public = Group {
            id: PUBLIC_GROUP.to_string(),
            name: "Public".to_string(),
            ..Default::default()
        };
        Self {
            userid: userid.to_string(),
            state: Mutex::new(StoreState {
                groups: vec![public],
                ..Default::default()
            }),
        }
    }

    /// Insert annotations directly, assigning ids and timestamps where missing.
    pub async fn seed(&self, annotations: Vec<Annotation>) {
        let mut state = self.state.lock().await;
        for annotation in annotations {
            let stored = state.stamp(annotation, &self.userid);
            state.annotations.push(stored);
        }
    }

    /// Insert `count` simple annotations into `group`.
    pub async fn seed_many(&self, count: usize, group: &str) {
        let annotations = (0..count)
            .map(|i| {
                Annotation::new(group)
                    .with_field("text", json!(format!("seed {}", i)))
                    .with_field("uri", json!("https://example.com/corpus"))
            })
            .collect();
        self.seed(annotations).await;
    }

    /// Fail the next `n` requests with a network error.
    pub async fn fail_next(&self, n: usize) {
        self.state.lock().await.fail_next = n;
    }

    /// Fail every request with a network error.
    pub async fn fail_always(&self, fail: bool) {
        self.state.lock().await.fail_always = fail;
    }

    /// Fail every search request with a network error.
    pub async fn fail_searches(&self, fail: bool) {
        self.state.lock().await.fail_searches = fail;
    }

    /// Acknowledge the next `n` creates without storing them.
    pub async fn drop_next_creates(&self, n: usize) {
        self.state.lock().await.drop_next_creates = n;
    }

    /// Every request received so far, in arrival order.
    pub async fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.lock().await.requests.len()
    }

    /// Requests received for the given route root (`search`, `annotations`, ...).
    pub async fn requests_for(&self, root: &str) -> Vec<HttpRequest> {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| {
                let route = Route::parse(&r.url);
                match root {
                    "search" => route == Route::Search,
                    "annotations" => {
                        matches!(route, Route::Annotations | Route::Annotation(_))
                    }
                    "groups" => matches!(
                        route,
                        Route::Groups | Route::Group(_) | Route::GroupMember(_, _)
                    ),
                    "profile" => route == Route::Profile,
                    _ => false,
                }
            })
            .cloned()
            .collect()
    }

    /// Snapshot of stored annotations.
    pub async fn annotations(&self) -> Vec<Annotation> {
        self.state.lock().await.annotations.clone()
    }

    pub async fn annotation_count(&self) -> usize {
        self.state.lock().await.annotations.len()
    }
}

impl StoreState {
    fn tick(&mut self) -> String {
        self.clock += 1;
        DateTime::<Utc>::from_timestamp(CLOCK_START + self.clock, 0)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Micros, false)
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:06}", prefix, self.next_id)
    }

    fn stamp(&mut self, mut annotation: Annotation, userid: &str) -> Annotation {
        if annotation.id.is_none() {
            annotation.id = Some(self.next_id("mem"));
        }
        if annotation.user.is_none() {
            annotation.user = Some(userid.to_string());
        }
        if annotation.group.is_none() {
            annotation.group = Some(PUBLIC_GROUP.to_string());
        }
        let now = self.tick();
        if annotation.created.is_none() {
            annotation.created = Some(now.clone());
        }
        if annotation.updated.is_none() {
            annotation.updated = Some(now);
        }
        annotation
    }

    fn handle(&mut self, request: &HttpRequest, userid: &str) -> HttpResponse {
        let authorized = request
            .header_value("authorization")
            .is_some_and(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len());
        let route = Route::parse(&request.url);

        let needs_auth = !matches!(
            (request.method.as_str(), &route),
            ("GET", Route::Search)
                | ("GET", Route::Annotation(_))
                | ("GET", Route::Groups)
                | ("GET", Route::Group(_))
                | ("GET", Route::Profile)
        );
        if needs_auth && !authorized {
            return failure(StatusCode::UNAUTHORIZED, "You need to be logged in");
        }

        match (request.method.as_str(), route) {
            ("GET", Route::Search) => self.search(request),
            ("POST", Route::Annotations) => self.create_annotation(request, userid),
            ("GET", Route::Annotation(id)) => match self.find(&id) {
                Some(annotation) => ok_json(annotation),
                None => failure(StatusCode::NOT_FOUND, "Annotation not found"),
            },
            ("PATCH", Route::Annotation(id)) => self.update_annotation(&id, request),
            ("DELETE", Route::Annotation(id)) => {
                let before = self.annotations.len();
                self.annotations
                    .retain(|a| a.id.as_deref() != Some(id.as_str()));
                if self.annotations.len() < before {
                    HttpResponse::json_body(StatusCode::OK, &json!({"id": id, "deleted": true}))
                } else {
                    failure(StatusCode::NOT_FOUND, "Annotation not found")
                }
            }
            ("GET", Route::Profile) => {
                let userid = authorized.then_some(userid);
                HttpResponse::json_body(StatusCode::OK, &json!({"userid": userid}))
            }
            ("GET", Route::Groups) => ok_json(&self.groups),
            ("POST", Route::Groups) => self.create_group(request),
            ("GET", Route::Group(id)) => match self.groups.iter().find(|g| g.id == id) {
                Some(group) => ok_json(group),
                None => failure(StatusCode::NOT_FOUND, "Group not found"),
            },
            ("PATCH", Route::Group(id)) => self.update_group(&id, request),
            ("DELETE", Route::GroupMember(id, user)) => {
                if user != "me" {
                    return failure(StatusCode::BAD_REQUEST, "Only 'me' can be removed");
                }
                let before = self.groups.len();
                self.groups.retain(|g| g.id != id);
                if self.groups.len() < before {
                    HttpResponse::new(StatusCode::NO_CONTENT, "")
                } else {
                    failure(StatusCode::NOT_FOUND, "Group not found")
                }
            }
            _ => failure(StatusCode::NOT_FOUND, "No such route"),
        }
    }

    fn find(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id.as_deref() == Some(id))
    }

    fn search(&self, request: &HttpRequest) -> HttpResponse {
        let limit = request
            .query_value("limit")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .min(PAGE_SIZE);
        let offset = request
            .query_value("offset")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let sort = SortField::parse_or_default(request.query_value("sort"));
        let order = request
            .query_value("order")
            .and_then(SortOrder::parse)
            .unwrap_or_default();

        let mut matching: Vec<&Annotation> = self
            .annotations
            .iter()
            .filter(|a| matches_filters(a, &request.query))
            .collect();

        matching.sort_by(|a, b| {
            let ord = compare_sort_values(a.sort_value(sort), b.sort_value(sort));
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        if let Some(cursor) = request.query_value("search_after") {
            let wanted = match order {
                SortOrder::Asc => Ordering::Greater,
                SortOrder::Desc => Ordering::Less,
            };
            matching.retain(|a| compare_sort_values(a.sort_value(sort), Some(cursor)) == wanted);
        }

        let total = matching.len();
        let rows: Vec<&Annotation> = matching.into_iter().skip(offset).take(limit).collect();
        ok_json(&json!({"total": total, "rows": rows}))
    }

    fn create_annotation(&mut self, request: &HttpRequest, userid: &str) -> HttpResponse {
        let payload: Annotation = match request.body.clone().map(serde_json::from_value) {
            Some(Ok(annotation)) => annotation,
            _ => return failure(StatusCode::BAD_REQUEST, "Invalid annotation payload"),
        };

        let mut annotation = payload;
        annotation.id = None;
        annotation.user = None;
        annotation.created = None;
        annotation.updated = None;
        let stored = self.stamp(annotation, userid);

        if self.drop_next_creates > 0 {
            self.drop_next_creates -= 1;
        } else {
            self.annotations.push(stored.clone());
        }
        ok_json(&stored)
    }

    fn update_annotation(&mut self, id: &str, request: &HttpRequest) -> HttpResponse {
        let changes: Annotation = match request.body.clone().map(serde_json::from_value) {
            Some(Ok(annotation)) => annotation,
            _ => return failure(StatusCode::BAD_REQUEST, "Invalid annotation payload"),
        };
        let now = self.tick();

        match self
            .annotations
            .iter_mut()
            .find(|a| a.id.as_deref() == Some(id))
        {
            Some(stored) => {
                if changes.group.is_some() {
                    stored.group = changes.group;
                }
                stored.extra.extend(changes.extra);
                stored.updated = Some(now);
                ok_json(&*stored)
            }
            None => failure(StatusCode::NOT_FOUND, "Annotation not found"),
        }
    }

    fn create_group(&mut self, request: &HttpRequest) -> HttpResponse {
        let name = request
            .body
            .as_ref()
            .and_then(|b| b.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or_default()
            .to_string();
        if name.trim().is_empty() {
            return failure(StatusCode::BAD_REQUEST, "A group must have a name");
        }
        let description = request
            .body
            .as_ref()
            .and_then(|b| b.get("description"))
            .and_then(|d| d.as_str())
            .map(str::to_string);

        let group = Group {
            id: self.next_id("grp"),
            name,
            description,
            ..Default::default()
        };
        self.groups.push(group.clone());
        ok_json(&group)
    }

    fn update_group(&mut self, id: &str, request: &HttpRequest) -> HttpResponse {
        let body = request.body.clone().unwrap_or_default();
        match self.groups.iter_mut().find(|g| g.id == id) {
            Some(group) => {
                if let Some(name) = body.get("name").and_then(|n| n.as_str()) {
                    group.name = name.to_string();
                }
                if let Some(description) = body.get("description").and_then(|d| d.as_str()) {
                    group.description = Some(description.to_string());
                }
                ok_json(&*group)
            }
            None => failure(StatusCode::NOT_FOUND, "Group not found"),
        }
    }
}

fn matches_filters(annotation: &Annotation, params: &[(String, String)]) -> bool {
    params.iter().all(|(key, value)| match key.as_str() {
        "group" => annotation.group.as_deref() == Some(value.as_str()),
        "user" => annotation.user.as_deref() == Some(value.as_str()),
        "uri" | "url" => annotation.field("uri").and_then(|u| u.as_str()) == Some(value.as_str()),
        "tag" | "tags" => annotation
            .field("tags")
            .and_then(|t| t.as_array())
            .is_some_and(|tags| tags.iter().any(|t| t.as_str() == Some(value.as_str()))),
        _ => true,
    })
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.lock().await;
        state.requests.push(request.clone());

        if state.fail_always {
            return Err(TransportError::Request("connection refused".to_string()));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(TransportError::Request("connection reset".to_string()));
        }
        if state.fail_searches && Route::parse(&request.url) == Route::Search {
            return Err(TransportError::Timeout);
        }

        Ok(state.handle(request, &self.userid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchPage;
    use reqwest::Method;

    const USER: &str = "acct:tester@hypothes.is";

    fn search(params: &[(&str, &str)]) -> HttpRequest {
        HttpRequest::new(Method::GET, "https://hypothes.is/api/search").query(
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_route_parsing() {
        assert_eq!(Route::parse("https://hypothes.is/api/search"), Route::Search);
        assert_eq!(
            Route::parse("https://h.example.org/api/annotations/abc"),
            Route::Annotation("abc".to_string())
        );
        assert_eq!(
            Route::parse("https://hypothes.is/api/groups/g1/members/me"),
            Route::GroupMember("g1".to_string(), "me".to_string())
        );
        assert_eq!(Route::parse("https://hypothes.is/api/other"), Route::Unknown);
    }

    #[tokio::test]
    async fn test_search_clamps_page_and_reports_total() {
        let store = InMemoryTransport::new(USER);
        store.seed_many(250, "g1").await;

        let response = store.execute(&search(&[("limit", "500")])).await.unwrap();
        let page: SearchPage = response.json().unwrap();
        assert_eq!(page.total, 250);
        assert_eq!(page.rows.len(), PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_search_after_descending() {
        let store = InMemoryTransport::new(USER);
        store.seed_many(5, "g1").await;

        let first: SearchPage = store
            .execute(&search(&[("limit", "2")]))
            .await
            .unwrap()
            .json()
            .unwrap();
        let cursor = first.rows[1].updated.clone().unwrap();

        let next: SearchPage = store
            .execute(&search(&[("limit", "10"), ("search_after", &cursor)]))
            .await
            .unwrap()
            .json()
            .unwrap();
        assert_eq!(next.total, 3);
        assert!(next
            .rows
            .iter()
            .all(|a| compare_sort_values(a.updated.as_deref(), Some(&cursor)) == Ordering::Less));
    }

    #[tokio::test]
    async fn test_dropped_creates_are_acknowledged_but_not_stored() {
        let store = InMemoryTransport::new(USER);
        store.drop_next_creates(1).await;

        let request = HttpRequest::new(Method::POST, "https://hypothes.is/api/annotations")
            .header("authorization", "Bearer t")
            .json(&Annotation::new("g1"))
            .unwrap();

        let response = store.execute(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(store.annotation_count().await, 0);

        store.execute(&request).await.unwrap();
        assert_eq!(store.annotation_count().await, 1);
    }

    #[tokio::test]
    async fn test_writes_require_authorization() {
        let store = InMemoryTransport::new(USER);
        let request = HttpRequest::new(Method::POST, "https://hypothes.is/api/annotations")
            .json(&Annotation::new("g1"))
            .unwrap();

        let response = store.execute(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
}
