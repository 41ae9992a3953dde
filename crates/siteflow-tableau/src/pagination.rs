//! Paginated listing traversal
//!
//! Listing endpoints answer with one page of items plus a pagination
//! envelope. [`PageScanner::pages`] turns an endpoint into a finite stream of
//! pages: page 1 comes from the bare path, the page count is derived once from
//! page 1's envelope, and pages `2..=total_page_count` follow strictly in
//! order. Collecting everything and stopping at the first match are two
//! consumers of that same stream.

use crate::error::{Result, TableauError};
use crate::transport::Transport;
use futures_util::{Stream, TryStreamExt, stream};
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// A pagination number as sent by the service (decimal string or number)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PageValue {
    Number(u64),
    Text(String),
}

impl PageValue {
    fn parse(&self, field: &'static str) -> Result<u64> {
        match self {
            PageValue::Number(n) => Ok(*n),
            PageValue::Text(s) => s.trim().parse().map_err(|_| TableauError::Pagination {
                field,
                value: s.clone(),
            }),
        }
    }
}

/// Pagination envelope exactly as received
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPagination {
    pub page_number: PageValue,
    pub page_size: PageValue,
    pub total_available: PageValue,
}

/// Validated pagination numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_number: u64,
    pub page_size: u64,
    pub total_available: u64,
    /// `ceil(total_available / page_size)`
    pub total_page_count: u64,
}

impl TryFrom<&RawPagination> for Pagination {
    type Error = TableauError;

    fn try_from(raw: &RawPagination) -> Result<Self> {
        let page_number = raw.page_number.parse("pageNumber")?;
        let page_size = raw.page_size.parse("pageSize")?;
        let total_available = raw.total_available.parse("totalAvailable")?;

        let total_page_count = match (total_available, page_size) {
            (0, _) => 0,
            (_, 0) => {
                return Err(TableauError::Pagination {
                    field: "pageSize",
                    value: "0".to_string(),
                });
            }
            (total, size) => total.div_ceil(size),
        };

        Ok(Self {
            page_number,
            page_size,
            total_available,
            total_page_count,
        })
    }
}

/// Response body of one listing page
pub trait PageEnvelope: DeserializeOwned {
    type Item;

    fn pagination(&self) -> &RawPagination;

    fn into_items(self) -> Vec<Self::Item>;
}

/// One decoded page
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// 1-based page number
    pub number: u64,
    /// Page count learned from page 1
    pub total_pages: u64,
    /// Item count learned from page 1
    pub total_available: u64,
    pub items: Vec<T>,
}

enum Cursor {
    First,
    Next { number: u64, pagination: Pagination },
}

/// Walks the pages of one listing endpoint
pub struct PageScanner<'a, E> {
    transport: &'a dyn Transport,
    path: String,
    _envelope: PhantomData<fn() -> E>,
}

impl<'a, E> PageScanner<'a, E>
where
    E: PageEnvelope + 'a,
    E::Item: Send + 'a,
{
    pub fn new(transport: &'a dyn Transport, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
            _envelope: PhantomData,
        }
    }

    /// Lazy stream of pages; every call starts over from page 1
    pub fn pages(&self) -> impl Stream<Item = Result<Page<E::Item>>> + Send + 'a {
        let transport = self.transport;
        let path = self.path.clone();

        stream::try_unfold(Cursor::First, move |cursor| {
            let path = path.clone();
            async move {
                match cursor {
                    Cursor::First => {
                        let envelope: E = fetch_envelope(transport, &path).await?;
                        let pagination = Pagination::try_from(envelope.pagination())?;
                        let page = Page {
                            number: 1,
                            total_pages: pagination.total_page_count,
                            total_available: pagination.total_available,
                            items: envelope.into_items(),
                        };
                        Ok(Some((page, Cursor::Next { number: 2, pagination })))
                    }
                    Cursor::Next { number, pagination }
                        if number <= pagination.total_page_count =>
                    {
                        let envelope: E =
                            fetch_envelope(transport, &page_path(&path, number)).await?;
                        let page = Page {
                            number,
                            total_pages: pagination.total_page_count,
                            total_available: pagination.total_available,
                            items: envelope.into_items(),
                        };
                        Ok(Some((
                            page,
                            Cursor::Next {
                                number: number + 1,
                                pagination,
                            },
                        )))
                    }
                    Cursor::Next { .. } => Ok(None),
                }
            }
        })
    }

    /// Every item of every page, in page order
    pub async fn collect_all(&self) -> Result<Vec<E::Item>> {
        let mut pages = std::pin::pin!(self.pages());
        let mut items = Vec::new();
        let mut expected = None;

        while let Some(page) = pages.try_next().await? {
            expected.get_or_insert(page.total_available);
            items.extend(page.items);
        }

        if let Some(expected) = expected {
            if items.len() as u64 != expected {
                tracing::warn!(
                    "{} reported {} items but returned {}",
                    self.path,
                    expected,
                    items.len()
                );
            }
        }

        Ok(items)
    }

    /// First item matching `predicate`; pages after the match are not fetched
    pub async fn find<P>(&self, mut predicate: P) -> Result<Option<E::Item>>
    where
        P: FnMut(&E::Item) -> bool + Send,
    {
        let mut pages = std::pin::pin!(self.pages());

        while let Some(page) = pages.try_next().await? {
            let number = page.number;
            if let Some(item) = page.items.into_iter().find(|item| predicate(item)) {
                tracing::debug!("Match found on page {} of {}", number, self.path);
                return Ok(Some(item));
            }
        }

        Ok(None)
    }
}

fn page_path(path: &str, number: u64) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}pageNumber={}", path, separator, number)
}

async fn fetch_envelope<E: DeserializeOwned>(transport: &dyn Transport, path: &str) -> Result<E> {
    tracing::debug!("Fetching {}", path);
    let body = transport.execute(Method::GET, path, None).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{Project, ProjectListResponse};
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    fn listing(ids: &[&str], page: u64, page_size: u64, total: u64) -> serde_json::Value {
        let projects: Vec<_> = ids.iter().map(|id| json!({ "id": id, "name": id, "contentPermissions": "ManagedByOwner" })).collect();
        json!({
            "pagination": {
                "pageNumber": page.to_string(),
                "pageSize": page_size.to_string(),
                "totalAvailable": total.to_string()
            },
            "projects": { "project": projects }
        })
    }

    fn ids(projects: &[Project]) -> Vec<&str> {
        projects.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_total_page_count() {
        let raw = |size: &str, total: &str| RawPagination {
            page_number: PageValue::Text("1".to_string()),
            page_size: PageValue::Text(size.to_string()),
            total_available: PageValue::Text(total.to_string()),
        };

        assert_eq!(Pagination::try_from(&raw("2", "5")).unwrap().total_page_count, 3);
        assert_eq!(Pagination::try_from(&raw("100", "100")).unwrap().total_page_count, 1);
        assert_eq!(Pagination::try_from(&raw("100", "0")).unwrap().total_page_count, 0);
        assert!(Pagination::try_from(&raw("0", "5")).is_err());
        assert!(Pagination::try_from(&raw("ten", "5")).is_err());
    }

    #[test]
    fn test_numeric_envelope_accepted() {
        let raw: RawPagination = serde_json::from_value(json!({
            "pageNumber": 1,
            "pageSize": 2,
            "totalAvailable": 3
        }))
        .unwrap();
        assert_eq!(Pagination::try_from(&raw).unwrap().total_page_count, 2);
    }

    #[test]
    fn test_page_path() {
        assert_eq!(page_path("/projects", 2), "/projects?pageNumber=2");
        assert_eq!(
            page_path("/projects?filter=name:eq:x", 3),
            "/projects?filter=name:eq:x&pageNumber=3"
        );
    }

    #[tokio::test]
    async fn test_collect_all_walks_every_page() {
        let transport = ScriptedTransport::new()
            .with_json("/projects", listing(&["a", "b"], 1, 2, 5))
            .with_json("/projects?pageNumber=2", listing(&["c", "d"], 2, 2, 5))
            .with_json("/projects?pageNumber=3", listing(&["e"], 3, 2, 5));

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        let projects = scanner.collect_all().await.unwrap();

        assert_eq!(ids(&projects), ["a", "b", "c", "d", "e"]);
        assert_eq!(
            transport.paths(),
            ["/projects", "/projects?pageNumber=2", "/projects?pageNumber=3"]
        );
    }

    #[tokio::test]
    async fn test_single_page_fetches_once() {
        let transport =
            ScriptedTransport::new().with_json("/projects", listing(&["a", "b"], 1, 100, 2));

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        assert_eq!(scanner.collect_all().await.unwrap().len(), 2);
        assert_eq!(transport.paths(), ["/projects"]);
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let transport = ScriptedTransport::new().with_json(
            "/projects",
            json!({
                "pagination": { "pageNumber": "1", "pageSize": "100", "totalAvailable": "0" },
                "projects": {}
            }),
        );

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        assert!(scanner.collect_all().await.unwrap().is_empty());
        assert_eq!(transport.paths(), ["/projects"]);
    }

    #[tokio::test]
    async fn test_duplicates_across_pages_are_kept() {
        let transport = ScriptedTransport::new()
            .with_json("/projects", listing(&["a", "b"], 1, 2, 4))
            .with_json("/projects?pageNumber=2", listing(&["b", "c"], 2, 2, 4));

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        let projects = scanner.collect_all().await.unwrap();
        assert_eq!(ids(&projects), ["a", "b", "b", "c"]);
    }

    #[tokio::test]
    async fn test_later_envelopes_do_not_extend_range() {
        // page 2 claims far more items than page 1 did
        let transport = ScriptedTransport::new()
            .with_json("/projects", listing(&["a", "b"], 1, 2, 4))
            .with_json("/projects?pageNumber=2", listing(&["c", "d"], 2, 2, 400));

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        assert_eq!(scanner.collect_all().await.unwrap().len(), 4);
        assert_eq!(transport.paths().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_envelope_fails_before_page_two() {
        let transport = ScriptedTransport::new().with_json(
            "/projects",
            json!({
                "pagination": { "pageNumber": "1", "pageSize": "2", "totalAvailable": "lots" },
                "projects": { "project": [{ "id": "a", "contentPermissions": "ManagedByOwner" }] }
            }),
        );

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        let err = scanner.collect_all().await.unwrap_err();

        assert!(err.is_decode());
        assert!(matches!(err, TableauError::Pagination { field: "totalAvailable", .. }));
        assert_eq!(transport.paths(), ["/projects"]);
    }

    #[tokio::test]
    async fn test_find_short_circuits_on_first_page() {
        let transport = ScriptedTransport::new()
            .with_json("/projects", listing(&["a", "b"], 1, 2, 6))
            .with_json("/projects?pageNumber=2", listing(&["c", "d"], 2, 2, 6))
            .with_json("/projects?pageNumber=3", listing(&["e", "f"], 3, 2, 6));

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        let found = scanner.find(|p: &Project| p.id == "b").await.unwrap();

        assert_eq!(found.unwrap().id, "b");
        assert_eq!(transport.paths(), ["/projects"]);
    }

    #[tokio::test]
    async fn test_find_stops_at_matching_page() {
        let transport = ScriptedTransport::new()
            .with_json("/projects", listing(&["a", "b"], 1, 2, 6))
            .with_json("/projects?pageNumber=2", listing(&["c", "d"], 2, 2, 6))
            .with_json("/projects?pageNumber=3", listing(&["e", "f"], 3, 2, 6));

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        let found = scanner.find(|p: &Project| p.id == "d").await.unwrap();

        assert_eq!(found.unwrap().id, "d");
        assert_eq!(transport.paths(), ["/projects", "/projects?pageNumber=2"]);
    }

    #[tokio::test]
    async fn test_find_absent_scans_every_page_then_stops() {
        let transport = ScriptedTransport::new()
            .with_json("/projects", listing(&["a", "b"], 1, 2, 3))
            .with_json("/projects?pageNumber=2", listing(&["c"], 2, 2, 3));

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        let found = scanner.find(|p: &Project| p.id == "missing").await.unwrap();

        assert!(found.is_none());
        assert_eq!(transport.paths(), ["/projects", "/projects?pageNumber=2"]);
    }

    #[tokio::test]
    async fn test_pages_restart_from_first_page() {
        let transport = ScriptedTransport::new()
            .with_json("/projects", listing(&["a"], 1, 1, 2))
            .with_json("/projects?pageNumber=2", listing(&["b"], 2, 1, 2));

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        let first: Vec<_> = scanner.pages().try_collect().await.unwrap();
        let second: Vec<_> = scanner.pages().try_collect().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.iter().map(|p| p.number).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(transport.paths().len(), 4);
    }

    #[tokio::test]
    async fn test_transport_error_on_later_page_propagates() {
        let transport = ScriptedTransport::new()
            .with_json("/projects", listing(&["a"], 1, 1, 2))
            .with_status("/projects?pageNumber=2", 500, "boom");

        let scanner = PageScanner::<ProjectListResponse>::new(&transport, "/projects");
        let err = scanner.collect_all().await.unwrap_err();
        assert!(matches!(err, TableauError::Status { status: 500, .. }));
    }
}
