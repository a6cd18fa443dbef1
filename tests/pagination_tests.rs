//! Lazy pagination against a local mock server.
//!
//! Run with: cargo test --test pagination_tests

use std::collections::HashMap;
use std::sync::Once;

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use hubkit::api::SearchQuery;
use hubkit::client::config::TEXT_MATCH_MEDIA_TYPE;
use hubkit::prelude::*;

static INIT: Once = Once::new();

/// Initialize logging for tests
fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn setup() -> (ServerGuard, Session) {
    init_logging();
    let server = Server::new();
    let session = Session::with_config(ClientConfig::default().with_base_url(server.url()))
        .expect("Failed to create session");
    (server, session)
}

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u64,
}

const ISSUES: &str = "/repos/octocat/Hello-World/issues";

fn page_body(ids: &[u64]) -> String {
    Value::Array(ids.iter().map(|id| json!({ "id": id })).collect()).to_string()
}

/// Mount a chain of pages starting at [`ISSUES`]. Later pages live at
/// `/pages/<n>` and are linked with `rel="next"`. `hits` gives the number
/// of times each page is expected to be requested.
fn mount_pages(server: &mut ServerGuard, per_page: &str, pages: &[&[u64]], hits: &[usize]) -> Vec<Mock> {
    let base = server.url();
    let last = pages.len();
    let mut mocks = Vec::with_capacity(last);

    for (i, ids) in pages.iter().enumerate() {
        let mut mock = if i == 0 {
            server
                .mock("GET", ISSUES)
                .match_query(Matcher::UrlEncoded("per_page".into(), per_page.into()))
        } else {
            server.mock("GET", format!("/pages/{}", i + 1).as_str())
        };

        if i + 1 < last {
            mock = mock.with_header(
                "link",
                &format!(r#"<{base}/pages/{}>; rel="next", <{base}/pages/{last}>; rel="last""#, i + 2),
            );
        }

        mocks.push(
            mock.with_status(200)
                .with_header("content-type", "application/json")
                .with_body(page_body(ids))
                .expect(hits[i])
                .create(),
        );
    }
    mocks
}

fn ids(results: Vec<Result<Item>>) -> Vec<u64> {
    results.into_iter().map(|r| r.unwrap().id).collect()
}

// ============================================================================
// LIMIT TESTS
// ============================================================================

mod limit_tests {
    use super::*;

    #[test]
    fn test_unbounded_follows_every_page() {
        let (mut server, session) = setup();
        let mocks = mount_pages(&mut server, "100", &[&[1, 2, 3], &[4, 5], &[6]], &[1, 1, 1]);

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let items = ids(session.iter::<Item>(-1, &url).collect());

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(session.request_count(), 3);
        mocks.iter().for_each(Mock::assert);
    }

    #[test]
    fn test_count_stops_mid_collection() {
        let (mut server, session) = setup();
        let mocks = mount_pages(&mut server, "5", &[&[1, 2, 3], &[4, 5, 6], &[7]], &[1, 1, 0]);

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let mut iter = session.iter::<Item>(5, &url);
        let items = ids(iter.by_ref().collect());

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(iter.remaining(), Limit::AtMost(0));
        assert_eq!(session.request_count(), 2);
        mocks.iter().for_each(Mock::assert);
    }

    #[test]
    fn test_count_larger_than_collection() {
        let (mut server, session) = setup();
        let mocks = mount_pages(&mut server, "10", &[&[1, 2], &[3]], &[1, 1]);

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let items = ids(session.iter::<Item>(10, &url).collect());

        assert_eq!(items, vec![1, 2, 3]);
        mocks.iter().for_each(Mock::assert);
    }

    #[test]
    fn test_count_of_whole_first_page_skips_second() {
        let (mut server, session) = setup();
        let mocks = mount_pages(&mut server, "2", &[&[1, 2], &[3, 4]], &[1, 0]);

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let items = ids(session.iter::<Item>(2, &url).collect());

        assert_eq!(items, vec![1, 2]);
        assert_eq!(session.request_count(), 1);
        mocks.iter().for_each(Mock::assert);
    }

    #[test]
    fn test_caller_params_are_sent_on_first_page_only() {
        let (mut server, session) = setup();
        let first = server
            .mock("GET", ISSUES)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("state".into(), "closed".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
            ]))
            .with_status(200)
            .with_header("link", &format!(r#"<{}/pages/2>; rel="next""#, server.url()))
            .with_body(page_body(&[1]))
            .create();
        let second = server
            .mock("GET", "/pages/2")
            .with_status(200)
            .with_body(page_body(&[2]))
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let items = ids(
            session
                .iter::<Item>(-1, &url)
                .with_params([("state", "closed")])
                .collect(),
        );

        assert_eq!(items, vec![1, 2]);
        first.assert();
        second.assert();
    }
}

// ============================================================================
// REFRESH TESTS
// ============================================================================

mod refresh_tests {
    use super::*;

    #[test]
    fn test_unconditional_refresh_replays_sequence() {
        let (mut server, session) = setup();
        let mocks = mount_pages(&mut server, "100", &[&[1, 2], &[3]], &[2, 2]);

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let mut iter = session.iter::<Item>(-1, &url);
        let first = ids(iter.by_ref().collect());
        let second = ids(iter.refresh(false).collect());

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, first);
        assert_eq!(session.request_count(), 4);
        mocks.iter().for_each(Mock::assert);
    }

    #[test]
    fn test_conditional_refresh_of_unchanged_collection() {
        let (mut server, session) = setup();
        let fresh = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .match_header("if-none-match", Matcher::Missing)
            .with_status(200)
            .with_header("etag", r#""644b5b0155e6404a9cc4bd9d8b1ae730""#)
            .with_body(page_body(&[1, 2]))
            .expect(1)
            .create();
        let unchanged = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .match_header("if-none-match", r#""644b5b0155e6404a9cc4bd9d8b1ae730""#)
            .with_status(304)
            .expect(1)
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let mut iter = session.iter::<Item>(-1, &url);
        assert_eq!(ids(iter.by_ref().collect()), vec![1, 2]);
        assert_eq!(iter.etag(), Some(r#""644b5b0155e6404a9cc4bd9d8b1ae730""#));

        let refreshed: Vec<_> = iter.refresh(true).collect();
        assert!(refreshed.is_empty());
        assert_eq!(iter.last_status(), Some(304));
        assert_eq!(iter.etag(), Some(r#""644b5b0155e6404a9cc4bd9d8b1ae730""#));

        fresh.assert();
        unchanged.assert();
    }

    #[test]
    fn test_conditional_refresh_of_changed_collection() {
        let (mut server, session) = setup();
        let _original = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .match_header("if-none-match", Matcher::Missing)
            .with_status(200)
            .with_header("etag", r#""v1""#)
            .with_body(page_body(&[1]))
            .create();
        let _changed = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .match_header("if-none-match", r#""v1""#)
            .with_status(200)
            .with_header("etag", r#""v2""#)
            .with_body(page_body(&[2, 1]))
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let mut iter = session.iter::<Item>(-1, &url);
        assert_eq!(ids(iter.by_ref().collect()), vec![1]);
        assert_eq!(ids(iter.refresh(true).collect()), vec![2, 1]);
        assert_eq!(iter.etag(), Some(r#""v2""#));
    }

    #[test]
    fn test_known_etag_on_fresh_iterator() {
        let (mut server, session) = setup();
        let unchanged = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .match_header("if-none-match", r#""abc""#)
            .with_status(304)
            .expect(1)
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let mut iter = session.iter::<Item>(-1, &url).with_etag(r#""abc""#);
        assert!(iter.next().is_none());
        assert_eq!(iter.etag(), Some(r#""abc""#));
        unchanged.assert();
    }
}

// ============================================================================
// FAILURE TESTS
// ============================================================================

mod failure_tests {
    use super::*;

    #[test]
    fn test_malformed_record_ends_iteration() {
        let (mut server, session) = setup();
        let _mock = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"id": 1}, {"id": 2}, {"name": "no id"}, {"id": 4}]"#)
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let mut iter = session.iter::<Item>(-1, &url);

        assert_eq!(iter.next().unwrap().unwrap(), Item { id: 1 });
        assert_eq!(iter.next().unwrap().unwrap(), Item { id: 2 });
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBody);
        assert!(err.to_string().contains("record 3"));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_failure_status_on_later_page() {
        let (mut server, session) = setup();
        let _first = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("link", &format!(r#"<{}/pages/2>; rel="next""#, server.url()))
            .with_body(page_body(&[1, 2]))
            .create();
        let _second = server
            .mock("GET", "/pages/2")
            .with_status(502)
            .with_body(r#"{"message": "Server Error"}"#)
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let mut iter = session.iter::<Item>(-1, &url);

        assert_eq!(iter.next().unwrap().unwrap().id, 1);
        assert_eq!(iter.next().unwrap().unwrap().id, 2);
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.status(), Some(502));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_missing_collection() {
        let (mut server, session) = setup();
        let _mock = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let results: Vec<_> = session.iter::<Item>(-1, &url).collect();

        assert_eq!(results.len(), 1);
        let err = results.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "not found (404): Not Found");
    }

    #[test]
    fn test_mapping_body_is_rejected() {
        let (mut server, session) = setup();
        let _mock = server
            .mock("GET", "/repos/octocat/Hello-World/languages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"Rust": 1000, "C": 20}"#)
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "languages"]);
        let mut iter = session.iter::<Value>(-1, &url);

        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedPageShape);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_empty_body_yields_nothing() {
        let (mut server, session) = setup();
        let _mock = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .with_status(204)
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        assert_eq!(session.iter::<Item>(-1, &url).count(), 0);
    }
}

// ============================================================================
// SHAPE TESTS
// ============================================================================

mod shape_tests {
    use super::*;

    #[test]
    fn test_entries_of_mapping_body() {
        let (mut server, session) = setup();
        let _mock = server
            .mock("GET", "/repos/octocat/Hello-World/languages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"Rust": 1000, "C": 20}"#)
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "languages"]);
        let languages: HashMap<String, u64> =
            PageIterator::<(String, u64)>::entries(session.clone(), &url, -1)
                .collect::<Result<_>>()
                .unwrap();

        assert_eq!(languages.len(), 2);
        assert_eq!(languages["Rust"], 1000);
        assert_eq!(languages["C"], 20);
    }

    #[test]
    fn test_custom_deserializer() {
        let (mut server, session) = setup();
        let _mock = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"number": 7, "title": "a"}, {"number": 9, "title": "b"}]"#)
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let numbers: Vec<u64> = PageIterator::with_deserializer(session.clone(), &url, -1, |value: Value| {
            value["number"]
                .as_u64()
                .ok_or_else(|| Error::MalformedBody("missing number".to_string()))
        })
        .collect::<Result<_>>()
        .unwrap();

        assert_eq!(numbers, vec![7, 9]);
    }

    #[test]
    fn test_extra_header_is_sent_with_every_page() {
        let (mut server, session) = setup();
        let preview = "application/vnd.github.squirrel-girl-preview+json";
        let first = server
            .mock("GET", ISSUES)
            .match_query(Matcher::Any)
            .match_header("accept", preview)
            .with_status(200)
            .with_header("link", &format!(r#"<{}/pages/2>; rel="next""#, server.url()))
            .with_body(page_body(&[1]))
            .create();
        let second = server
            .mock("GET", "/pages/2")
            .match_header("accept", preview)
            .with_status(200)
            .with_body(page_body(&[2]))
            .create();

        let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
        let items = ids(
            session
                .iter::<Item>(-1, &url)
                .with_header(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static(preview),
                )
                .collect(),
        );

        assert_eq!(items, vec![1, 2]);
        first.assert();
        second.assert();
    }
}

// ============================================================================
// SEARCH TESTS
// ============================================================================

mod search_tests {
    use super::*;

    #[test]
    fn test_search_items_across_pages() {
        let (mut server, session) = setup();
        let first = server
            .mock("GET", "/search/issues")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "bug label:crash".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
            ]))
            .with_status(200)
            .with_header("link", &format!(r#"<{}/search/page2>; rel="next""#, server.url()))
            .with_body(r#"{"total_count": 2, "incomplete_results": false, "items": [{"id": 1}]}"#)
            .create();
        let second = server
            .mock("GET", "/search/page2")
            .with_status(200)
            .with_body(r#"{"items": [{"id": 2}]}"#)
            .create();

        let mut results = session
            .search()
            .issues::<Item>(SearchQuery::new("bug label:crash"), -1);
        assert_eq!(results.total_count(), 0);

        assert_eq!(results.next().unwrap().unwrap().id, 1);
        assert_eq!(results.total_count(), 2);
        assert_eq!(results.next().unwrap().unwrap().id, 2);
        assert!(results.next().is_none());
        assert_eq!(results.total_count(), 2);

        first.assert();
        second.assert();
    }

    #[test]
    fn test_search_sort_and_order() {
        let (mut server, session) = setup();
        let mock = server
            .mock("GET", "/search/repositories")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "language:rust".into()),
                Matcher::UrlEncoded("sort".into(), "stars".into()),
                Matcher::UrlEncoded("order".into(), "asc".into()),
                Matcher::UrlEncoded("per_page".into(), "3".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"total_count": 12345, "items": [{"id": 1}, {"id": 2}, {"id": 3}]}"#)
            .create();

        let query = SearchQuery::new("language:rust")
            .sort("stars")
            .order(SortOrder::Asc);
        let mut results = session.search().repositories::<Item>(query, 3);
        let items: Vec<u64> = results.by_ref().map(|r| r.unwrap().id).collect();

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(results.total_count(), 12345);
        mock.assert();
    }

    #[test]
    fn test_search_text_match_media_type() {
        let (mut server, session) = setup();
        let mock = server
            .mock("GET", "/search/code")
            .match_query(Matcher::Any)
            .match_header("accept", TEXT_MATCH_MEDIA_TYPE)
            .with_status(200)
            .with_body(r#"{"total_count": 0, "items": []}"#)
            .create();

        let query = SearchQuery::new("addClass in:file").text_match(true);
        let results: Vec<_> = session.search().code::<Value>(query, -1).collect();

        assert!(results.is_empty());
        mock.assert();
    }

    #[test]
    fn test_search_body_must_be_mapping() {
        let (mut server, session) = setup();
        let _mock = server
            .mock("GET", "/search/users")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"id": 1}]"#)
            .create();

        let mut results = session.search().users::<Item>(SearchQuery::new("tom"), -1);
        let err = results.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedPageShape);
        assert!(results.next().is_none());
    }
}
