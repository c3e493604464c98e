mod common;

use bucketfs_core::{Entry, EntryKind, PathPrefix};
use bucketfs_oss::{DirectoryLister, StoreError, DELIMITER, MAX_KEYS};
use common::{object, page, ScriptedClient};

const T0: &str = "2024-03-01T10:00:00.000Z";
const T0_SECS: i64 = 1_709_287_200;

fn list(
    client: &ScriptedClient,
    prefix: &PathPrefix,
    directory: &str,
    recursive: bool,
) -> Result<Vec<Entry>, StoreError> {
    DirectoryLister::new(client, "bucket", prefix).list(directory, recursive)
}

fn paths(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.path.as_str()).collect()
}

#[test]
fn test_empty_root_fetches_one_page() {
    let client = ScriptedClient::new();
    let entries = list(&client, &PathPrefix::none(), "", false).unwrap();

    assert!(entries.is_empty());
    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prefix, "");
    assert_eq!(requests[0].delimiter, DELIMITER);
    assert_eq!(requests[0].max_keys, MAX_KEYS);
    assert_eq!(requests[0].marker, "");
}

#[test]
fn test_single_page_files_then_directories() {
    let client = ScriptedClient::new().page(
        "photos/",
        "",
        page(
            vec![object("photos/b.jpg", T0, 20), object("photos/a.jpg", T0, 10)],
            &["photos/2024/", "photos/2023/"],
            None,
        ),
    );

    let entries = list(&client, &PathPrefix::none(), "photos/", false).unwrap();

    assert_eq!(
        entries,
        vec![
            Entry::file("photos/b.jpg", T0_SECS, 20),
            Entry::file("photos/a.jpg", T0_SECS, 10),
            Entry::dir("photos/2024"),
            Entry::dir("photos/2023"),
        ]
    );
    assert!(entries
        .iter()
        .filter(|e| e.kind == EntryKind::Dir)
        .all(|e| e.size == 0 && e.timestamp == 0));
    assert_eq!(client.requests().len(), 1);
}

#[test]
fn test_pages_are_concatenated_in_order() {
    let client = ScriptedClient::new()
        .page(
            "logs/",
            "",
            page(vec![object("logs/1", T0, 1)], &["logs/old/"], Some("cursor-1")),
        )
        .page(
            "logs/",
            "cursor-1",
            page(vec![object("logs/2", T0, 2)], &["logs/zz/"], None),
        );

    let entries = list(&client, &PathPrefix::none(), "logs", false).unwrap();

    assert_eq!(paths(&entries), ["logs/1", "logs/old", "logs/2", "logs/zz"]);
    let markers: Vec<_> = client.requests().into_iter().map(|r| r.marker).collect();
    assert_eq!(markers, ["", "cursor-1"]);
}

#[test]
fn test_empty_marker_ends_pagination() {
    let client = ScriptedClient::new().page(
        "",
        "",
        page(vec![object("only", T0, 1)], &[], Some("")),
    );

    let entries = list(&client, &PathPrefix::none(), "", false).unwrap();

    assert_eq!(paths(&entries), ["only"]);
    assert_eq!(client.requests().len(), 1);
}

#[test]
fn test_recursive_lists_contents_after_marker() {
    let client = ScriptedClient::new()
        .page("a/", "", page(vec![object("a/file1", T0, 1)], &["a/b/"], None))
        .page("a/b/", "", page(vec![object("a/b/file2", T0, 2)], &[], None));

    let entries = list(&client, &PathPrefix::none(), "a", true).unwrap();

    assert_eq!(
        entries,
        vec![
            Entry::file("a/file1", T0_SECS, 1),
            Entry::dir("a/b"),
            Entry::file("a/b/file2", T0_SECS, 2),
        ]
    );
}

#[test]
fn test_recursive_is_depth_first_across_pages() {
    let client = ScriptedClient::new()
        .page(
            "",
            "",
            page(vec![object("top.txt", T0, 1)], &["b/", "c/"], Some("next")),
        )
        .page("", "next", page(vec![object("z.txt", T0, 1)], &[], None))
        .page("b/", "", page(vec![object("b/1", T0, 1)], &["b/deep/"], None))
        .page("b/deep/", "", page(vec![object("b/deep/2", T0, 1)], &[], None))
        .page("c/", "", page(vec![object("c/3", T0, 1)], &[], None));

    let entries = list(&client, &PathPrefix::none(), "", true).unwrap();

    assert_eq!(
        paths(&entries),
        ["top.txt", "b", "b/1", "b/deep", "b/deep/2", "c", "c/3", "z.txt"]
    );
    assert_eq!(
        client.requested_prefixes(),
        ["", "b/", "b/deep/", "c/", ""]
    );
}

#[test]
fn test_non_recursive_does_not_descend() {
    let client = ScriptedClient::new().page("", "", page(vec![], &["a/", "b/"], None));

    let entries = list(&client, &PathPrefix::none(), "", false).unwrap();

    assert_eq!(paths(&entries), ["a", "b"]);
    assert_eq!(client.requests().len(), 1);
}

#[test]
fn test_prefix_is_applied_and_stripped() {
    let prefix = PathPrefix::new("tenant");
    let client = ScriptedClient::new()
        .page(
            "tenant/docs/",
            "",
            page(
                vec![object("tenant/docs/readme.md", T0, 5)],
                &["tenant/docs/img/"],
                None,
            ),
        )
        .page(
            "tenant/docs/img/",
            "",
            page(vec![object("tenant/docs/img/logo.png", T0, 7)], &[], None),
        );

    let entries = list(&client, &prefix, "/docs/", true).unwrap();

    assert_eq!(
        paths(&entries),
        ["docs/readme.md", "docs/img", "docs/img/logo.png"]
    );
    assert_eq!(
        client.requested_prefixes(),
        ["tenant/docs/", "tenant/docs/img/"]
    );
}

#[test]
fn test_root_of_prefixed_adapter() {
    let prefix = PathPrefix::new("tenant");
    let client = ScriptedClient::new();

    list(&client, &prefix, "", false).unwrap();

    assert_eq!(client.requested_prefixes(), ["tenant/"]);
}

#[test]
fn test_backslash_in_common_prefix_is_kept_when_descending() {
    let client = ScriptedClient::new()
        .page("", "", page(vec![], &["a\\b/"], None))
        .page("a\\b/", "", page(vec![object("a\\b/f", T0, 1)], &[], None));

    let entries = list(&client, &PathPrefix::none(), "", true).unwrap();

    assert_eq!(paths(&entries), ["a\\b", "a\\b/f"]);
    assert_eq!(client.requested_prefixes(), ["", "a\\b/"]);
}

#[test]
fn test_nested_failure_aborts_listing() {
    let client = ScriptedClient::new()
        .page("a/", "", page(vec![object("a/1", T0, 1)], &["a/b/", "a/c/"], None))
        .fail("a/b/", "", "connection reset");

    let err = list(&client, &PathPrefix::none(), "a", true).unwrap_err();

    match err {
        StoreError::Network(message) => assert_eq!(message, "connection reset"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(client.requested_prefixes(), ["a/", "a/b/"]);
}

#[test]
fn test_failure_on_second_page() {
    let client = ScriptedClient::new()
        .page("", "", page(vec![object("1", T0, 1)], &[], Some("m")))
        .fail("", "m", "timeout");

    assert!(matches!(
        list(&client, &PathPrefix::none(), "", false),
        Err(StoreError::Network(_))
    ));
}

#[test]
fn test_bad_timestamp_is_malformed_response() {
    let client = ScriptedClient::new().page(
        "",
        "",
        page(vec![object("x", "not a date", 1)], &[], None),
    );

    assert!(matches!(
        list(&client, &PathPrefix::none(), "", false),
        Err(StoreError::MalformedResponse(_))
    ));
}
