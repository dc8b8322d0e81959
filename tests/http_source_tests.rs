use serde_json::json;
use unitnav::api::{
    ContextRadius, FilterParams, HttpUnitSource, SourceError, UnitId, UnitSource,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

// ============================================================================
// Helper Functions
// ============================================================================

fn source_for(server: &MockServer) -> HttpUnitSource {
    HttpUnitSource::new(Some(server.uri()), Some("abc123".to_string()))
}

// ============================================================================
// Id sequence
// ============================================================================

#[tokio::test]
async fn test_uids_sends_filter_and_marks_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xhr/uids/"))
        .and(query_param("path", "/fr/project/"))
        .and(query_param("filter", "incomplete"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .and(header("Cookie", "sessionid=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "begin": 10,
            "end": 15,
            "total": 120,
            "uids": [[11, 12, 13], [20, 21]]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let filter = FilterParams {
        filter: Some("incomplete".to_string()),
        ..FilterParams::for_path("/fr/project/")
    };
    let sequence = source_for(&mock_server)
        .fetch_id_sequence(&filter)
        .await
        .unwrap();

    assert_eq!(
        sequence.ids,
        vec![UnitId(11), UnitId(12), UnitId(13), UnitId(20), UnitId(21)]
    );
    assert!(sequence.headers.contains(&UnitId(11)));
    assert!(sequence.headers.contains(&UnitId(20)));
    assert!(!sequence.headers.contains(&UnitId(12)));
    assert_eq!((sequence.begin, sequence.end, sequence.total), (10, 15, 120));
}

#[tokio::test]
async fn test_uids_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xhr/uids/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "begin": 0, "end": 0, "total": 0, "uids": []
        })))
        .mount(&mock_server)
        .await;

    let sequence = source_for(&mock_server)
        .fetch_id_sequence(&FilterParams::for_path("/fr/"))
        .await
        .unwrap();
    assert!(sequence.is_empty());
}

// ============================================================================
// Units
// ============================================================================

#[tokio::test]
async fn test_units_by_ids_sends_comma_separated_lists() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xhr/units/"))
        .and(query_param("uids", "4,5,6"))
        .and(query_param("headers", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "4": {"source": ["Open"], "target": ["Ouvrir"], "file": "ui.po"},
            "5": {"source": ["Close"], "target": [], "isfuzzy": true},
            "6": {"source": ["Save"]}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let rows = source_for(&mock_server)
        .fetch_units_by_ids(&[UnitId(4), UnitId(5), UnitId(6)], &[UnitId(4)])
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[&UnitId(4)].file.as_deref(), Some("ui.po"));
    assert!(rows[&UnitId(5)].is_fuzzy);
    assert!(rows[&UnitId(6)].target.is_empty());
}

#[tokio::test]
async fn test_unit_edit_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xhr/units/7/edit/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "editor": "<form id=\"translate\"></form>",
            "tm_suggestions": [{"source": "Open", "target": "Ouvrir"}],
            "is_obsolete": false,
            "sources": {"en": ["Open file"]},
            "target": ["Ouvrir le fichier"]
        })))
        .mount(&mock_server)
        .await;

    let payload = source_for(&mock_server)
        .fetch_unit_by_id(UnitId(7))
        .await
        .unwrap();
    assert_eq!(payload.target, vec!["Ouvrir le fichier".to_string()]);
    assert_eq!(payload.tm_suggestions.len(), 1);
    assert_eq!(payload.sources["en"], vec!["Open file".to_string()]);
}

#[tokio::test]
async fn test_context_sends_radius() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xhr/units/7/context/"))
        .and(query_param("before", "2"))
        .and(query_param("after", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "before": [{"id": 5, "source": ["A"]}, {"id": 6, "source": ["B"]}],
            "after": [{"id": 8, "source": ["C"]}]
        })))
        .mount(&mock_server)
        .await;

    let context = source_for(&mock_server)
        .fetch_context(UnitId(7), ContextRadius::symmetric(2))
        .await
        .unwrap();
    assert_eq!(context.before.len(), 2);
    assert_eq!(context.before[1].id, UnitId(6));
    assert_eq!(context.after[0].row.source, vec!["C".to_string()]);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_api_error_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xhr/units/9/edit/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&mock_server)
        .await;

    let result = source_for(&mock_server).fetch_unit_by_id(UnitId(9)).await;
    assert_eq!(
        result,
        Err(SourceError::Api {
            status: 403,
            message: "Forbidden".to_string()
        })
    );
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xhr/uids/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let result = source_for(&mock_server)
        .fetch_id_sequence(&FilterParams::for_path("/fr/"))
        .await;
    assert!(matches!(result, Err(SourceError::Parse(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Nothing listens on port 9 (discard) on test machines
    let source = HttpUnitSource::new(Some("http://127.0.0.1:9".to_string()), None);
    let result = source.fetch_unit_by_id(UnitId(1)).await;
    assert!(matches!(result, Err(SourceError::Network(_))));
}
