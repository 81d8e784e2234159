use super::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing(json_text: &str) -> Listing {
    serde_json::from_str(json_text).expect("listing json should parse")
}

#[test]
fn keyword_filter_checks_title_tags_and_introduction() {
    assert!(is_workshop(&listing(r#"{"title": "목공 소품 만들기"}"#)));
    assert!(is_workshop(&listing(
        r#"{"title": "어느 가게", "alltag": "가죽공예,원데이"}"#
    )));
    assert!(is_workshop(&listing(
        r#"{"title": "어느 가게", "sumary": "도자기를 빚어 봅니다"}"#
    )));
    assert!(!is_workshop(&listing(
        r#"{"title": "해변 산책로", "alltag": "바다,산책"}"#
    )));
}

#[test]
fn filter_keeps_only_workshops() {
    let listings = vec![
        listing(r#"{"title": "캔들 공방"}"#),
        listing(r#"{"title": "오름 전망대"}"#),
    ];

    let kept = filter_workshops(listings);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].title(), "캔들 공방");
}

#[test]
fn items_nested_under_result_are_extracted() {
    let value = json!({"result": {"items": [{"title": "염색 체험"}]}});
    let items = extract_items(&value).expect("items should decode");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title(), "염색 체험");

    let value = json!({"result": "00"});
    let items = extract_items(&value).expect("empty response should decode");
    assert!(items.is_empty());
}

#[test]
fn page_counts_parse_from_numbers_and_strings() {
    assert_eq!(page_number(&json!({"pageCount": 7}), "pageCount"), Some(7));
    assert_eq!(
        page_number(&json!({"pageCount": "7"}), "pageCount"),
        Some(7)
    );
    assert_eq!(page_number(&json!({}), "pageCount"), None);
}

#[test]
fn missing_credential_surfaces_at_fetch_time() {
    let mut client =
        VisitJejuClient::new(&VisitJejuConfig::default()).expect("client should build");
    client.api_key = None;

    let result = client.fetch_all();
    match result {
        Err(RagError::Config(message)) => {
            assert!(message.contains("VISITJEJU_API_KEY"));
        }
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn all_pages_are_fetched_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vsjApi/contents/searchList"))
        .and(query_param("apiKey", "test-key"))
        .and(query_param("locale", "kr"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "00",
            "currentPage": 1,
            "pageCount": 2,
            "items": [{"title": "도예 공방"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vsjApi/contents/searchList"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "00",
            "currentPage": 2,
            "pageCount": 2,
            "items": [{"title": "전통 염색 체험"}, {"title": "오름 전망대"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = VisitJejuConfig {
        api_base: format!("{}/vsjApi/contents/searchList", server.uri()),
        locale: "kr".to_string(),
    };
    let client = VisitJejuClient::new(&config)
        .expect("client should build")
        .with_api_key("test-key");

    let items = client.fetch_all().expect("fetch should succeed");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].title(), "도예 공방");
    assert_eq!(items[1].title(), "전통 염색 체험");
    assert_eq!(items[2].title(), "오름 전망대");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_error_is_a_corpus_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = VisitJejuConfig {
        api_base: format!("{}/searchList", server.uri()),
        locale: "kr".to_string(),
    };
    let client = VisitJejuClient::new(&config)
        .expect("client should build")
        .with_api_key("test-key");

    assert!(matches!(client.fetch_all(), Err(RagError::Corpus(_))));
}
