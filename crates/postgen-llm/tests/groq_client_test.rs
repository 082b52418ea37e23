use futures::StreamExt;
use mockito::Matcher;
use postgen_llm::{ChatClient, ChatRequest, GroqClient, GroqConfig, DEFAULT_MODEL};
use serde_json::json;

fn stream_body(parts: &[&str]) -> String {
    let mut body = String::from(
        "data: {\"id\":\"c\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"finish_reason\":null}]}\n\n",
    );
    for part in parts {
        body.push_str(&format!(
            "data: {}\n\n",
            json!({"id": "c", "choices": [{"index": 0, "delta": {"content": part}, "finish_reason": null}]})
        ));
    }
    body.push_str("data: {\"id\":\"c\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n");
    body.push_str("data: [DONE]\n\n");
    body
}

fn client_for(server: &mockito::Server) -> GroqClient {
    GroqClient::new(GroqConfig::new("gsk_test").with_base_url(server.url())).unwrap()
}

#[tokio::test]
async fn test_chat_returns_first_choice_content() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer gsk_test")
        .match_body(Matcher::PartialJson(json!({"model": DEFAULT_MODEL, "stream": false})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello there"}, "finish_reason": "stop"}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let response = client
        .chat(ChatRequest::single_user(DEFAULT_MODEL, "Say hello"))
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("Hello there"));
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chat_stream_yields_deltas_in_order() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "stream": true,
            "messages": [{"role": "user", "content": "gardening"}]
        })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(stream_body(&["Grow", " your", " mindset."]))
        .create_async()
        .await;

    let client = client_for(&server);
    let stream = client
        .chat_stream(ChatRequest::single_user(DEFAULT_MODEL, "gardening"))
        .await
        .unwrap();
    let deltas: Vec<_> = stream.collect().await;

    // role-only and finish chunks still come through, just without text
    assert_eq!(deltas.len(), 5);
    let text: String = deltas
        .iter()
        .filter_map(|d| d.as_ref().unwrap().non_empty_text())
        .collect();
    assert_eq!(text, "Grow your mindset.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chat_stream_fails_fast_on_auth_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Invalid API Key"}}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client
        .chat_stream(ChatRequest::single_user(DEFAULT_MODEL, "x"))
        .await;

    let err = match result {
        Ok(_) => panic!("expected auth failure"),
        Err(e) => e.to_string(),
    };
    assert!(err.contains("401"));
    assert!(err.contains("Invalid API Key"));
}
