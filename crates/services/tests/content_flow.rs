use std::sync::Arc;

use services::{
    AppServices, ContentServiceError, GenerationConfig, GenerationError, GenerationService,
    MemoryNotifier,
};
use storage::repository::Storage;
use tellect_core::model::{AiSettingsDraft, Subject};
use tellect_core::time::fixed_now;
use tellect_core::Clock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve exactly one HTTP request with the given status line and JSON body.
async fn serve_once(status: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0_u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    format!("http://{addr}/v1")
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}

fn chat_body(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

fn generation_for(base_url: String) -> GenerationService {
    let settings = AiSettingsDraft {
        api_key: Some("test-key".into()),
        model: Some("test-model".into()),
        base_url: Some(base_url),
    }
    .validate()
    .unwrap();
    GenerationService::new(Some(GenerationConfig::new(settings)))
}

async fn app(generation: GenerationService) -> AppServices {
    AppServices::from_storage(
        Storage::in_memory(),
        Clock::fixed(fixed_now()),
        None,
        Arc::new(MemoryNotifier::new()),
        generation,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn generated_flashcards_are_saved_with_xp() {
    let content = "```json\n{\"flashcards\": [\
        {\"question\": \"What is 3 x 4?\", \"answer\": \"12\"},\
        {\"question\": \"What is 10 / 2?\", \"answer\": \"5\"}]}\n```";
    let base_url = serve_once("200 OK", chat_body(content)).await;
    let app = app(generation_for(base_url)).await;
    assert!(app.created_profile());

    let generated = app
        .generation()
        .generate_flashcards("Arithmetic", Subject::Math)
        .await
        .unwrap();
    assert_eq!(generated.flashcards.len(), 2);

    let saved = app
        .content()
        .save_flashcards(app.user(), Subject::Math, generated)
        .await
        .unwrap();
    assert_eq!(saved.xp_awarded, 50);
    assert_eq!(saved.content.len(), 2);

    let items = app
        .items()
        .list_items(app.user(), Some(Subject::Math))
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(app.progress().profile(app.user()).await.unwrap().xp(), 50);
}

#[tokio::test]
async fn generated_mindmap_is_saved_with_xp() {
    let content = r#"{"mindmap": {"title": "", "nodes": [
        {"id": "1", "label": "Water cycle", "position": {"x": 0, "y": 0}, "type": "central"},
        {"id": "2", "label": "Evaporation", "position": {"x": -200, "y": -100}, "type": "branch"},
        {"id": "3", "label": "Condensation", "position": {"x": 200, "y": -100}, "type": "branch"}
    ], "edges": [
        {"id": "e1-2", "source": "1", "target": "2"},
        {"id": "e1-3", "source": "1", "target": "3"}
    ]}}"#;
    let base_url = serve_once("200 OK", chat_body(content)).await;
    let app = app(generation_for(base_url)).await;

    let generated = app
        .generation()
        .generate_mindmap("Water cycle", Subject::Science)
        .await
        .unwrap();
    assert_eq!(generated.mindmap.title, "Water cycle");

    let saved = app
        .content()
        .save_mindmap(app.user(), generated)
        .await
        .unwrap();
    assert_eq!(saved.xp_awarded, 75);
    assert_eq!(saved.content.nodes().len(), 3);

    let dashboard = app.progress().dashboard(app.user()).await.unwrap();
    assert_eq!(dashboard.mindmap_count, 1);
    assert_eq!(dashboard.xp, 75);
}

#[tokio::test]
async fn mindmap_without_title_key_falls_back_to_topic() {
    let content = r#"```json{"mindmap": {"nodes": [
        {"id": "1", "label": "Cell", "type": "central"}
    ], "edges": []}}```"#;
    let base_url = serve_once("200 OK", chat_body(content)).await;
    let app = app(generation_for(base_url)).await;

    let generated = app
        .generation()
        .generate_mindmap("  Cell biology ", Subject::Science)
        .await
        .unwrap();
    assert_eq!(generated.mindmap.title, "Cell biology");
    assert_eq!(generated.mindmap.nodes.len(), 1);
}

#[tokio::test]
async fn provider_errors_surface_as_http_status() {
    let base_url = serve_once(
        "401 Unauthorized",
        serde_json::json!({"error": {"message": "bad key"}}).to_string(),
    )
    .await;
    let err = generation_for(base_url)
        .generate_flashcards("Anything", Subject::General)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::HttpStatus(status) if status.as_u16() == 401));
}

#[tokio::test]
async fn unparseable_content_is_a_parse_error() {
    let base_url = serve_once("200 OK", chat_body("I cannot help with that.")).await;
    let err = generation_for(base_url)
        .generate_flashcards("Anything", Subject::General)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Parse(_)));
}

#[tokio::test]
async fn empty_flashcard_batch_is_not_saved() {
    let app = app(GenerationService::new(None)).await;
    let err = app
        .content()
        .save_flashcards(
            app.user(),
            Subject::Math,
            services::GeneratedFlashcards {
                flashcards: Vec::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ContentServiceError::NothingToSave));
    assert_eq!(app.progress().profile(app.user()).await.unwrap().xp(), 0);
}
