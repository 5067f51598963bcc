// HTTP-level tests for the Suno and ElevenLabs side effects

use mockito::Matcher;
use serde_json::json;

use refrain::config::{SunoSettings, VoiceSettings};
use refrain::errors::MediaError;
use refrain::media::{MediaSideEffect, SunoPublisher, VoiceSynthesizer};

fn suno_settings(base_url: String, poll_attempts: u32) -> SunoSettings {
    SunoSettings {
        api_key: Some("suno-key".into()),
        base_url,
        callback_url: Some("https://example.com/callback".into()),
        poll_attempts,
        poll_interval_secs: 0,
        ..SunoSettings::default()
    }
}

fn song() -> serde_json::Value {
    json!({
        "song_name": "Neon Rain",
        "song_prompt": "slow synthwave with rain",
        "negativeTags": "metal",
        "vocalGender": "f",
        "styleWeight": 0.6,
        "weirdnessConstraint": 0.3,
        "audioWeight": 0.5
    })
}

async fn mock_task_created(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/api/v1/generate")
        .match_header("authorization", "Bearer suno-key")
        .match_body(Matcher::PartialJson(json!({
            "prompt": "slow synthwave with rain",
            "customMode": false,
            "instrumental": true,
            "negativeTags": "metal",
            "callBackUrl": "https://example.com/callback"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "code": 200, "msg": "success", "data": { "taskId": "task-1" } }).to_string())
        .create_async()
        .await
}

fn record_info_path() -> Matcher {
    Matcher::Regex(r"^/api/v1/generate/record-info".into())
}

#[tokio::test]
async fn test_suno_submits_polls_and_downloads_tracks() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let create = mock_task_created(&mut server).await;
    let poll = server
        .mock("GET", record_info_path())
        .match_query(Matcher::UrlEncoded("taskId".into(), "task-1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "code": 200,
                "data": {
                    "status": "SUCCESS",
                    "response": { "sunoData": [
                        { "title": "Neon Rain", "audioUrl": format!("{}/audio/1.mp3", base) },
                        { "title": "Neon Rain / Alt", "audioUrl": format!("{}/audio/2.mp3", base) }
                    ]}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _mock = server
        .mock("GET", Matcher::Regex(r"^/audio/".into()))
        .with_status(200)
        .with_body(b"ID3-fake-audio")
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let publisher = SunoPublisher::new(suno_settings(base, 3), dir.path()).unwrap();
    let published = publisher.publish(&song()).await.unwrap();

    assert_eq!(published.titles, vec!["Neon Rain", "Neon Rain / Alt"]);
    assert_eq!(published.files[0], dir.path().join("Neon_Rain.mp3"));
    assert_eq!(published.files[1], dir.path().join("Neon_Rain_-_Alt.mp3"));
    assert_eq!(std::fs::read(&published.files[0]).unwrap(), b"ID3-fake-audio");
    create.assert_async().await;
    poll.assert_async().await;
}

#[tokio::test]
async fn test_suno_variants_sharing_a_title_get_distinct_files() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let _create = mock_task_created(&mut server).await;
    let _poll = server
        .mock("GET", record_info_path())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "code": 200,
                "data": {
                    "status": "SUCCESS",
                    "response": { "sunoData": [
                        { "title": "Neon Rain", "audioUrl": format!("{}/audio/1.mp3", base) },
                        { "title": "Neon Rain", "audioUrl": format!("{}/audio/2.mp3", base) }
                    ]}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _first = server
        .mock("GET", "/audio/1.mp3")
        .with_status(200)
        .with_body(b"first")
        .create_async()
        .await;
    let _second = server
        .mock("GET", "/audio/2.mp3")
        .with_status(200)
        .with_body(b"second")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let publisher = SunoPublisher::new(suno_settings(base, 3), dir.path()).unwrap();
    let published = publisher.publish(&song()).await.unwrap();

    assert_eq!(published.files[0], dir.path().join("Neon_Rain.mp3"));
    assert_eq!(published.files[1], dir.path().join("Neon_Rain_2.mp3"));
    assert_eq!(std::fs::read(&published.files[0]).unwrap(), b"first");
    assert_eq!(std::fs::read(&published.files[1]).unwrap(), b"second");
}

#[tokio::test]
async fn test_suno_failure_status_stops_polling() {
    let mut server = mockito::Server::new_async().await;
    let _create = mock_task_created(&mut server).await;
    let poll = server
        .mock("GET", record_info_path())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "code": 200,
                "data": { "status": "SENSITIVE_WORD_ERROR", "errorMessage": "blocked word" }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let publisher = SunoPublisher::new(suno_settings(server.url(), 5), dir.path()).unwrap();
    let err = publisher.publish(&song()).await.unwrap_err();

    match err {
        MediaError::TaskFailed { status, message, .. } => {
            assert_eq!(status, "SENSITIVE_WORD_ERROR");
            assert_eq!(message, "blocked word");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    poll.assert_async().await;
}

#[tokio::test]
async fn test_suno_poll_budget_exhausted() {
    let mut server = mockito::Server::new_async().await;
    let _create = mock_task_created(&mut server).await;
    let poll = server
        .mock("GET", record_info_path())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "code": 200, "data": { "status": "PENDING" } }).to_string())
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let publisher = SunoPublisher::new(suno_settings(server.url(), 2), dir.path()).unwrap();
    let err = publisher.publish(&song()).await.unwrap_err();

    assert!(matches!(err, MediaError::PollTimeout { attempts: 2, .. }));
    poll.assert_async().await;
}

#[tokio::test]
async fn test_suno_rejected_submission() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/v1/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "code": 429, "msg": "insufficient credits" }).to_string())
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let publisher = SunoPublisher::new(suno_settings(server.url(), 1), dir.path()).unwrap();
    let err = publisher.publish(&song()).await.unwrap_err();

    assert!(err.to_string().contains("insufficient credits"));
}

fn voice_settings(base_url: String) -> VoiceSettings {
    VoiceSettings {
        api_key: Some("el-key".into()),
        voice_id: Some("voice-1".into()),
        base_url,
        ..VoiceSettings::default()
    }
}

#[tokio::test]
async fn test_voice_synthesis_writes_prefixed_mp3() {
    let mut server = mockito::Server::new_async().await;
    let tts = server
        .mock("POST", "/v1/text-to-speech/voice-1")
        .match_header("xi-api-key", "el-key")
        .match_body(Matcher::PartialJson(json!({
            "text": "Good evening.",
            "model_id": "eleven_multilingual_v2"
        })))
        .with_status(200)
        .with_header("content-type", "audio/mpeg")
        .with_body(b"mp3-bytes")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let synth = VoiceSynthesizer::new(voice_settings(server.url()), dir.path())
        .unwrap()
        .with_file_prefix("Web3");
    let published = synth
        .publish(&json!({ "title": "Tonight", "content": "Good evening." }))
        .await
        .unwrap();

    let file = &published.files[0];
    let name = file.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Web3_"));
    assert!(name.ends_with(".mp3"));
    assert_eq!(std::fs::read(file).unwrap(), b"mp3-bytes");
    assert_eq!(published.titles, vec!["Tonight"]);
    tts.assert_async().await;
}

#[tokio::test]
async fn test_voice_error_status_is_surfaced() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/text-to-speech/voice-1")
        .with_status(401)
        .with_body("invalid key")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let synth = VoiceSynthesizer::new(voice_settings(server.url()), dir.path()).unwrap();
    let err = synth.publish(&json!({ "content": "hi" })).await.unwrap_err();

    assert!(matches!(err, MediaError::Status { status: 401, .. }));
}

#[test]
fn test_voice_requires_voice_id() {
    let settings = VoiceSettings {
        api_key: Some("el-key".into()),
        ..VoiceSettings::default()
    };
    assert!(matches!(
        VoiceSynthesizer::new(settings, "out"),
        Err(MediaError::NotConfigured("ELEVENLABS_VOICE_ID"))
    ));
}
