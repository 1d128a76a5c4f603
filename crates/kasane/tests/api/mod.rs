use kasane::{
    api::{ManifestUrlResolver, SessionApiResolver},
    util::http::HttpClient,
    KasaneError,
};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

const VIDEO_ID: &str = "0123456789abcdef0123456789abcdef";

async fn mock_metadata(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mock_session(server: &MockServer, endpoint: &str, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/api/campaigns/sessions/{VIDEO_ID}/{endpoint}")))
        .and(body_partial_json(json!({ "deviceID": null, "force_original": false })))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

fn resolver(server: &MockServer) -> anyhow::Result<SessionApiResolver> {
    Ok(SessionApiResolver::with_base_url(
        HttpClient::default(),
        &server.uri(),
    )?)
}

#[tokio::test]
async fn test_transcoded_url_fallback() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mock_metadata(
        &server,
        json!([{ "data": { "getVideo": {
            "__typename": "RegularUserVideo",
            "name": "Team Sync: Week 3",
        }}}]),
    )
    .await;
    mock_session(&server, "raw-url", ResponseTemplate::new(204), 1).await;
    mock_session(
        &server,
        "transcoded-url",
        ResponseTemplate::new(200).set_body_json(json!({ "url": "https://cdn.example/a/playlist.m3u8?Policy=p" })),
        1,
    )
    .await;

    let asset = resolver(&server)?
        .resolve_manifest_url(&format!("https://www.loom.com/share/{VIDEO_ID}"), None)
        .await?;
    assert_eq!(
        asset.manifest_url.as_str(),
        "https://cdn.example/a/playlist.m3u8?Policy=p"
    );
    assert_eq!(asset.title.as_deref(), Some("Team Sync: Week 3"));
    assert_eq!(asset.file_name(), "team_sync__week_3.mp4");
    Ok(())
}

#[tokio::test]
async fn test_raw_url_preferred() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mock_metadata(
        &server,
        json!([{ "data": { "getVideo": { "__typename": "RegularUserVideo", "name": "demo" }}}]),
    )
    .await;
    mock_session(
        &server,
        "raw-url",
        ResponseTemplate::new(200).set_body_json(json!({ "url": "https://cdn.example/raw.mpd" })),
        1,
    )
    .await;
    mock_session(&server, "transcoded-url", ResponseTemplate::new(204), 0).await;

    let asset = resolver(&server)?
        .resolve_manifest_url(&format!("https://www.loom.com/embed/{VIDEO_ID}"), None)
        .await?;
    assert_eq!(asset.manifest_url.as_str(), "https://cdn.example/raw.mpd");
    Ok(())
}

#[tokio::test]
async fn test_password_required() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mock_metadata(
        &server,
        json!([{ "data": { "getVideo": {
            "__typename": "VideoPasswordMissingOrIncorrect",
            "message": "password required",
        }}}]),
    )
    .await;
    mock_session(&server, "raw-url", ResponseTemplate::new(204), 0).await;

    let result = resolver(&server)?
        .resolve_manifest_url(&format!("https://www.loom.com/share/{VIDEO_ID}"), Some("nope"))
        .await;
    assert!(matches!(result, Err(KasaneError::PasswordRequired)));
    Ok(())
}

#[tokio::test]
async fn test_no_download_url() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mock_metadata(
        &server,
        json!([{ "data": { "getVideo": { "__typename": "RegularUserVideo", "name": "x" }}}]),
    )
    .await;
    mock_session(&server, "raw-url", ResponseTemplate::new(204), 1).await;
    mock_session(&server, "transcoded-url", ResponseTemplate::new(500), 1).await;

    let result = resolver(&server)?
        .resolve_manifest_url(&format!("https://www.loom.com/share/{VIDEO_ID}"), None)
        .await;
    assert!(matches!(result, Err(KasaneError::VideoNotFound)));
    Ok(())
}

#[tokio::test]
async fn test_invalid_share_link() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let result = resolver(&server)?
        .resolve_manifest_url("https://www.loom.com/looms/videos", None)
        .await;
    assert!(matches!(result, Err(KasaneError::InvalidShareUrl(_))));
    Ok(())
}
