use kasane::{
    manifest::{parse_m3u8, ParsedManifest},
    resolve::resolve,
    HostIo, KasaneError,
};
use url::Url;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use crate::common::{init_tracing, local_host, ServerMock};

async fn resolve_url(
    host: &impl HostIo,
    url: &Url,
) -> kasane::KasaneResult<kasane::resolve::ResolvedSegmentSet> {
    let text = host.fetch_text(url).await?;
    let manifest = parse_m3u8(&text);
    resolve(host, &manifest, url).await
}

#[tokio::test]
async fn test_master_playlist_signed_query() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    server
        .mock(
            "/master.m3u8",
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nvariant.m3u8\n",
        )
        .await;
    Mock::given(method("GET"))
        .and(path("/variant.m3u8"))
        .and(query_param("sig", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "#EXTM3U\n#EXTINF:4,\nseg0.ts\n#EXTINF:4,\nseg1.ts?cache=1\n#EXT-X-ENDLIST\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let host = local_host(dir.path());
    let url = Url::parse(&format!("{}/master.m3u8?sig=abc", server.uri()))?;
    let segments = resolve_url(&host, &url).await?;

    assert!(segments.audio.is_empty());
    let video: Vec<_> = segments.video.iter().map(Url::as_str).collect();
    assert_eq!(
        video,
        [
            format!("{}/seg0.ts?sig=abc", server.uri()),
            format!("{}/seg1.ts?sig=abc", server.uri()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_master_playlist_groups_tracks_in_order() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock("/stream/master.m3u8", include_str!("../fixtures/hls/master.m3u8"))
        .await
        .mock("/stream/audio/main.m3u8", include_str!("../fixtures/hls/main.m3u8"))
        .await
        .mock(
            "/stream/audio/commentary.m3u8",
            include_str!("../fixtures/hls/commentary.m3u8"),
        )
        .await
        .mock("/stream/video/1080p.m3u8", include_str!("../fixtures/hls/1080p.m3u8"))
        .await
        .mock("/stream/video/720p.m3u8", include_str!("../fixtures/hls/720p.m3u8"))
        .await;

    let dir = tempfile::tempdir()?;
    let host = local_host(dir.path());
    let url = Url::parse(&format!("{}/stream/master.m3u8", server.uri()))?;
    let segments = resolve_url(&host, &url).await?;

    let names = |urls: &[Url]| -> Vec<String> {
        urls.iter()
            .map(|url| url.path().trim_start_matches("/stream/").to_string())
            .collect()
    };
    assert_eq!(
        names(&segments.audio),
        ["audio/main-0.aac", "audio/main-1.aac", "audio/commentary-0.aac"]
    );
    assert_eq!(
        names(&segments.video),
        ["video/1080p-0.ts", "video/1080p-1.ts", "video/1080p-2.ts", "video/720p-0.ts"]
    );
    assert!(segments.is_split());
    assert!(segments.audio.iter().all(|url| url.query().is_none()));
    Ok(())
}

#[tokio::test]
async fn test_sub_playlist_failure_aborts_resolution() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock("/master.m3u8", "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nmissing.m3u8\n")
        .await
        .mock_status("/missing.m3u8", 404)
        .await;

    let dir = tempfile::tempdir()?;
    let host = local_host(dir.path());
    let url = Url::parse(&format!("{}/master.m3u8", server.uri()))?;
    let result = resolve_url(&host, &url).await;

    assert!(matches!(
        result,
        Err(KasaneError::HttpError(status)) if status.as_u16() == 404
    ));
    Ok(())
}

#[test]
fn test_parse_is_pure() {
    let text = include_str!("../fixtures/hls/master.m3u8");
    let first = parse_m3u8(text);
    let second = parse_m3u8(text);
    assert_eq!(first, second);
    assert!(matches!(first, ParsedManifest::HlsMaster(_)));
}
