use kasane::{
    manifest::{parse_mpd, ParsedManifest},
    resolve::resolve_dash,
    KasaneError,
};
use url::Url;

fn manifest(text: &str) -> kasane::manifest::DashManifest {
    match parse_mpd(text) {
        ParsedManifest::Dash(manifest) => manifest,
        other => panic!("expected a DASH manifest, got {other:?}"),
    }
}

#[test]
fn test_highest_bandwidth_is_selected() -> anyhow::Result<()> {
    let base = Url::parse("https://cdn.example/v/manifest.mpd?token=t")?;
    let mpd = manifest(include_str!("../fixtures/dash/bandwidth.mpd"));
    let segments = resolve_dash(&mpd, &base, Some("token=t"))?;

    let video: Vec<_> = segments.video.iter().map(Url::as_str).collect();
    assert_eq!(
        video,
        [
            "https://cdn.example/v/video-1500/init.webm?token=t",
            "https://cdn.example/v/video-1500/001.webm?token=t",
            "https://cdn.example/v/video-1500/002.webm?token=t",
        ]
    );
    assert!(segments.audio.is_empty());
    Ok(())
}

#[test]
fn test_inherited_template_and_segment_list() -> anyhow::Result<()> {
    let base = Url::parse("https://cdn.example/v/manifest.mpd")?;
    let mpd = manifest(include_str!("../fixtures/dash/split.mpd"));
    let segments = resolve_dash(&mpd, &base, None)?;

    let video: Vec<_> = segments.video.iter().map(|url| url.path()).collect();
    assert_eq!(
        video,
        [
            "/v/video/init.webm",
            "/v/video/5.webm",
            "/v/video/6.webm",
            "/v/video/7.webm",
            "/v/video/8.webm",
        ]
    );

    let audio: Vec<_> = segments.audio.iter().map(|url| url.path()).collect();
    assert_eq!(audio, ["/v/audio/init.webm", "/v/audio/1.webm", "/v/audio/2.webm"]);
    Ok(())
}

#[test]
fn test_missing_video_set_is_rejected() -> anyhow::Result<()> {
    let base = Url::parse("https://cdn.example/a.mpd")?;
    let mpd = manifest(
        r#"<MPD><Period><AdaptationSet contentType="audio"><Representation bandwidth="1"><BaseURL>a.webm</BaseURL></Representation></AdaptationSet></Period></MPD>"#,
    );
    assert!(matches!(
        resolve_dash(&mpd, &base, None),
        Err(KasaneError::NoVideoAdaptationSet)
    ));
    Ok(())
}
