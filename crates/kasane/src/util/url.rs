use url::Url;

use crate::KasaneResult;

/// Query string of the manifest URL, without the leading `?`.
///
/// Signed URLs carry their auth token here, so it has to follow every sub-resource.
pub fn signing_query(url: &Url) -> Option<&str> {
    url.query().filter(|query| !query.is_empty())
}

/// Resolve `uri` against `base` and re-apply the signing query.
///
/// Examples
///
/// join_with_query(https://example.com/a/master.m3u8?sig=abc, low/index.m3u8, Some("sig=abc")) =>
///   https://example.com/a/low/index.m3u8?sig=abc
///
/// join_with_query(https://example.com/a/index.m3u8, seg.ts?part=1, None) =>
///   https://example.com/a/seg.ts?part=1
///
/// When a signing query is present it replaces whatever query `uri` carried.
pub fn join_with_query(base: &Url, uri: &str, query: Option<&str>) -> KasaneResult<Url> {
    let mut url = base.join(uri)?;
    if let Some(query) = query.filter(|query| !query.is_empty()) {
        url.set_query(Some(query));
    }
    Ok(url)
}

/// The HLS `-split.m3u8` manifests of some hosts list tracks that cannot be fetched
/// individually; the combined manifest next to them can.
pub fn unsplit_manifest_url(url: &str) -> Option<String> {
    url.contains("-split.m3u8")
        .then(|| url.replace("-split.m3u8", ".m3u8"))
}
