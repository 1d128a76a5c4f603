use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use super::{template::Template, ResolvedSegmentSet};
use crate::{
    manifest::{AdaptationSet, DashManifest, Representation},
    util::{url::join_with_query, xml::attribute},
    KasaneError, KasaneResult, TrackKind,
};

/// Upper bound on the segments a single timeline may expand to.
const MAX_TIMELINE_SEGMENTS: u64 = 1_000_000;

static TEMPLATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<SegmentTemplate\b([^>]*)>").unwrap());
static TIMELINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<SegmentTimeline\b[^>]*>(.*?)</SegmentTimeline>").unwrap());
static TIMELINE_ENTRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<S\b([^>]*?)/?>").unwrap());
static INITIALIZATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Initialization\b([^>]*)>").unwrap());
static SEGMENT_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<SegmentURL\b([^>]*)>").unwrap());
static BASE_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<BaseURL\b[^>]*>(.*?)</BaseURL>").unwrap());

/// Resolve the highest-bandwidth video representation and, when present, the
/// highest-bandwidth audio representation into segment URLs.
///
/// A manifest without a usable video adaptation set is rejected; audio is optional.
pub fn resolve_dash(
    manifest: &DashManifest,
    manifest_url: &Url,
    query: Option<&str>,
) -> KasaneResult<ResolvedSegmentSet> {
    let (video_set, video_representation) = best_of(manifest, TrackKind::Video)
        .ok_or(KasaneError::NoVideoAdaptationSet)?;

    let video = extract_segments(
        video_representation,
        video_set.segment_template.as_deref(),
        manifest_url,
        query,
    )?;
    tracing::info!(
        "Found {} video segments (bandwidth {})",
        video.len(),
        video_representation.bandwidth
    );

    let audio = match best_of(manifest, TrackKind::Audio) {
        Some((audio_set, audio_representation)) => {
            let audio = extract_segments(
                audio_representation,
                audio_set.segment_template.as_deref(),
                manifest_url,
                query,
            )?;
            tracing::info!(
                "Found {} audio segments (bandwidth {})",
                audio.len(),
                audio_representation.bandwidth
            );
            audio
        }
        None => Vec::new(),
    };

    Ok(ResolvedSegmentSet { audio, video })
}

fn best_of(manifest: &DashManifest, kind: TrackKind) -> Option<(&AdaptationSet, &Representation)> {
    let set = manifest.adaptation_set(kind)?;
    Some((set, set.best_representation()?))
}

/// Extract the segment URLs of one representation.
///
/// A `SegmentTemplate` (the representation's own, else the one inherited from its adaptation
/// set) yields the initialization segment followed by one media segment per timeline entry
/// and repeat. Without a template, `SegmentList` entries are used, and a bare `BaseURL`
/// is taken as the only segment.
pub fn extract_segments(
    representation: &Representation,
    inherited_template: Option<&str>,
    base: &Url,
    query: Option<&str>,
) -> KasaneResult<Vec<Url>> {
    let body = representation.body.as_str();

    let template_scope = if TEMPLATE_REGEX.is_match(body) {
        Some(body)
    } else {
        inherited_template
    };
    if let Some(scope) = template_scope {
        if let Some(urls) = template_segments(representation, scope, base, query)? {
            return Ok(urls);
        }
    }

    list_segments(body, base, query)
}

fn template_segments(
    representation: &Representation,
    scope: &str,
    base: &Url,
    query: Option<&str>,
) -> KasaneResult<Option<Vec<Url>>> {
    let Some(caps) = TEMPLATE_REGEX.captures(scope) else {
        return Ok(None);
    };
    let attributes = &caps[1];
    let Some(media) = attribute(attributes, "media") else {
        return Ok(None);
    };
    let start_number = attribute(attributes, "startNumber")
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(1);

    let mut template = Template::new();
    if let Some(id) = &representation.id {
        template.insert(Template::REPRESENTATION_ID, id.clone());
    }
    template.insert(Template::BANDWIDTH, representation.bandwidth.to_string());

    let mut urls = Vec::new();
    if let Some(initialization) = attribute(attributes, "initialization") {
        urls.push(join_with_query(base, &template.resolve(&initialization), query)?);
    }

    let Some(timeline) = TIMELINE_REGEX.captures(scope) else {
        tracing::warn!("SegmentTemplate without SegmentTimeline, only the initialization segment is used.");
        return Ok(Some(urls));
    };

    // the segment number continues across entries, it never restarts.
    // `None` once a counter has run past u64::MAX
    let mut number = Some(start_number);
    let mut time = Some(0u64);
    for entry in TIMELINE_ENTRY_REGEX.captures_iter(&timeline[1]) {
        let entry = &entry[1];
        if let Some(t) = attribute(entry, "t").and_then(|t| t.parse().ok()) {
            time = Some(t);
        }
        let duration: u64 = attribute(entry, "d")
            .and_then(|d| d.parse().ok())
            .unwrap_or(0);
        // negative repeat counts (repeat until the next entry) are read as no repeat
        let repeat = attribute(entry, "r")
            .and_then(|r| r.parse::<i64>().ok())
            .unwrap_or(0)
            .max(0) as u64;

        if repeat >= MAX_TIMELINE_SEGMENTS || urls.len() as u64 + repeat >= MAX_TIMELINE_SEGMENTS {
            return Err(KasaneError::ManifestFormat(format!(
                "SegmentTimeline expands to more than {MAX_TIMELINE_SEGMENTS} segments"
            )));
        }

        for _ in 0..=repeat {
            let (Some(n), Some(t)) = (number, time) else {
                return Err(KasaneError::ManifestFormat(
                    "SegmentTimeline number or time overflows".to_string(),
                ));
            };
            template.insert(Template::NUMBER, n.to_string());
            template.insert(Template::TIME, t.to_string());
            urls.push(join_with_query(base, &template.resolve(&media), query)?);
            number = n.checked_add(1);
            time = t.checked_add(duration);
        }
    }

    Ok(Some(urls))
}

fn list_segments(body: &str, base: &Url, query: Option<&str>) -> KasaneResult<Vec<Url>> {
    let mut urls = Vec::new();

    if let Some(source) = INITIALIZATION_REGEX
        .captures(body)
        .and_then(|caps| attribute(&caps[1], "sourceURL").map(|s| s.into_owned()))
    {
        urls.push(join_with_query(base, &source, query)?);
    }

    for caps in SEGMENT_URL_REGEX.captures_iter(body) {
        if let Some(media) = attribute(&caps[1], "media") {
            urls.push(join_with_query(base, &media, query)?);
        }
    }

    if urls.is_empty() {
        if let Some(caps) = BASE_URL_REGEX.captures(body) {
            let base_url = caps[1].trim();
            if !base_url.is_empty() {
                urls.push(join_with_query(base, base_url, query)?);
            }
        }
    }

    Ok(urls)
}
