use regex::Regex;
use std::sync::LazyLock;

use super::{AdaptationSet, DashManifest, ParsedManifest, Representation};
use crate::{util::xml::attribute, TrackKind};

static ADAPTATION_SET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<AdaptationSet\b([^>]*?)contentType="(audio|video)"([^>]*?)>(.*?)</AdaptationSet>"#)
        .unwrap()
});

static REPRESENTATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<Representation\b([^>]*?)\bbandwidth="(\d+)"([^>]*?)(?:/>|>(.*?)</Representation>)"#)
        .unwrap()
});

static SET_TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<SegmentTemplate\b[^>]*?/>|<SegmentTemplate\b[^>]*>.*?</SegmentTemplate>"#)
        .unwrap()
});

/// Parse the subset of an MPEG-DASH manifest needed to locate segments.
///
/// Only `audio` and `video` adaptation sets are kept. A missing adaptation set of either
/// type is not an error here; callers decide whether the result is usable.
pub fn parse_mpd(text: &str) -> ParsedManifest {
    let adaptation_sets: Vec<_> = ADAPTATION_SET_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let content_type = TrackKind::from_content_type(&caps[2])?;
            Some(parse_adaptation_set(content_type, &caps[4]))
        })
        .collect();

    tracing::debug!(
        "Parsed MPD: audio sets: {}, video sets: {}",
        count(&adaptation_sets, TrackKind::Audio),
        count(&adaptation_sets, TrackKind::Video)
    );

    ParsedManifest::Dash(DashManifest { adaptation_sets })
}

fn parse_adaptation_set(content_type: TrackKind, content: &str) -> AdaptationSet {
    let mut representations: Vec<_> = REPRESENTATION_REGEX
        .captures_iter(content)
        .filter_map(|caps| {
            let bandwidth = caps[2].parse().ok()?;
            let id = attribute(&caps[1], "id")
                .or_else(|| attribute(&caps[3], "id"))
                .map(|id| id.into_owned());
            Some(Representation {
                id,
                bandwidth,
                body: caps.get(4).map_or("", |m| m.as_str()).to_string(),
            })
        })
        .collect();
    // stable, so equal bandwidths keep document order
    representations.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));

    // a template before the first representation belongs to the adaptation set
    let head = match content.find("<Representation") {
        Some(end) => &content[..end],
        None => content,
    };
    let segment_template = SET_TEMPLATE_REGEX
        .find(head)
        .map(|m| m.as_str().to_string());

    AdaptationSet {
        content_type,
        segment_template,
        representations,
    }
}

fn count(sets: &[AdaptationSet], kind: TrackKind) -> usize {
    sets.iter().filter(|set| set.content_type == kind).count()
}
