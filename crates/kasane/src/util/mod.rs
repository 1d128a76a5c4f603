pub mod http;
pub mod url;
pub mod xml;

/// Replace every character outside `[a-z0-9]` with `_` and lowercase the rest.
pub fn sanitize_file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// `video.mp4` + `_audio`, `webm` -> `video_audio.webm`
pub fn file_name_with_suffix(file_name: &str, suffix: &str, extension: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    format!("{stem}{suffix}.{extension}")
}
