use regex::Regex;
use std::{borrow::Cow, sync::LazyLock};

static ATTRIBUTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z_][\w:.-]*)\s*=\s*"([^"]*)""#).unwrap());

/// Look up `name` among the attributes of a start tag, e.g. ` id="1" bandwidth="500"`.
///
/// Entity references in the value are decoded.
pub fn attribute<'a>(attributes: &'a str, name: &str) -> Option<Cow<'a, str>> {
    ATTRIBUTE_REGEX
        .captures_iter(attributes)
        .find(|caps| &caps[1] == name)
        .and_then(|caps| caps.get(2))
        .map(|value| unescape(value.as_str()))
}

/// Decode the five predefined XML entities. `&amp;` is very common in signed segment URLs.
pub fn unescape(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    Cow::Owned(
        value
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&"),
    )
}
