//! Image URL detection for document previews.

use reqwest::Url;
use serde_json::Value;

const PICTURE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".gif", ".png", ".webp"];

/// Returns whether `value` is an `http`/`https` URL pointing at an image.
///
/// Only the path is checked, so query strings do not matter. Unparsable URLs
/// are not pictures.
#[must_use]
pub fn looks_like_a_picture_url(value: &Value) -> bool {
    let Some(text) = value.as_str() else {
        return false;
    };
    if !text.starts_with("http") {
        return false;
    }
    Url::parse(text).is_ok_and(|url| {
        let path = url.path().to_lowercase();
        PICTURE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!("https://image.tmdb.org/t/p/w500/poster.jpg"), true ; "jpg")]
    #[test_case(json!("http://cdn.example.com/a/B.PNG?size=large"), true ; "uppercase with query")]
    #[test_case(json!("https://example.com/cat.webp"), true ; "webp")]
    #[test_case(json!("https://example.com/page.html"), false ; "html")]
    #[test_case(json!("https://example.com/?file=a.jpg"), false ; "extension in query only")]
    #[test_case(json!("ftp://example.com/a.jpg"), false ; "not http")]
    #[test_case(json!("http://"), false ; "unparsable")]
    #[test_case(json!(42), false ; "number")]
    #[test_case(Value::Null, false ; "null")]
    fn test_looks_like_a_picture_url(value: Value, expected: bool) {
        assert_eq!(looks_like_a_picture_url(&value), expected);
    }
}
