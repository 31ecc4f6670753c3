//! JSON decoding for ranked-list responses.
//!
//! The body is parsed into a `serde_json::Value` once and then walked field by
//! field so that a schema mismatch reports the exact offending path, e.g.
//! `results[3].media[0].media-metadata[1].format`.

use super::models::{Article, ArticleCollection, ArticleId, ImageFormat, Media, MediaVariant};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Fixed date format of `published_date` (`yyyy-MM-dd`).
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Schema mismatch in an API response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Decode error at {path}: {message}")]
pub struct DecodeError {
    /// Field path of the offending value (`$` for the document root).
    pub path: String,
    pub message: String,
}

impl DecodeError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Decode a response body into an [`ArticleCollection`].
///
/// # Errors
///
/// Returns [`DecodeError`] if the body is not JSON, a required field is
/// missing or has the wrong type, a date or URL does not parse, a media
/// format tag is unknown, or two articles share an id.
pub fn decode_collection(bytes: &[u8]) -> Result<ArticleCollection, DecodeError> {
    let root: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::new("$", e.to_string()))?;
    let obj = as_object(&root, "$")?;

    let status: String = field(obj, "", "status")?;
    let copyright: String = field(obj, "", "copyright")?;
    let num_results: u64 = field(obj, "", "num_results")?;
    let raw_results = array_field(obj, "", "results")?;

    let mut seen = HashSet::with_capacity(raw_results.len());
    let mut results = Vec::with_capacity(raw_results.len());
    for (i, raw) in raw_results.iter().enumerate() {
        let path = format!("results[{i}]");
        let article = decode_article(raw, &path)?;
        if !seen.insert(article.id) {
            return Err(DecodeError::new(
                join(&path, "id"),
                format!("duplicate article id {}", article.id),
            ));
        }
        results.push(Arc::new(article));
    }

    if results.len() as u64 != num_results {
        tracing::debug!(
            declared = num_results,
            received = results.len(),
            "Result count differs from num_results"
        );
    }

    Ok(ArticleCollection {
        status,
        copyright,
        num_results,
        results,
    })
}

fn decode_article(value: &Value, path: &str) -> Result<Article, DecodeError> {
    let obj = as_object(value, path)?;

    let id: u64 = field(obj, path, "id")?;
    let url = url_field(obj, path, "url")?;
    let source: String = field(obj, path, "source")?;
    let published_date = date_field(obj, path, "published_date")?;
    let title: String = field(obj, path, "title")?;
    let r#abstract: String = field(obj, path, "abstract")?;
    let section: String = field(obj, path, "section")?;
    let byline: String = field(obj, path, "byline")?;

    let media = array_field(obj, path, "media")?
        .iter()
        .enumerate()
        .map(|(i, raw)| decode_media(raw, &format!("{}[{i}]", join(path, "media"))))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Article::new(
        ArticleId(id),
        url,
        source,
        published_date,
        title,
        r#abstract,
        section,
        byline,
        media,
    ))
}

fn decode_media(value: &Value, path: &str) -> Result<Media, DecodeError> {
    let obj = as_object(value, path)?;

    let caption: String = field(obj, path, "caption")?;
    let copyright: String = field(obj, path, "copyright")?;
    let variants = array_field(obj, path, "media-metadata")?
        .iter()
        .enumerate()
        .map(|(i, raw)| decode_variant(raw, &format!("{}[{i}]", join(path, "media-metadata"))))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Media {
        caption,
        copyright,
        variants,
    })
}

fn decode_variant(value: &Value, path: &str) -> Result<MediaVariant, DecodeError> {
    let obj = as_object(value, path)?;

    let url = url_field(obj, path, "url")?;
    let tag: String = field(obj, path, "format")?;
    let format = ImageFormat::from_api(&tag).ok_or_else(|| {
        DecodeError::new(join(path, "format"), format!("unknown media format '{tag}'"))
    })?;
    let height: u32 = field(obj, path, "height")?;
    let width: u32 = field(obj, path, "width")?;

    Ok(MediaVariant {
        url,
        format,
        width,
        height,
    })
}

// ============================================================================
// Field Helpers
// ============================================================================

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, DecodeError> {
    value
        .as_object()
        .ok_or_else(|| DecodeError::new(path, "expected an object"))
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<&'a Value, DecodeError> {
    match obj.get(key) {
        Some(Value::Null) | None => Err(DecodeError::new(join(parent, key), "missing field")),
        Some(v) => Ok(v),
    }
}

fn field<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<T, DecodeError> {
    let value = required(obj, parent, key)?;
    T::deserialize(value).map_err(|e| DecodeError::new(join(parent, key), e.to_string()))
}

fn array_field<'a>(
    obj: &'a Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<&'a Vec<Value>, DecodeError> {
    required(obj, parent, key)?
        .as_array()
        .ok_or_else(|| DecodeError::new(join(parent, key), "expected an array"))
}

fn url_field(obj: &Map<String, Value>, parent: &str, key: &str) -> Result<Url, DecodeError> {
    let raw: String = field(obj, parent, key)?;
    Url::parse(&raw).map_err(|e| DecodeError::new(join(parent, key), format!("invalid URL: {e}")))
}

fn date_field(
    obj: &Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<NaiveDate, DecodeError> {
    let raw: String = field(obj, parent, key)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
        DecodeError::new(
            join(parent, key),
            format!("invalid date '{raw}' (expected yyyy-MM-dd): {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn article_json(id: u64) -> Value {
        json!({
            "url": format!("https://www.example.com/2020/06/17/{id}.html"),
            "id": id,
            "source": "Example Times",
            "published_date": "2020-06-17",
            "title": format!("Title {id}"),
            "abstract": format!("Abstract {id}"),
            "section": "World",
            "byline": "By A Reporter",
            "media": [{
                "caption": "A caption",
                "copyright": "Photographer/Agency",
                "media-metadata": [
                    {"url": "https://static.example.com/t.jpg", "format": "Standard Thumbnail", "height": 75, "width": 75},
                    {"url": "https://static.example.com/m.jpg", "format": "mediumThreeByTwo440", "height": 293, "width": 440}
                ]
            }]
        })
    }

    fn body(results: Vec<Value>) -> Vec<u8> {
        let n = results.len();
        serde_json::to_vec(&json!({
            "status": "OK",
            "copyright": "Copyright (c) 2020 Example. All Rights Reserved.",
            "num_results": n,
            "results": results,
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_valid_collection() {
        let collection = decode_collection(&body(vec![article_json(11), article_json(22)])).unwrap();

        assert_eq!(collection.status, "OK");
        assert_eq!(collection.num_results, 2);
        let ids: Vec<u64> = collection.results.iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![11, 22]);

        let first = &collection.results[0];
        assert_eq!(first.published_date, NaiveDate::from_ymd_opt(2020, 6, 17).unwrap());
        assert_eq!(first.media[0].variants.len(), 2);
        assert_eq!(first.media[0].variants[1].format, ImageFormat::Medium440);
        assert!(first.lead_image().is_some());
    }

    #[test]
    fn test_missing_num_results_reports_path() {
        let bytes = serde_json::to_vec(&json!({
            "status": "OK",
            "copyright": "c",
            "results": []
        }))
        .unwrap();
        let err = decode_collection(&bytes).unwrap_err();
        assert_eq!(err.path, "num_results");
    }

    #[test]
    fn test_wrong_type_in_article_reports_path() {
        let mut bad = article_json(3);
        bad["id"] = json!("three");
        let err = decode_collection(&body(vec![article_json(1), bad])).unwrap_err();
        assert_eq!(err.path, "results[1].id");
    }

    #[test]
    fn test_bad_date_reports_path() {
        let mut bad = article_json(3);
        bad["published_date"] = json!("06/17/2020");
        let err = decode_collection(&body(vec![bad])).unwrap_err();
        assert_eq!(err.path, "results[0].published_date");
        assert!(err.message.contains("yyyy-MM-dd"));
    }

    #[test]
    fn test_unknown_media_format_reports_path() {
        let mut bad = article_json(3);
        bad["media"][0]["media-metadata"][1]["format"] = json!("superJumbo");
        let err = decode_collection(&body(vec![bad])).unwrap_err();
        assert_eq!(err.path, "results[0].media[0].media-metadata[1].format");
    }

    #[test]
    fn test_missing_media_metadata_reports_path() {
        let mut bad = article_json(3);
        bad["media"][0]
            .as_object_mut()
            .unwrap()
            .remove("media-metadata");
        let err = decode_collection(&body(vec![bad])).unwrap_err();
        assert_eq!(err.path, "results[0].media[0].media-metadata");
        assert_eq!(err.message, "missing field");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = decode_collection(&body(vec![article_json(7), article_json(7)])).unwrap_err();
        assert_eq!(err.path, "results[1].id");
    }

    #[test]
    fn test_not_json() {
        let err = decode_collection(b"<html>oops</html>").unwrap_err();
        assert_eq!(err.path, "$");
    }

    #[test]
    fn test_empty_media_is_fine() {
        let mut a = article_json(1);
        a["media"] = json!([]);
        let collection = decode_collection(&body(vec![a])).unwrap();
        assert!(collection.results[0].lead_image().is_none());
    }
}
