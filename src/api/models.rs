use chrono::NaiveDate;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use url::Url;

/// Decoded image bytes shared between the loader, the owning article and the UI.
pub type ImageBytes = Arc<[u8]>;

// ============================================================================
// List Identifier
// ============================================================================

/// One of the three ranking categories served by the API.
///
/// Determines the request endpoint and keys the response cache, the
/// in-flight fetch map and the per-list controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListId {
    Emailed,
    Shared,
    Viewed,
}

impl ListId {
    /// All lists in tab order.
    pub const ALL: [ListId; 3] = [ListId::Emailed, ListId::Shared, ListId::Viewed];

    /// Path segment used in the request URL.
    pub fn segment(self) -> &'static str {
        match self {
            ListId::Emailed => "emailed",
            ListId::Shared => "shared",
            ListId::Viewed => "viewed",
        }
    }

    /// Tab title shown by the presentation layer.
    pub fn title(self) -> &'static str {
        match self {
            ListId::Emailed => "Most Emailed",
            ListId::Shared => "Most Shared",
            ListId::Viewed => "Most Viewed",
        }
    }

    /// Position in [`ListId::ALL`], used to index per-list arrays.
    pub fn index(self) -> usize {
        match self {
            ListId::Emailed => 0,
            ListId::Shared => 1,
            ListId::Viewed => 2,
        }
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

impl FromStr for ListId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emailed" => Ok(ListId::Emailed),
            "shared" => Ok(ListId::Shared),
            "viewed" => Ok(ListId::Viewed),
            other => Err(format!(
                "unknown list '{other}' (expected emailed, shared or viewed)"
            )),
        }
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Full decoded response for one list identifier.
///
/// Immutable once constructed; shared as `Arc<ArticleCollection>` between
/// the response cache, coalesced fetch waiters and the controller.
#[derive(Debug, Clone)]
pub struct ArticleCollection {
    pub status: String,
    pub copyright: String,
    /// Result count declared by the API (may differ from `results.len()`).
    pub num_results: u64,
    pub results: Vec<Arc<Article>>,
}

// ============================================================================
// Article
// ============================================================================

/// Identity key of an article, used for diffing, equality and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticleId(pub u64);

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ranked article.
///
/// Equality and hashing consider only `id`: two instances with the same id
/// are interchangeable for diffing even if other fields differ.
///
/// The image slot is written at most once (see [`Article::store_image`]) and
/// is never cleared, so every later render reuses the first loaded bytes.
#[derive(Debug)]
pub struct Article {
    pub id: ArticleId,
    pub url: Url,
    pub source: String,
    pub published_date: NaiveDate,
    pub title: String,
    pub r#abstract: String,
    pub section: String,
    pub byline: String,
    pub media: Vec<Media>,
    image: OnceLock<ImageBytes>,
}

impl Article {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ArticleId,
        url: Url,
        source: String,
        published_date: NaiveDate,
        title: String,
        r#abstract: String,
        section: String,
        byline: String,
        media: Vec<Media>,
    ) -> Self {
        Self {
            id,
            url,
            source,
            published_date,
            title,
            r#abstract,
            section,
            byline,
            media,
            image: OnceLock::new(),
        }
    }

    /// Cached image bytes, if an image load has completed for this article.
    pub fn image(&self) -> Option<&ImageBytes> {
        self.image.get()
    }

    /// Memoize loaded image bytes.
    ///
    /// Only the first successful write sticks; later writers (duplicate
    /// loads racing for the same article) get the stored bytes back.
    pub fn store_image(&self, bytes: ImageBytes) -> ImageBytes {
        Arc::clone(self.image.get_or_init(|| bytes))
    }

    /// The first media item and its `medium440` variant, if present.
    pub fn lead_image(&self) -> Option<(&Media, &MediaVariant)> {
        let media = self.media.first()?;
        let variant = media
            .variants
            .iter()
            .find(|v| v.format == ImageFormat::Medium440)?;
        Some((media, variant))
    }

    /// Publication date for the detail view, e.g. "June 17, 2020".
    pub fn pretty_date(&self) -> String {
        self.published_date.format("%B %-d, %Y").to_string()
    }

    /// True if every displayed field matches `other`.
    ///
    /// Used by the snapshot engine to decide whether a surviving row needs a
    /// reload; identity is still decided by `id` alone.
    pub fn same_content(&self, other: &Article) -> bool {
        self.title == other.title
            && self.r#abstract == other.r#abstract
            && self.section == other.section
            && self.byline == other.byline
            && self.published_date == other.published_date
            && self.url == other.url
            && self.media == other.media
    }
}

impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Article {}

impl Hash for Article {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// Media
// ============================================================================

/// A media attachment with its rendition variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub caption: String,
    pub copyright: String,
    pub variants: Vec<MediaVariant>,
}

/// One rendition of a media item (`media-metadata` entry in the API).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaVariant {
    pub url: Url,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Rendition format tags used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Thumbnail,
    Medium210,
    Medium440,
}

impl ImageFormat {
    pub fn from_api(tag: &str) -> Option<Self> {
        match tag {
            "Standard Thumbnail" => Some(ImageFormat::Thumbnail),
            "mediumThreeByTwo210" => Some(ImageFormat::Medium210),
            "mediumThreeByTwo440" => Some(ImageFormat::Medium440),
            _ => None,
        }
    }
}

// ============================================================================
// Row View-Model
// ============================================================================

/// What the presentation layer needs to paint one list row.
#[derive(Debug, Clone)]
pub struct ArticleRow {
    pub id: ArticleId,
    pub title: String,
    pub r#abstract: String,
    pub section: String,
    /// Loaded image bytes, `None` while loading, after a failure or without image.
    pub image: Option<ImageBytes>,
    /// Image copyright, present only when the article has a displayable image.
    pub copyright: Option<String>,
}

impl From<&Article> for ArticleRow {
    fn from(article: &Article) -> Self {
        let copyright = article
            .lead_image()
            .map(|(media, _)| media.copyright.clone());
        Self {
            id: article.id,
            title: article.title.clone(),
            r#abstract: article.r#abstract.clone(),
            section: article.section.clone(),
            image: article.image().cloned(),
            copyright,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Article with one `medium440` image at `image_url`.
    pub fn article_with_image(id: u64, title: &str, image_url: &str) -> Article {
        Article::new(
            ArticleId(id),
            Url::parse(&format!("https://www.example.com/{id}.html")).unwrap(),
            "Example Times".to_string(),
            NaiveDate::from_ymd_opt(2020, 6, 17).unwrap(),
            title.to_string(),
            format!("Abstract for {title}"),
            "U.S.".to_string(),
            "By Someone".to_string(),
            vec![Media {
                caption: "Caption".to_string(),
                copyright: "Photo Agency".to_string(),
                variants: vec![
                    MediaVariant {
                        url: Url::parse("https://static.example.com/thumb.jpg").unwrap(),
                        format: ImageFormat::Thumbnail,
                        width: 75,
                        height: 75,
                    },
                    MediaVariant {
                        url: Url::parse(image_url).unwrap(),
                        format: ImageFormat::Medium440,
                        width: 440,
                        height: 293,
                    },
                ],
            }],
        )
    }

    /// Article without any media.
    pub fn article(id: u64, title: &str) -> Article {
        Article::new(
            ArticleId(id),
            Url::parse(&format!("https://www.example.com/{id}.html")).unwrap(),
            "Example Times".to_string(),
            NaiveDate::from_ymd_opt(2020, 6, 17).unwrap(),
            title.to_string(),
            format!("Abstract for {title}"),
            "U.S.".to_string(),
            "By Someone".to_string(),
            Vec::new(),
        )
    }
}
