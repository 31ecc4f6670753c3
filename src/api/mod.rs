//! Ranked-list API: data model, response decoding and the list fetcher.

mod decode;
mod fetcher;
mod models;

pub use decode::{decode_collection, DecodeError};
pub use fetcher::{ArticleFetcher, FetchError, TransportError, PERIOD_DAYS};
pub use models::{
    Article, ArticleCollection, ArticleId, ArticleRow, ImageBytes, ImageFormat, ListId, Media,
    MediaVariant,
};

#[cfg(test)]
pub(crate) use models::fixtures;
