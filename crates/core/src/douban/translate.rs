//! Translation from a Douban book record to the canonical [`Metadata`].

use crate::date::parse_date;
use crate::douban::model::{RatingValue, RemoteBook};
use crate::error::LookupError;
use crate::metadata::Metadata;

/// Identifier scheme under which the Douban subject id is stored.
pub const DOUBAN_IDENTIFIER: &str = "douban";

/// Map one remote record onto the host schema.
///
/// `rating.average` is required: a record without it is rejected rather than
/// given a made-up score. Optional fields (`subtitle`, `series`, `tags`) are
/// simply left unset when absent.
pub fn to_metadata(book: &RemoteBook) -> Result<Metadata, LookupError> {
    let authors = book
        .author
        .clone()
        .map(|a| a.into_vec())
        .unwrap_or_default();
    let mut mi = Metadata::new(book.title.clone().unwrap_or_default(), authors);

    if let Some(subtitle) = book.subtitle.as_deref().filter(|s| !s.is_empty()) {
        mi.title.push_str(": ");
        mi.title.push_str(subtitle);
    }

    mi.publisher = book.publisher.clone();
    mi.pubdate = book.pubdate.as_deref().and_then(parse_date);
    mi.comments = book.summary.clone();
    mi.tags = book.tags.iter().map(|t| t.name.clone()).collect();

    mi.identifiers.clear();
    if let Some(id) = &book.id {
        mi.set_identifier(DOUBAN_IDENTIFIER, id.clone());
    }

    mi.rating = Some(average(book)? / 2.0);
    mi.series = book.series.as_ref().and_then(|s| s.title.clone());
    mi.isbn = book.isbn13.clone();

    Ok(mi)
}

/// The source's 0-10 average score.
fn average(book: &RemoteBook) -> Result<f64, LookupError> {
    let value = book
        .rating
        .as_ref()
        .and_then(|r| r.average.as_ref())
        .ok_or(LookupError::MissingField("rating.average"))?;

    match value {
        RatingValue::Number(n) => Ok(*n),
        RatingValue::Text(s) => s.trim().parse::<f64>().map_err(|_| LookupError::InvalidField {
            field: "rating.average",
            value: s.clone(),
        }),
    }
}
