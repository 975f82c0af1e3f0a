use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_RATING: f64 = 4.2;
pub const DEFAULT_GENRE: &str = "News";
pub const LIVE_DURATION: &str = "Live";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Series,
    Live,
}

/// A catalog item as the storefront displays it.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub price: u64,
    pub rating: f64,
    pub image: String,
    pub description: String,
    pub duration: String,
    pub genre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// A channel record as the catalog API returns it. Everything but the id may
/// be missing, null or of the wrong type; such fields count as missing.
#[derive(Debug, Clone, Default, PartialEq)]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChannel {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<u64>,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub logo: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default)]
    pub created_at: Option<Value>,
}

impl RawChannel {
    pub fn into_content_item(self) -> ContentItem {
        let year = self.created_at.as_ref().and_then(year_of);
        ContentItem {
            id: self.id,
            title: self.name.unwrap_or_default(),
            kind: ContentKind::Live,
            price: self.price.unwrap_or(0),
            rating: self.rating.unwrap_or(DEFAULT_RATING),
            image: non_empty(self.logo).unwrap_or_default(),
            description: non_empty(self.description).unwrap_or_default(),
            duration: LIVE_DURATION.to_string(),
            genre: non_empty(self.category).unwrap_or_else(|| DEFAULT_GENRE.to_string()),
            year,
        }
    }
}

// empty strings count as missing for the text fields
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Calendar year of a `createdAt` value: an RFC 3339 timestamp, a bare
/// `YYYY-MM-DD` date or epoch milliseconds.
fn year_of(value: &Value) -> Option<i32> {
    match value {
        Value::String(s) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                return Some(parsed.with_timezone(&Utc).year());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(|d| d.year())
        }
        Value::Number(n) => {
            let millis = n.as_i64()?;
            Utc.timestamp_millis_opt(millis).single().map(|d| d.year())
        }
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
    where D: Deserializer<'de> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid channel id {other}"))),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where D: Deserializer<'de> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Prices are whole credits. A fractional price is rounded up; a negative or
/// non-numeric one counts as missing.
fn lenient_price<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where D: Deserializer<'de> {
    let Value::Number(n) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(whole) = n.as_u64() {
        return Ok(Some(whole));
    }
    Ok(n.as_f64()
        .filter(|p| p.is_finite() && *p >= 0.0)
        .map(|p| p.ceil() as u64))
}

fn lenient_rating<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where D: Deserializer<'de> {
    let rating = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(rating.filter(|r| r.is_finite()))
}
