//! Upstream offer payload and the flat product shape served to callers.
//!
//! The upstream schema is loose: any field may be absent, null or of an
//! unexpected type. Decoding never fails on a single field; a mismatched
//! field is simply treated as missing and later replaced by its default.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

pub const UNKNOWN_NAME: &str = "Неизвестно";
pub const NO_PRICE: &str = "Не указана";
pub const NO_CATEGORY: &str = "Не указана";
pub const NO_SELLER: &str = "Не указан";
pub const IN_STOCK: &str = "В наличии";
pub const OUT_OF_STOCK: &str = "Нет в наличии";
pub const CURRENCY_SUFFIX: &str = " ₸";

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like `lenient`, but only a JSON object may fill a nested struct. Serde would
/// otherwise fill struct fields positionally from an array.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// Counters arrive as integers or whole floats (`12.0`); anything else is missing.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let count = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f < 9.0e15)
            .map(|f| f as u64)
    });
    Ok(count)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpstreamPayload {
    #[serde(default, deserialize_with = "lenient_object")]
    pub product: Option<UpstreamProduct>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub offer: Option<UpstreamOffer>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub stats: Option<UpstreamStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamProduct {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub reviews_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub category: Option<Named>,
    #[serde(default, deserialize_with = "lenient")]
    pub pictures: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpstreamOffer {
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<Price>,
    #[serde(default)]
    pub available: Option<Value>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub merchant: Option<Named>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpstreamStats {
    #[serde(default, deserialize_with = "lenient_count")]
    pub views: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub favorites: Option<u64>,
}

/// Any `{ "name": ... }` object (category, merchant).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Named {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// Offer prices arrive either as JSON numbers or as preformatted strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Amount(Number),
    Text(String),
}

impl Price {
    /// Renders the price the way it is shown to buyers; zero and blank prices render as `None`.
    pub fn render(&self) -> Option<String> {
        match self {
            Price::Text(s) if s.is_empty() => None,
            Price::Text(s) => Some(s.clone()),
            Price::Amount(n) => {
                if let Some(i) = n.as_i64() {
                    return (i != 0).then(|| i.to_string());
                }
                if let Some(u) = n.as_u64() {
                    return Some(u.to_string());
                }
                n.as_f64().filter(|f| *f != 0.0).map(format_number)
            }
        }
    }
}

/// Prints whole floats without a fractional part (`5000.0` -> `5000`).
fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

fn serialize_js_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedProduct {
    pub name: String,
    pub price: String,
    #[serde(serialize_with = "serialize_js_number")]
    pub rating: f64,
    pub reviews: u64,
    pub category: String,
    pub seller: String,
    pub availability: String,
    pub image: String,
    pub views: u64,
    pub favorites: u64,
}

/// JavaScript truthiness, which is how the storefront treats `offer.available`.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty(s: Option<&String>) -> Option<&str> {
    s.map(String::as_str).filter(|s| !s.is_empty())
}

/// Maps an upstream payload onto the caller-facing shape, filling in defaults.
pub fn format_product(payload: &UpstreamPayload) -> FormattedProduct {
    let product = payload.product.as_ref();
    let offer = payload.offer.as_ref();
    let stats = payload.stats.as_ref();

    let category = product.and_then(|p| p.category.as_ref()).and_then(|c| non_empty(c.name.as_ref()));
    let seller = offer.and_then(|o| o.merchant.as_ref()).and_then(|m| non_empty(m.name.as_ref()));
    let image = product
        .and_then(|p| p.pictures.as_ref())
        .and_then(|pics| pics.first())
        .and_then(Value::as_str);
    let in_stock = offer.and_then(|o| o.available.as_ref()).is_some_and(truthy);

    FormattedProduct {
        name: product.and_then(|p| non_empty(p.name.as_ref())).unwrap_or(UNKNOWN_NAME).to_string(),
        price: offer
            .and_then(|o| o.price.as_ref())
            .and_then(Price::render)
            .map(|p| format!("{p}{CURRENCY_SUFFIX}"))
            .unwrap_or_else(|| NO_PRICE.to_string()),
        rating: product.and_then(|p| p.rating).unwrap_or(0.0),
        reviews: product.and_then(|p| p.reviews_count).unwrap_or(0),
        category: category.unwrap_or(NO_CATEGORY).to_string(),
        seller: seller.unwrap_or(NO_SELLER).to_string(),
        availability: (if in_stock { IN_STOCK } else { OUT_OF_STOCK }).to_string(),
        image: image.unwrap_or_default().to_string(),
        views: stats.and_then(|s| s.views).unwrap_or(0),
        favorites: stats.and_then(|s| s.favorites).unwrap_or(0),
    }
}

/// Decodes an upstream body. Only a non-JSON or `null` body is an error; any other
/// non-object JSON value carries no fields and decodes to an empty payload.
pub fn decode_payload(body: &[u8]) -> Result<UpstreamPayload, serde_json::Error> {
    match serde_json::from_slice::<Value>(body)? {
        value @ Value::Object(_) => serde_json::from_value(value),
        Value::Null => Err(serde::de::Error::custom("upstream body is null")),
        _ => Ok(UpstreamPayload::default()),
    }
}
