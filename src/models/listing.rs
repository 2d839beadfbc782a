use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque listing identifier. The row store may hand it out as a number or a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl<'de> Deserialize<'de> for ListingId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => ListingId(s),
            Raw::Number(n) => ListingId(n.to_string()),
            // 7.0 -> "7", so float and integer ids compare equal
            Raw::Float(f) if f.is_finite() && f.fract() == 0.0 => ListingId((f as i64).to_string()),
            Raw::Float(f) => ListingId(f.to_string()),
        })
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(s: &str) -> Self {
        ListingId(s.to_string())
    }
}

/// One rental unit as stored in the `listings` table.
///
/// Every attribute is optional: rows in the store are not validated, and a
/// wrongly-typed value is read as absent rather than rejecting the row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Listing {
    #[serde(rename = "id")]
    pub id: ListingId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    /// GBP per month
    #[serde(default, deserialize_with = "lenient_number")]
    pub rent: Option<i64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub listed: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub bedrooms: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub baths: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub furnished: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub garden: Option<bool>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub square_footage: Option<u32>,
    /// GBP per month, 0 means no extra charge
    #[serde(default, deserialize_with = "lenient_number")]
    pub pet_parking_costs: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub stair_free_access: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub house_share: Option<bool>,
}

impl Listing {
    pub fn rent_or_zero(&self) -> i64 {
        self.rent.unwrap_or(0)
    }

    pub fn bedrooms_or_zero(&self) -> u32 {
        self.bedrooms.unwrap_or(0)
    }

    pub fn pet_parking_or_zero(&self) -> i64 {
        self.pet_parking_costs.unwrap_or(0)
    }

    pub fn is_furnished(&self) -> bool {
        self.furnished.unwrap_or(false)
    }

    pub fn has_garden(&self) -> bool {
        self.garden.unwrap_or(false)
    }

    pub fn is_house_share(&self) -> bool {
        self.house_share.unwrap_or(false)
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn location_text(&self) -> &str {
        self.location.as_deref().unwrap_or("")
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let raw = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(raw.and_then(|n| T::try_from(n).ok()))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

/// Parse the timestamp shapes Postgres hands back for `timestamptz`,
/// `timestamp` and `date` columns.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Postgres uses a space separator and a short offset ("+00")
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
