//! Listing card rendering.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::models::Listing;

const UNKNOWN: &str = "TBC";

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn rent_label(rent: Option<i64>) -> String {
    match rent {
        Some(r) => format!("£{} pcm", group_thousands(r)),
        None => UNKNOWN.to_string(),
    }
}

pub fn bedrooms_label(bedrooms: Option<u32>) -> String {
    match bedrooms {
        None => UNKNOWN.to_string(),
        Some(0) => "Studio".to_string(),
        Some(1) => "1 bedroom".to_string(),
        Some(n) => format!("{} bedrooms", n),
    }
}

pub fn baths_label(baths: Option<u32>) -> String {
    match baths {
        None => UNKNOWN.to_string(),
        Some(1) => "1 bathroom".to_string(),
        Some(n) => format!("{} bathrooms", n),
    }
}

/// UK day/month/year
pub fn listed_label(listed: Option<DateTime<Utc>>) -> String {
    match listed {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None => "Recently listed".to_string(),
    }
}

pub fn pet_costs_label(costs: Option<i64>) -> String {
    match costs {
        Some(c) if c > 0 => format!("£{} pcm", group_thousands(c)),
        _ => "None".to_string(),
    }
}

fn yes_no(flag: Option<bool>) -> &'static str {
    if flag.unwrap_or(false) {
        "Yes"
    } else {
        "No"
    }
}

/// Text card for one listing, every field with its fallback
pub struct ListingCard<'a>(pub &'a Listing);

impl fmt::Display for ListingCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let l = self.0;
        writeln!(
            f,
            "{} ({})",
            l.title.as_deref().unwrap_or("Untitled listing"),
            rent_label(l.rent)
        )?;
        writeln!(
            f,
            "   {}, {}",
            bedrooms_label(l.bedrooms),
            baths_label(l.baths)
        )?;
        if let Some(location) = l.location.as_deref().filter(|s| !s.is_empty()) {
            writeln!(f, "   Location: {}", location)?;
        }
        if let Some(sqft) = l.square_footage {
            writeln!(f, "   Size: {} sq ft", group_thousands(i64::from(sqft)))?;
        }
        writeln!(
            f,
            "   Furnished: {} | Garden: {} | Stair-free: {} | House share: {}",
            yes_no(l.furnished),
            yes_no(l.garden),
            yes_no(l.stair_free_access),
            yes_no(l.house_share)
        )?;
        writeln!(f, "   Pet/parking costs: {}", pet_costs_label(l.pet_parking_costs))?;
        if let Some(description) = l.description.as_deref().filter(|s| !s.is_empty()) {
            writeln!(f, "   {}", description)?;
        }
        write!(f, "   Listed: {} | ID: {}", listed_label(l.listed), l.id)
    }
}
