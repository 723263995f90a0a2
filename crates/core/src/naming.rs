//! Generated identifiers: slugs, SKUs and order numbers.

use chrono::NaiveDate;
use rand::Rng;
use rand::seq::IndexedRandom;

const ORDER_SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ORDER_SUFFIX_LEN: usize = 6;

/// First generated SKU number.
pub const SKU_START: u32 = 1001;

/// Lowercase ASCII slug with single hyphens between words.
///
/// Characters outside `[a-z0-9_]` separate words. Returns an empty string when
/// nothing is left.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        }
    }

    slug
}

/// `base`, then `base-2`, `base-3`, …
///
/// An empty `base` becomes `fallback`.
pub fn slug_candidates(base: &str, fallback: &str) -> impl Iterator<Item = String> {
    let base = if base.is_empty() { fallback } else { base }.to_owned();
    core::iter::once(base.clone()).chain((2_u32..).map(move |n| format!("{base}-{n}")))
}

/// `SKU1001`, `SKU1002`, …
pub fn sku_candidates() -> impl Iterator<Item = String> {
    (SKU_START..).map(|n| format!("SKU{n}"))
}

/// `ORD` + `YYYYMMDD` + six random uppercase letters or digits.
pub fn order_number<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> String {
    let suffix: String = (0..ORDER_SUFFIX_LEN)
        .filter_map(|_| ORDER_SUFFIX_CHARSET.choose(&mut *rng))
        .map(|&b| char::from(b))
        .collect();
    format!("ORD{}{suffix}", date.format("%Y%m%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Organic Coffee Beans"), "organic-coffee-beans");
        assert_eq!(slugify("  Tea -- 250g! "), "tea-250g");
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slug_candidates() {
        let candidates: Vec<_> = slug_candidates("tea", "product").take(3).collect();
        assert_eq!(candidates, ["tea", "tea-2", "tea-3"]);

        let first = slug_candidates("", "product").next().unwrap();
        assert_eq!(first, "product");
    }

    #[test]
    fn test_sku_candidates() {
        let skus: Vec<_> = sku_candidates().take(2).collect();
        assert_eq!(skus, ["SKU1001", "SKU1002"]);
    }

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let number = order_number(date, &mut rand::rng());

        assert_eq!(number.len(), 17);
        assert!(number.starts_with("ORD20260309"));
        assert!(
            number
                .chars()
                .skip(11)
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }
}
