//! Homepage collection feed.

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::store::{CollectionRow, RecordStore};

pub const PRICE_ON_REQUEST: &str = "Price on Request";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionCard {
    pub id: String,
    pub title: String,
    pub category: String,
    pub price_label: String,
    pub images: Vec<String>,
    pub whatsapp_link: String,
}

/// Main image first, then attached images; trimmed, with entries of two
/// characters or fewer dropped.
pub fn collection_images(row: &CollectionRow) -> Vec<String> {
    row.image_url
        .iter()
        .chain(row.collection_images.iter().filter_map(|ci| ci.image_url.as_ref()))
        .map(|url| url.trim())
        .filter(|url| url.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Thousands-grouped amount with at most three decimals, e.g. `1,250,000`.
pub fn group_thousands(amount: f64) -> String {
    let negative = amount < 0.0;
    let rounded = format!("{:.3}", amount.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::new();
    for (i, d) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*d);
    }
    let sign = if negative { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

pub fn price_label(price_fcfa: Option<f64>) -> String {
    match price_fcfa {
        Some(p) if p != 0.0 && p.is_finite() => format!("{} FCFA", group_thousands(p)),
        _ => PRICE_ON_REQUEST.to_string(),
    }
}

pub fn whatsapp_link(number: &str, title: &str, price_label: &str) -> String {
    let text = format!(
        "Hi CK STYLE! I'm interested in \"{}\" ({}). Please tell me more!",
        title, price_label
    );
    format!("https://wa.me/{}?text={}", number, urlencoding::encode(&text))
}

pub fn build_cards(rows: &[CollectionRow], whatsapp_number: &str) -> Vec<CollectionCard> {
    rows.iter()
        .filter_map(|row| {
            let images = collection_images(row);
            if images.is_empty() {
                return None;
            }
            let price = price_label(row.price_fcfa);
            Some(CollectionCard {
                id: row.id.clone(),
                title: row.title.clone(),
                category: row
                    .category
                    .clone()
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| "Collection".to_string()),
                whatsapp_link: whatsapp_link(whatsapp_number, &row.title, &price),
                price_label: price,
                images,
            })
        })
        .collect()
}

pub async fn load_feed(store: &dyn RecordStore, whatsapp_number: &str) -> Result<Vec<CollectionCard>> {
    let rows = store.published_collections().await?;
    let cards = build_cards(&rows, whatsapp_number);
    info!("Loaded {} of {} published collections", cards.len(), rows.len());
    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CollectionImage, MemoryStore};

    fn row(title: &str, main: Option<&str>, extra: &[&str], price: Option<f64>) -> CollectionRow {
        CollectionRow {
            id: title.to_lowercase(),
            title: title.to_string(),
            category: None,
            price_fcfa: price,
            image_url: main.map(str::to_string),
            visibility: Some("published".to_string()),
            created_at: None,
            collection_images: extra
                .iter()
                .map(|u| CollectionImage {
                    image_url: Some(u.to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_images_trimmed_and_filtered() {
        let r = row("Kaba", Some("  main.jpg "), &["ab", " side.jpg", ""], None);
        assert_eq!(collection_images(&r), vec!["main.jpg", "side.jpg"]);
    }

    #[test]
    fn test_prices() {
        assert_eq!(price_label(Some(25000.0)), "25,000 FCFA");
        assert_eq!(price_label(Some(1250000.0)), "1,250,000 FCFA");
        assert_eq!(price_label(Some(999.5)), "999.5 FCFA");
        assert_eq!(price_label(Some(0.0)), PRICE_ON_REQUEST);
        assert_eq!(price_label(None), PRICE_ON_REQUEST);
    }

    #[test]
    fn test_whatsapp_link_is_encoded() {
        let link = whatsapp_link("237671002411", "Agbada", "Price on Request");
        assert_eq!(
            link,
            "https://wa.me/237671002411?text=Hi%20CK%20STYLE%21%20I%27m%20interested%20in%20%22Agbada%22%20%28Price%20on%20Request%29.%20Please%20tell%20me%20more%21"
        );
    }

    #[tokio::test]
    async fn test_feed_skips_imageless_and_unpublished() {
        let store = MemoryStore::new();
        store.push_collection(row("Old", Some("old.jpg"), &[], Some(5000.0)));
        store.push_collection(row("Empty", None, &["x"], None));
        let mut draft = row("Draft", Some("d.jpg"), &[], None);
        draft.visibility = Some("draft".to_string());
        store.push_collection(draft);
        store.push_collection(row("New", Some("new.jpg"), &[], None));

        let cards = load_feed(&store, "1").await.unwrap();
        let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old"]);
        assert_eq!(cards[1].price_label, "5,000 FCFA");
        assert_eq!(cards[0].category, "Collection");
    }
}
