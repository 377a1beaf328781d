//! Read-only public pages: sermons, events, live stream, leaders, shop,
//! gallery and contact
//!
//! Every loader swallows gateway failures: the error is logged and the page
//! simply shows nothing.

use serde::de::DeserializeOwned;
use tracing::error;
use url::Url;

use church_postgrest::SortOrder;

use crate::gateway::{fetch, Gateway, Query};
use crate::models::{ChurchEvent, Ebook, Leader, LiveStream, Sermon, Table};

async fn load_or_empty<T: DeserializeOwned>(
    gateway: &dyn Gateway,
    table: Table,
    query: Query,
) -> Vec<T> {
    match fetch(gateway, table, &query).await {
        Ok(rows) => rows,
        Err(e) => {
            error!(table = table.as_str(), error = %e, "failed to load rows");
            Vec::new()
        }
    }
}

/// All sermons, newest first
pub async fn load_sermons(gateway: &dyn Gateway) -> Vec<Sermon> {
    let query = Query::all().order("sermon_date", SortOrder::Descending);
    load_or_empty(gateway, Table::Sermons, query).await
}

/// All events, soonest first
pub async fn load_events(gateway: &dyn Gateway) -> Vec<ChurchEvent> {
    let query = Query::all().order("event_date", SortOrder::Ascending);
    load_or_empty(gateway, Table::Events, query).await
}

/// The stream currently on air, if any
pub async fn load_live_stream(gateway: &dyn Gateway) -> Option<LiveStream> {
    let query = Query::all().eq("is_live", true).limit(1);
    load_or_empty(gateway, Table::LiveStreams, query)
        .await
        .into_iter()
        .next()
}

/// Church leaders in display order
pub async fn load_leaders(gateway: &dyn Gateway) -> Vec<Leader> {
    let query = Query::all().order("display_order", SortOrder::Ascending);
    load_or_empty(gateway, Table::Leaders, query).await
}

/// Shop catalogue, newest first
pub async fn load_ebooks(gateway: &dyn Gateway) -> Vec<Ebook> {
    let query = Query::all().order("created_at", SortOrder::Descending);
    load_or_empty(gateway, Table::Ebooks, query).await
}

/// Sermons whose title or preacher contains `query`, ignoring case.
/// An empty query matches everything.
pub fn search_sermons<'a>(sermons: &'a [Sermon], query: &str) -> Vec<&'a Sermon> {
    let needle = query.trim().to_lowercase();
    sermons
        .iter()
        .filter(|s| {
            needle.is_empty()
                || s.title.to_lowercase().contains(&needle)
                || s.preacher.to_lowercase().contains(&needle)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GalleryCategory {
    #[default]
    All,
    Worship,
    Youth,
    Community,
    Outreach,
}

impl GalleryCategory {
    pub const ALL: [GalleryCategory; 5] = [
        GalleryCategory::All,
        GalleryCategory::Worship,
        GalleryCategory::Youth,
        GalleryCategory::Community,
        GalleryCategory::Outreach,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GalleryCategory::All => "All",
            GalleryCategory::Worship => "Worship",
            GalleryCategory::Youth => "Youth",
            GalleryCategory::Community => "Community",
            GalleryCategory::Outreach => "Outreach",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryItem {
    pub category: GalleryCategory,
    pub image_url: String,
    pub caption: String,
    pub is_video: bool,
}

/// The gallery's fixed set of photos and clips
pub fn gallery_items() -> Vec<GalleryItem> {
    let categories = &GalleryCategory::ALL[1..];
    (1..=9)
        .map(|i: usize| GalleryItem {
            category: categories[(i - 1) % categories.len()],
            image_url: format!(
                "https://picsum.photos/800/{}?random=gallery{}",
                if i % 2 == 0 { 1000 } else { 600 },
                i
            ),
            caption: format!("May {}, 2024 • Main Sanctuary", i + 5),
            is_video: i % 3 == 0,
        })
        .collect()
}

pub fn filter_gallery(items: &[GalleryItem], category: GalleryCategory) -> Vec<&GalleryItem> {
    items
        .iter()
        .filter(|item| category == GalleryCategory::All || item.category == category)
        .collect()
}

/// Static contact card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInfo {
    pub phone: &'static str,
    pub email: &'static str,
    pub address: &'static str,
    pub whatsapp_number: &'static str,
    pub whatsapp_greeting: &'static str,
}

impl Default for ContactInfo {
    fn default() -> Self {
        Self {
            phone: "+237 (0) 6XX XXX XXX",
            email: "contact@gloriouschurch.org",
            address: "Faingo, Kumba, Cameroon",
            whatsapp_number: "2348001234567",
            whatsapp_greeting: "Hello Glorious Church, I would like to inquire about...",
        }
    }
}

impl ContactInfo {
    /// `https://wa.me/<number>?text=<greeting>`
    pub fn whatsapp_link(&self) -> String {
        whatsapp_link(self.whatsapp_number, self.whatsapp_greeting)
    }
}

pub fn whatsapp_link(number: &str, message: &str) -> String {
    let base = format!("https://wa.me/{}", number);
    match Url::parse_with_params(&base, &[("text", message)]) {
        Ok(url) => url.to_string(),
        Err(_) => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn sermon(title: &str, preacher: &str) -> Sermon {
        Sermon {
            id: title.to_string(),
            title: title.to_string(),
            preacher: preacher.to_string(),
            sermon_date: NaiveDate::from_ymd_opt(2024, 5, 12).unwrap(),
            audio_url: None,
            video_url: None,
            notes_url: None,
            image_url: None,
            content: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn search_matches_title_or_preacher() {
        let sermons = vec![
            sermon("Walking in Grace", "Rev. Samuel"),
            sermon("Faith over Fear", "Pastor Grace Ndi"),
            sermon("The Good Shepherd", "Rev. Samuel"),
        ];

        assert_eq!(search_sermons(&sermons, "GRACE").len(), 2);
        assert_eq!(search_sermons(&sermons, "shepherd").len(), 1);
        assert_eq!(search_sermons(&sermons, "  ").len(), 3);
        assert!(search_sermons(&sermons, "zebra").is_empty());
    }

    #[test]
    fn gallery_filtering() {
        let items = gallery_items();
        assert_eq!(filter_gallery(&items, GalleryCategory::All).len(), items.len());
        let youth = filter_gallery(&items, GalleryCategory::Youth);
        assert!(!youth.is_empty());
        assert!(youth.iter().all(|i| i.category == GalleryCategory::Youth));
    }

    #[test]
    fn whatsapp_link_encodes_message() {
        let link = whatsapp_link("2348001234567", "Hello Glorious Church, hi?");
        assert_eq!(
            link,
            "https://wa.me/2348001234567?text=Hello+Glorious+Church%2C+hi%3F"
        );
        assert!(ContactInfo::default()
            .whatsapp_link()
            .starts_with("https://wa.me/2348001234567?text="));
    }
}
