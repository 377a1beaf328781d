//! Records stored in and read from the site's tables
//!
//! Read records mirror the table rows. Write records (`New*`) carry only
//! what the site inserts; ids and timestamps are assigned by the database.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Status written on a completed e-book order
pub const ORDER_STATUS_COMPLETED: &str = "completed";

/// Status written on a donation
pub const DONATION_STATUS_SUCCESS: &str = "success";

/// Donor and sender name used when none is given
pub const ANONYMOUS: &str = "Anonymous";

/// Tables the site touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Posts,
    Events,
    Sermons,
    LiveStreams,
    Ebooks,
    EbookOrders,
    Donations,
    PrayerRequests,
    Leaders,
    Profiles,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Posts => "posts",
            Table::Events => "events",
            Table::Sermons => "sermons",
            Table::LiveStreams => "live_streams",
            Table::Ebooks => "ebooks",
            Table::EbookOrders => "ebook_orders",
            Table::Donations => "donations",
            Table::PrayerRequests => "prayer_requests",
            Table::Leaders => "leaders",
            Table::Profiles => "profiles",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Blog,
    Sermon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub author: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    pub is_published: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurchEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub event_time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub rsvp_count: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamPlatform {
    YouTube,
    Facebook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStream {
    pub id: String,
    pub platform: StreamPlatform,
    pub embed_url: String,
    pub is_live: bool,
    pub title: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sermon {
    pub id: String,
    pub title: String,
    pub preacher: String,
    pub sermon_date: NaiveDate,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub notes_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ebook {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub cover_image_url: String,
    pub file_url: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Ebook {
    /// Free books are downloaded directly instead of going through checkout
    pub fn is_free(&self) -> bool {
        self.price == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leader {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub image_url: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub role: ProfileRole,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EbookOrder {
    pub id: String,
    pub ebook_id: String,
    pub buyer_email: String,
    pub amount: f64,
    pub payment_reference: String,
    pub status: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEbookOrder {
    pub ebook_id: String,
    pub buyer_email: String,
    #[serde(serialize_with = "amount::serialize")]
    pub amount: f64,
    pub payment_reference: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerRequest {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub message: String,
    pub is_private: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl PrayerRequest {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => ANONYMOUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPrayerRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub message: String,
    pub is_private: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationCategory {
    Tithe,
    #[default]
    Offering,
    Project,
}

impl DonationCategory {
    pub const ALL: [DonationCategory; 3] = [
        DonationCategory::Tithe,
        DonationCategory::Offering,
        DonationCategory::Project,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DonationCategory::Tithe => "tithe",
            DonationCategory::Offering => "offering",
            DonationCategory::Project => "project",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DonationCategory::Tithe => "Tithe",
            DonationCategory::Offering => "Offering",
            DonationCategory::Project => "Church Project",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DonationCategory::Tithe => "Giving 10% of our increase.",
            DonationCategory::Offering => "Sacrificial giving for ministry.",
            DonationCategory::Project => "Expansion and building funds.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: String,
    #[serde(default)]
    pub donor_name: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    pub category: DonationCategory,
    pub status: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDonation {
    pub donor_name: String,
    #[serde(serialize_with = "amount::serialize")]
    pub amount: f64,
    pub currency: String,
    pub category: DonationCategory,
    pub status: String,
}

/// Currency offered on the giving page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    pub code: &'static str,
    pub symbol: &'static str,
    pub label: &'static str,
}

impl Currency {
    pub const XAF: Currency = Currency {
        code: "XAF",
        symbol: "FCFA",
        label: "CFA Franc (Cameroon)",
    };
    pub const NGN: Currency = Currency {
        code: "NGN",
        symbol: "₦",
        label: "Naira (Nigeria)",
    };
    pub const USD: Currency = Currency {
        code: "USD",
        symbol: "$",
        label: "US Dollar",
    };
    pub const EUR: Currency = Currency {
        code: "EUR",
        symbol: "€",
        label: "Euro",
    };

    pub const SUPPORTED: [Currency; 4] = [Currency::XAF, Currency::NGN, Currency::USD, Currency::EUR];

    pub fn from_code(code: &str) -> Option<Currency> {
        Self::SUPPORTED
            .iter()
            .copied()
            .find(|c| c.code.eq_ignore_ascii_case(code))
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::XAF
    }
}

/// How a visitor pays; only a display choice while payments are simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Paypal,
    Momo,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Card, PaymentMethod::Paypal, PaymentMethod::Momo];

    /// Translation key of the method's label
    pub fn label_key(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "giving.methods.card",
            PaymentMethod::Paypal => "giving.methods.paypal",
            PaymentMethod::Momo => "giving.methods.momo",
        }
    }
}

/// Money amounts as JSON numbers
pub mod amount {
    use serde::Serializer;

    /// Whole amounts go out as integers (`5000`), others as floats.
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    /// Display form without grouping: `5000`, `12.50`
    pub fn format(value: f64) -> String {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            format!("{}", value as i64)
        } else if value.fract() == 0.0 {
            format!("{}", value)
        } else {
            format!("{:.2}", value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_amounts_serialize_as_integers() {
        let donation = NewDonation {
            donor_name: ANONYMOUS.to_string(),
            amount: 5000.0,
            currency: "XAF".to_string(),
            category: DonationCategory::Tithe,
            status: DONATION_STATUS_SUCCESS.to_string(),
        };
        let value = serde_json::to_value(&donation).unwrap();
        assert_eq!(value["amount"], json!(5000));
        assert_eq!(value["category"], json!("tithe"));

        let fractional = NewDonation {
            amount: 12.5,
            ..donation
        };
        assert_eq!(serde_json::to_value(&fractional).unwrap()["amount"], json!(12.5));
    }

    #[test]
    fn amount_display() {
        assert_eq!(amount::format(5000.0), "5000");
        assert_eq!(amount::format(12.5), "12.50");
        assert_eq!(amount::format(1e20), "100000000000000000000");
    }

    #[test]
    fn event_row_with_database_timestamps() {
        let event: ChurchEvent = serde_json::from_value(json!({
            "id": "e1",
            "title": "Sunday Worship Service",
            "description": "Main service at Faingo Sanctuary",
            "event_date": "2024-05-20",
            "event_time": "09:00 AM",
            "location": "Kumba (Faingo)",
            "image_url": null,
            "rsvp_count": 120,
            "created_at": "2024-05-01T10:00:00.123456+00:00"
        }))
        .unwrap();
        assert_eq!(event.event_date, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
        assert_eq!(event.rsvp_count, 120);
    }

    #[test]
    fn currency_lookup() {
        assert_eq!(Currency::from_code("xaf"), Some(Currency::XAF));
        assert_eq!(Currency::default().symbol, "FCFA");
        assert!(Currency::from_code("GBP").is_none());
    }

    #[test]
    fn prayer_display_name_defaults_to_anonymous() {
        let request = PrayerRequest {
            id: "p1".to_string(),
            name: Some("  ".to_string()),
            email: None,
            message: "Healing".to_string(),
            is_private: true,
            created_at: Utc::now(),
        };
        assert_eq!(request.display_name(), ANONYMOUS);
    }
}
