//! Admin area: sign-in form, overview counters and the prayer manager

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use church_auth::{Auth, AuthError};
use church_postgrest::SortOrder;

use crate::error::{Error, Result};
use crate::gateway::{fetch, Gateway, Query};
use crate::models::{amount, PrayerRequest, Table};
use crate::router::{AdminSection, Route};

pub const CREDENTIALS_REQUIRED: &str = "Email and password are required.";

/// Shown when the auth service rejects the sign-in without a message
pub const INVALID_CREDENTIALS: &str =
    "Invalid credentials. Please check your Supabase User settings.";

/// Shown when the auth service cannot be reached
pub const CONNECTION_FAILED: &str =
    "A connection error occurred. Please verify your Supabase URL and API Key.";

/// Sign-in form
#[derive(Debug, Clone, Default)]
pub struct AdminLogin {
    pub email: String,
    pub password: String,
    error: Option<String>,
}

impl AdminLogin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Sign in; returns where to go next, or `None` to stay on the form.
    pub async fn submit(&mut self, auth: &Auth) -> Option<Route> {
        self.error = None;
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            self.error = Some(CREDENTIALS_REQUIRED.to_string());
            return None;
        }

        match auth.sign_in_with_password(email, &self.password).await {
            Ok(session) => {
                info!(user = %session.user.id, "admin signed in");
                self.password.clear();
                Some(Route::Admin(AdminSection::Overview))
            }
            Err(AuthError::NetworkError(e)) => {
                error!(error = %e, "auth service unreachable");
                self.error = Some(CONNECTION_FAILED.to_string());
                None
            }
            Err(e) => {
                warn!(error = %e, "admin sign-in rejected");
                self.error = Some(
                    Error::from(e)
                        .user_message()
                        .unwrap_or_else(|| INVALID_CREDENTIALS.to_string()),
                );
                None
            }
        }
    }
}

/// Sign out and go home. The local session is gone even if the remote
/// sign-out failed.
pub async fn logout(auth: &Auth) -> Route {
    if let Err(e) = auth.sign_out().await {
        warn!(error = %e, "remote sign-out failed, local session cleared");
    }
    Route::Home
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OverviewStats {
    pub posts: u64,
    pub events: u64,
    pub ebooks: u64,
    /// Sum of every donation amount, all currencies together
    pub donations_total: f64,
}

impl OverviewStats {
    pub fn donations_display(&self) -> String {
        amount::format(self.donations_total)
    }
}

fn count_or_zero(table: Table, result: Result<u64>) -> u64 {
    result.unwrap_or_else(|e| {
        error!(table = table.as_str(), error = %e, "count failed");
        0
    })
}

fn sum_amounts(rows: &[Value]) -> f64 {
    rows.iter()
        .filter_map(|row| row.get("amount").and_then(Value::as_f64))
        .sum()
}

/// Run the four overview reads concurrently. Each failed read counts as zero.
pub async fn load_overview(gateway: &dyn Gateway) -> OverviewStats {
    let amounts = Query::all().columns("amount");
    let (posts, events, donations, ebooks) = tokio::join!(
        gateway.count(Table::Posts),
        gateway.count(Table::Events),
        gateway.select(Table::Donations, &amounts),
        gateway.count(Table::Ebooks),
    );

    let donations_total = match donations {
        Ok(rows) => sum_amounts(&rows),
        Err(e) => {
            error!(error = %e, "donation totals failed");
            0.0
        }
    };

    OverviewStats {
        posts: count_or_zero(Table::Posts, posts),
        events: count_or_zero(Table::Events, events),
        ebooks: count_or_zero(Table::Ebooks, ebooks),
        donations_total,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub fn label(&self) -> &'static str {
        match self {
            Visibility::Private => "Private",
            Visibility::Public => "Public",
        }
    }
}

/// One line of the prayer manager table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerRow {
    pub sender: String,
    pub email: Option<String>,
    pub message: String,
    pub visibility: Visibility,
    pub received_at: DateTime<Utc>,
}

impl From<&PrayerRequest> for PrayerRow {
    fn from(request: &PrayerRequest) -> Self {
        Self {
            sender: request.display_name().to_string(),
            email: request.email.clone().filter(|e| !e.is_empty()),
            message: request.message.clone(),
            visibility: if request.is_private {
                Visibility::Private
            } else {
                Visibility::Public
            },
            received_at: request.created_at,
        }
    }
}

/// Every prayer request, newest first
pub async fn load_prayer_requests(gateway: &dyn Gateway) -> Vec<PrayerRow> {
    let query = Query::all().order("created_at", SortOrder::Descending);
    match fetch::<PrayerRequest>(gateway, Table::PrayerRequests, &query).await {
        Ok(requests) => requests.iter().map(PrayerRow::from).collect(),
        Err(e) => {
            error!(error = %e, "failed to load prayer requests");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn amounts_are_summed_skipping_bad_rows() {
        let rows = vec![
            json!({ "amount": 5000 }),
            json!({ "amount": 2500.5 }),
            json!({ "amount": null }),
            json!({}),
        ];
        assert_eq!(sum_amounts(&rows), 7500.5);
    }

    #[test]
    fn prayer_rows_label_visibility() {
        let request = PrayerRequest {
            id: "p1".to_string(),
            name: None,
            email: Some(String::new()),
            message: "Strength".to_string(),
            is_private: false,
            created_at: Utc::now(),
        };
        let row = PrayerRow::from(&request);
        assert_eq!(row.sender, "Anonymous");
        assert_eq!(row.email, None);
        assert_eq!(row.visibility.label(), "Public");
    }

    #[test]
    fn overview_display_has_no_grouping() {
        let stats = OverviewStats {
            donations_total: 1250000.0,
            ..OverviewStats::default()
        };
        assert_eq!(stats.donations_display(), "1250000");
    }
}
