//! Prayer request form

use tracing::{info, warn};

use crate::gateway::{insert_record, Gateway};
use crate::models::{NewPrayerRequest, Table, ANONYMOUS};

/// Shown when the server gave no message of its own
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit. Please try again.";

pub const MESSAGE_REQUIRED: &str = "Please tell us how we can pray for you.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrayerForm {
    pub name: String,
    pub email: String,
    pub message: String,
    pub is_private: bool,
}

impl PrayerForm {
    /// The record to insert, or `None` while the message is blank
    pub fn to_record(&self) -> Option<NewPrayerRequest> {
        let message = self.message.trim();
        if message.is_empty() {
            return None;
        }
        let name = self.name.trim();
        let email = self.email.trim();
        Some(NewPrayerRequest {
            name: if name.is_empty() { ANONYMOUS } else { name }.to_string(),
            email: (!email.is_empty()).then(|| email.to_string()),
            message: message.to_string(),
            is_private: self.is_private,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrayerPage {
    form: PrayerForm,
    submitted: bool,
    error: Option<String>,
}

impl PrayerPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &PrayerForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut PrayerForm {
        &mut self.form
    }

    /// True after a successful submission, until [`Self::send_another`]
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Send the request. On success the form is cleared; on failure the
    /// input is kept and an inline error is set.
    pub async fn submit(&mut self, gateway: &dyn Gateway) -> bool {
        self.error = None;
        let record = match self.form.to_record() {
            Some(record) => record,
            None => {
                self.error = Some(MESSAGE_REQUIRED.to_string());
                return false;
            }
        };

        match insert_record(gateway, Table::PrayerRequests, &record).await {
            Ok(()) => {
                info!(private = record.is_private, "prayer request received");
                self.form = PrayerForm::default();
                self.submitted = true;
                true
            }
            Err(e) => {
                warn!(error = %e, "prayer request failed");
                self.error = Some(
                    e.user_message()
                        .unwrap_or_else(|| SUBMIT_FAILED_MESSAGE.to_string()),
                );
                false
            }
        }
    }

    /// Leave the confirmation and show an empty form again
    pub fn send_another(&mut self) {
        self.submitted = false;
        self.error = None;
    }
}
