//! Giving: CollectAmount → SelectPayment → Success

use tracing::info;

use super::payment::{PaymentProcessor, PaymentReceipt, PaymentRequest};
use super::{settle, Confirmation, PersistFailurePolicy, WizardError};
use crate::gateway::Gateway;
use crate::models::{
    amount, Currency, DonationCategory, NewDonation, PaymentMethod, Table, ANONYMOUS,
    DONATION_STATUS_SUCCESS,
};

/// Warning shown when the donation could not be stored
pub const DONATION_SYNC_WARNING: &str =
    "Payment recorded locally, but database sync failed. Please check connection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DonationStep {
    #[default]
    CollectAmount,
    SelectPayment,
    Success,
}

impl DonationStep {
    pub fn index(&self) -> u8 {
        match self {
            DonationStep::CollectAmount => 1,
            DonationStep::SelectPayment => 2,
            DonationStep::Success => 3,
        }
    }
}

/// What the giver has entered so far
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DonationForm {
    /// Raw text of the amount field
    pub amount: String,
    pub category: DonationCategory,
    pub donor_name: String,
    pub currency: Currency,
    pub method: PaymentMethod,
}

impl DonationForm {
    /// The amount, if it is a finite number above zero
    pub fn parsed_amount(&self) -> Option<f64> {
        parse_amount(&self.amount)
    }

    fn donor(&self) -> String {
        let name = self.donor_name.trim();
        if name.is_empty() {
            ANONYMOUS.to_string()
        } else {
            name.to_string()
        }
    }
}

pub fn parse_amount(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

#[derive(Debug, Clone)]
pub struct DonationWizard {
    step: DonationStep,
    form: DonationForm,
    notice: Option<String>,
    receipt: Option<PaymentReceipt>,
    policy: PersistFailurePolicy,
}

impl Default for DonationWizard {
    fn default() -> Self {
        Self {
            step: DonationStep::CollectAmount,
            form: DonationForm::default(),
            notice: None,
            receipt: None,
            policy: PersistFailurePolicy::AdvanceWithWarning(DONATION_SYNC_WARNING.to_string()),
        }
    }
}

impl DonationWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_policy(mut self, policy: PersistFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn step(&self) -> DonationStep {
        self.step
    }

    pub fn form(&self) -> &DonationForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut DonationForm {
        &mut self.form
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        self.receipt.as_ref()
    }

    pub fn proceed(&mut self) -> Result<(), WizardError> {
        if self.step != DonationStep::CollectAmount {
            return Err(WizardError::InvalidStep {
                action: "proceed to payment",
            });
        }
        if self.form.parsed_amount().is_none() {
            return Err(WizardError::InvalidAmount);
        }
        self.step = DonationStep::SelectPayment;
        Ok(())
    }

    pub fn go_back(&mut self) -> Result<(), WizardError> {
        if self.step != DonationStep::SelectPayment {
            return Err(WizardError::InvalidStep { action: "go back" });
        }
        self.step = DonationStep::CollectAmount;
        Ok(())
    }

    /// Take the payment and record the donation.
    ///
    /// A failed insert still completes the donation; see [`Self::notice`].
    pub async fn confirm(
        &mut self,
        payments: &dyn PaymentProcessor,
        gateway: &dyn Gateway,
    ) -> Result<Confirmation, WizardError> {
        if self.step != DonationStep::SelectPayment {
            return Err(WizardError::InvalidStep {
                action: "confirm payment",
            });
        }
        let value = self.form.parsed_amount().ok_or(WizardError::InvalidAmount)?;
        let request = PaymentRequest {
            amount: value,
            currency: self.form.currency,
            method: self.form.method,
        };
        let record = NewDonation {
            donor_name: self.form.donor(),
            amount: value,
            currency: self.form.currency.code.to_string(),
            category: self.form.category,
            status: DONATION_STATUS_SUCCESS.to_string(),
        };

        self.notice = None;
        let result = settle(
            payments,
            gateway,
            &request,
            Table::Donations,
            &self.policy,
            |_| record,
        )
        .await;

        match result {
            Ok(confirmation) => {
                info!(
                    amount = %amount::format(value),
                    currency = self.form.currency.code,
                    category = self.form.category.as_str(),
                    "donation completed"
                );
                self.notice = confirmation.warning.clone();
                self.receipt = Some(confirmation.receipt.clone());
                self.step = DonationStep::Success;
                Ok(confirmation)
            }
            Err(e) => {
                self.notice = Some(match &e {
                    WizardError::Persist { message, .. } => message.clone(),
                    other => other.to_string(),
                });
                Err(e)
            }
        }
    }

    /// `FCFA 5000` once the donation went through
    pub fn success_message(&self) -> Option<String> {
        if self.step != DonationStep::Success {
            return None;
        }
        let value = self.form.parsed_amount()?;
        Some(format!("{} {}", self.form.currency.symbol, amount::format(value)))
    }

    /// "Done": start over with an empty form
    pub fn reset(&mut self) {
        let policy = self.policy.clone();
        *self = Self::default().with_failure_policy(policy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::testing::{InstantPayment, RecordingGateway};
    use serde_json::json;

    fn wizard_with(amount: &str) -> DonationWizard {
        let mut wizard = DonationWizard::new();
        wizard.form_mut().amount = amount.to_string();
        wizard
    }

    #[test]
    fn amount_must_be_positive_number() {
        assert_eq!(parse_amount(" 5000 "), Some(5000.0));
        assert_eq!(parse_amount("12.5"), Some(12.5));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("-3"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn defaults() {
        let wizard = DonationWizard::new();
        assert_eq!(wizard.step().index(), 1);
        assert_eq!(wizard.form().category, DonationCategory::Offering);
        assert_eq!(wizard.form().currency, Currency::XAF);
        assert_eq!(wizard.form().method, PaymentMethod::Card);
    }

    #[test]
    fn invalid_amount_blocks_proceed() {
        let mut wizard = wizard_with("   ");
        assert!(matches!(wizard.proceed(), Err(WizardError::InvalidAmount)));
        assert_eq!(wizard.step(), DonationStep::CollectAmount);
    }

    #[test]
    fn go_back_keeps_form() {
        let mut wizard = wizard_with("2500");
        wizard.form_mut().donor_name = "Grace".to_string();
        wizard.proceed().unwrap();
        wizard.go_back().unwrap();

        assert_eq!(wizard.step(), DonationStep::CollectAmount);
        assert_eq!(wizard.form().amount, "2500");
        assert_eq!(wizard.form().donor_name, "Grace");
    }

    #[tokio::test]
    async fn anonymous_donation_is_recorded() {
        let gateway = RecordingGateway::default();
        let mut wizard = wizard_with("2500");
        wizard.proceed().unwrap();

        wizard.confirm(&InstantPayment, &gateway).await.unwrap();

        assert_eq!(
            gateway.inserted(),
            vec![(
                Table::Donations,
                json!({
                    "donor_name": "Anonymous",
                    "amount": 2500,
                    "currency": "XAF",
                    "category": "offering",
                    "status": "success"
                })
            )]
        );
        assert_eq!(wizard.success_message().as_deref(), Some("FCFA 2500"));
    }

    #[tokio::test]
    async fn huge_amount_displays_what_was_stored() {
        let gateway = RecordingGateway::default();
        let mut wizard = wizard_with("1e20");
        wizard.proceed().unwrap();

        wizard.confirm(&InstantPayment, &gateway).await.unwrap();

        assert_eq!(gateway.inserted()[0].1["amount"], json!(1e20));
        assert_eq!(
            wizard.success_message().as_deref(),
            Some("FCFA 100000000000000000000")
        );
    }

    #[tokio::test]
    async fn failed_insert_still_advances_with_warning() {
        let gateway = RecordingGateway::rejecting();
        let mut wizard = wizard_with("100");
        wizard.proceed().unwrap();

        let confirmation = wizard.confirm(&InstantPayment, &gateway).await.unwrap();

        assert_eq!(confirmation.warning.as_deref(), Some(DONATION_SYNC_WARNING));
        assert_eq!(wizard.step(), DonationStep::Success);
        assert_eq!(wizard.notice(), Some(DONATION_SYNC_WARNING));
    }

    #[tokio::test]
    async fn blocking_policy_is_honoured() {
        let gateway = RecordingGateway::rejecting();
        let mut wizard = wizard_with("100")
            .with_failure_policy(PersistFailurePolicy::Block("try again".to_string()));
        wizard.proceed().unwrap();

        assert!(wizard.confirm(&InstantPayment, &gateway).await.is_err());
        assert_eq!(wizard.step(), DonationStep::SelectPayment);
        assert_eq!(wizard.notice(), Some("try again"));
    }

    #[test]
    fn reset_clears_form() {
        let mut wizard = wizard_with("100");
        wizard.form_mut().currency = Currency::EUR;
        wizard.reset();

        assert_eq!(wizard.form(), &DonationForm::default());
        assert_eq!(wizard.step(), DonationStep::CollectAmount);
    }
}
