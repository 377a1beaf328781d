//! E-book checkout: Idle → CollectEmail → SelectPayment → Success

use tracing::info;

use super::payment::{PaymentProcessor, PaymentReceipt, PaymentRequest};
use super::{settle, Confirmation, PersistFailurePolicy, WizardError};
use crate::gateway::Gateway;
use crate::i18n::Localizer;
use crate::models::{
    amount, Currency, Ebook, NewEbookOrder, PaymentMethod, Table, ORDER_STATUS_COMPLETED,
};

/// Alert shown when the order could not be stored
pub const ORDER_FAILED_MESSAGE: &str = "Order failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutStep {
    #[default]
    Idle,
    CollectEmail,
    SelectPayment,
    Success,
}

impl CheckoutStep {
    /// 0 for idle through 3 for success
    pub fn index(&self) -> u8 {
        match self {
            CheckoutStep::Idle => 0,
            CheckoutStep::CollectEmail => 1,
            CheckoutStep::SelectPayment => 2,
            CheckoutStep::Success => 3,
        }
    }
}

/// Result of pressing "buy" on a shop item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuyOutcome {
    /// Free item: open this file, no checkout
    Download(String),
    /// Paid item: the checkout is now collecting the email
    Checkout,
}

#[derive(Debug, Clone)]
pub struct Checkout {
    step: CheckoutStep,
    book: Option<Ebook>,
    email: String,
    method: PaymentMethod,
    notice: Option<String>,
    receipt: Option<PaymentReceipt>,
    policy: PersistFailurePolicy,
}

impl Default for Checkout {
    fn default() -> Self {
        Self {
            step: CheckoutStep::Idle,
            book: None,
            email: String::new(),
            method: PaymentMethod::default(),
            notice: None,
            receipt: None,
            policy: PersistFailurePolicy::Block(ORDER_FAILED_MESSAGE.to_string()),
        }
    }
}

impl Checkout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_policy(mut self, policy: PersistFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn selected(&self) -> Option<&Ebook> {
        self.book.as_ref()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, email: &str) {
        self.email = email.to_string();
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn set_method(&mut self, method: PaymentMethod) {
        self.method = method;
    }

    /// Alert or warning from the last confirmation attempt
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        self.receipt.as_ref()
    }

    pub fn buy(&mut self, book: &Ebook) -> BuyOutcome {
        if book.is_free() {
            info!(ebook = %book.id, "free ebook, direct download");
            return BuyOutcome::Download(book.file_url.clone());
        }
        self.book = Some(book.clone());
        self.notice = None;
        self.receipt = None;
        self.step = CheckoutStep::CollectEmail;
        info!(ebook = %book.id, "checkout started");
        BuyOutcome::Checkout
    }

    pub fn continue_to_payment(&mut self) -> Result<(), WizardError> {
        if self.step != CheckoutStep::CollectEmail {
            return Err(WizardError::InvalidStep {
                action: "continue to payment",
            });
        }
        if self.email.trim().is_empty() {
            return Err(WizardError::MissingEmail);
        }
        self.step = CheckoutStep::SelectPayment;
        Ok(())
    }

    /// Back to the email step; nothing entered is lost
    pub fn go_back(&mut self) -> Result<(), WizardError> {
        if self.step != CheckoutStep::SelectPayment {
            return Err(WizardError::InvalidStep { action: "go back" });
        }
        self.step = CheckoutStep::CollectEmail;
        Ok(())
    }

    /// Pay for the selected book and record the order.
    ///
    /// On any failure the checkout stays on the payment step.
    pub async fn confirm(
        &mut self,
        payments: &dyn PaymentProcessor,
        gateway: &dyn Gateway,
    ) -> Result<Confirmation, WizardError> {
        if self.step != CheckoutStep::SelectPayment {
            return Err(WizardError::InvalidStep {
                action: "confirm payment",
            });
        }
        let book = match &self.book {
            Some(book) => book.clone(),
            None => {
                return Err(WizardError::InvalidStep {
                    action: "confirm payment",
                })
            }
        };
        let buyer_email = self.email.trim().to_string();
        let request = PaymentRequest {
            amount: book.price,
            currency: Currency::XAF,
            method: self.method,
        };

        self.notice = None;
        let result = settle(
            payments,
            gateway,
            &request,
            Table::EbookOrders,
            &self.policy,
            |receipt| NewEbookOrder {
                ebook_id: book.id.clone(),
                buyer_email,
                amount: book.price,
                payment_reference: receipt.reference.clone(),
                status: ORDER_STATUS_COMPLETED.to_string(),
            },
        )
        .await;

        match result {
            Ok(confirmation) => {
                info!(ebook = %book.id, reference = %confirmation.receipt.reference, "order completed");
                self.notice = confirmation.warning.clone();
                self.receipt = Some(confirmation.receipt.clone());
                self.step = CheckoutStep::Success;
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

    /// Close the dialog at any step, discarding the selection and email
    pub fn close(&mut self) {
        let policy = self.policy.clone();
        *self = Self::default().with_failure_policy(policy);
    }
}

/// `FCFA <price>`, or the translated "free" label
pub fn price_label(book: &Ebook, i18n: &Localizer) -> String {
    if book.is_free() {
        i18n.t("shop.free")
    } else {
        format!("{} {}", Currency::XAF.symbol, amount::format(book.price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::testing::{DecliningPayment, InstantPayment, RecordingGateway};
    use chrono::Utc;
    use serde_json::json;

    fn book(id: &str, price: f64) -> Ebook {
        Ebook {
            id: id.to_string(),
            title: "The Grace of Kumba".to_string(),
            description: String::new(),
            price,
            cover_image_url: String::new(),
            file_url: format!("https://files.example.org/{}.pdf", id),
            created_at: Utc::now(),
        }
    }

    fn at_payment_step(price: f64) -> Checkout {
        let mut checkout = Checkout::new();
        assert_eq!(checkout.buy(&book("b1", price)), BuyOutcome::Checkout);
        checkout.set_email("reader@example.org");
        checkout.continue_to_payment().unwrap();
        checkout
    }

    #[test]
    fn free_book_downloads_without_checkout() {
        let mut checkout = Checkout::new();
        let outcome = checkout.buy(&book("free", 0.0));

        assert_eq!(
            outcome,
            BuyOutcome::Download("https://files.example.org/free.pdf".to_string())
        );
        assert_eq!(checkout.step(), CheckoutStep::Idle);
        assert!(checkout.selected().is_none());
    }

    #[test]
    fn blank_email_blocks_payment_step() {
        let mut checkout = Checkout::new();
        checkout.buy(&book("b1", 1500.0));
        checkout.set_email("   ");

        assert!(matches!(
            checkout.continue_to_payment(),
            Err(WizardError::MissingEmail)
        ));
        assert_eq!(checkout.step(), CheckoutStep::CollectEmail);
    }

    #[test]
    fn go_back_keeps_email() {
        let mut checkout = at_payment_step(1500.0);
        checkout.go_back().unwrap();

        assert_eq!(checkout.step(), CheckoutStep::CollectEmail);
        assert_eq!(checkout.email(), "reader@example.org");
        assert!(checkout.go_back().is_err());
    }

    #[tokio::test]
    async fn confirm_inserts_one_order() {
        let gateway = RecordingGateway::default();
        let mut checkout = at_payment_step(1500.0);

        let confirmation = checkout.confirm(&InstantPayment, &gateway).await.unwrap();

        assert_eq!(confirmation.warning, None);
        assert_eq!(checkout.step(), CheckoutStep::Success);
        assert_eq!(checkout.step().index(), 3);
        assert_eq!(
            gateway.inserted(),
            vec![(
                Table::EbookOrders,
                json!({
                    "ebook_id": "b1",
                    "buyer_email": "reader@example.org",
                    "amount": 1500,
                    "payment_reference": "MOCK_test00001",
                    "status": "completed"
                })
            )]
        );

        assert!(checkout.confirm(&InstantPayment, &gateway).await.is_err());
        assert_eq!(gateway.inserted().len(), 1);
    }

    #[tokio::test]
    async fn failed_insert_blocks_on_payment_step() {
        let gateway = RecordingGateway::rejecting();
        let mut checkout = at_payment_step(1500.0);

        let err = checkout.confirm(&InstantPayment, &gateway).await.unwrap_err();

        assert!(matches!(err, WizardError::Persist { .. }));
        assert_eq!(checkout.step(), CheckoutStep::SelectPayment);
        assert_eq!(checkout.notice(), Some(ORDER_FAILED_MESSAGE));
        assert!(checkout.receipt().is_none());
    }

    #[tokio::test]
    async fn declined_payment_never_inserts() {
        let gateway = RecordingGateway::default();
        let mut checkout = at_payment_step(1500.0);

        let err = checkout.confirm(&DecliningPayment, &gateway).await.unwrap_err();

        assert!(matches!(err, WizardError::Payment(_)));
        assert_eq!(checkout.step(), CheckoutStep::SelectPayment);
        assert!(gateway.inserted().is_empty());
    }

    #[tokio::test]
    async fn confirm_before_email_is_refused() {
        let gateway = RecordingGateway::default();
        let mut checkout = Checkout::new();
        checkout.buy(&book("b1", 1500.0));

        assert!(matches!(
            checkout.confirm(&InstantPayment, &gateway).await,
            Err(WizardError::InvalidStep { .. })
        ));
        assert!(gateway.inserted().is_empty());
    }

    #[test]
    fn close_discards_everything() {
        let mut checkout = at_payment_step(1500.0);
        checkout.close();

        assert_eq!(checkout.step(), CheckoutStep::Idle);
        assert!(checkout.selected().is_none());
        assert_eq!(checkout.email(), "");
    }

    #[test]
    fn close_while_collecting_email() {
        let mut checkout = Checkout::new();
        checkout.buy(&book("b1", 1500.0));
        checkout.set_email("reader@example.org");
        checkout.close();

        assert_eq!(checkout.step(), CheckoutStep::Idle);
        assert!(checkout.selected().is_none());
        assert_eq!(checkout.email(), "");
    }

    #[tokio::test]
    async fn close_after_success_starts_over() {
        let gateway = RecordingGateway::default();
        let mut checkout = at_payment_step(1500.0);
        checkout.confirm(&InstantPayment, &gateway).await.unwrap();
        assert_eq!(checkout.step(), CheckoutStep::Success);

        checkout.close();

        assert_eq!(checkout.step(), CheckoutStep::Idle);
        assert!(checkout.selected().is_none());
        assert!(checkout.receipt().is_none());
        assert_eq!(checkout.email(), "");
        assert_eq!(gateway.inserted().len(), 1);
    }
}
