//! Purchase and donation wizards
//!
//! Both wizards are plain owned state machines. Every transition takes
//! `&mut self`, and `confirm` only runs from the payment step, so one
//! confirmation produces at most one insert.

pub mod checkout;
pub mod donation;
pub mod payment;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::Error;
use crate::gateway::{insert_record, Gateway};
use crate::models::Table;

pub use checkout::{BuyOutcome, Checkout, CheckoutStep};
pub use donation::{DonationForm, DonationStep, DonationWizard};
pub use payment::{PaymentProcessor, PaymentReceipt, PaymentRequest, SimulatedPayment};

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("cannot {action} from the current step")]
    InvalidStep { action: &'static str },

    #[error("an email address is required")]
    MissingEmail,

    #[error("enter an amount greater than zero")]
    InvalidAmount,

    #[error("Payment failed: {0}")]
    Payment(#[source] Error),

    /// The insert failed and the wizard stayed on the payment step
    #[error("{message}")]
    Persist {
        message: String,
        #[source]
        source: Error,
    },
}

/// What a wizard does when the payment succeeded but the record insert failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistFailurePolicy {
    /// Stay on the payment step and show the message
    Block(String),
    /// Move on to success and show the message as a warning
    AdvanceWithWarning(String),
}

/// A completed confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub receipt: PaymentReceipt,
    /// Set when the insert failed under [`PersistFailurePolicy::AdvanceWithWarning`]
    pub warning: Option<String>,
}

/// Take the payment, then write exactly one record built from its receipt.
pub(crate) async fn settle<T, F>(
    payments: &dyn PaymentProcessor,
    gateway: &dyn Gateway,
    request: &PaymentRequest,
    table: Table,
    policy: &PersistFailurePolicy,
    build_record: F,
) -> Result<Confirmation, WizardError>
where
    T: Serialize,
    F: FnOnce(&PaymentReceipt) -> T,
{
    let receipt = payments
        .process(request)
        .await
        .map_err(WizardError::Payment)?;

    let record = build_record(&receipt);
    match insert_record(gateway, table, &record).await {
        Ok(()) => Ok(Confirmation {
            receipt,
            warning: None,
        }),
        Err(e) => match policy {
            PersistFailurePolicy::Block(message) => {
                error!(table = table.as_str(), error = %e, "insert failed, staying on payment step");
                Err(WizardError::Persist {
                    message: message.clone(),
                    source: e,
                })
            }
            PersistFailurePolicy::AdvanceWithWarning(message) => {
                warn!(table = table.as_str(), error = %e, "insert failed, advancing anyway");
                Ok(Confirmation {
                    receipt,
                    warning: Some(message.clone()),
                })
            }
        },
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    use super::payment::{PaymentProcessor, PaymentReceipt, PaymentRequest};
    use crate::error::{Error, Result};
    use crate::gateway::{Gateway, Query};
    use crate::models::Table;

    /// Keeps inserts in memory; can be told to reject them
    #[derive(Default)]
    pub struct RecordingGateway {
        pub inserts: Mutex<Vec<(Table, Value)>>,
        pub reject_inserts: bool,
    }

    impl RecordingGateway {
        pub fn rejecting() -> Self {
            Self {
                reject_inserts: true,
                ..Self::default()
            }
        }

        pub fn inserted(&self) -> Vec<(Table, Value)> {
            self.inserts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Gateway for RecordingGateway {
        async fn select(&self, _table: Table, _query: &Query) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn count(&self, _table: Table) -> Result<u64> {
            Ok(0)
        }

        async fn insert(&self, table: Table, record: Value) -> Result<()> {
            if self.reject_inserts {
                return Err(Error::general("insert rejected"));
            }
            self.inserts.lock().unwrap().push((table, record));
            Ok(())
        }
    }

    /// Approves instantly with a fixed reference
    pub struct InstantPayment;

    #[async_trait]
    impl PaymentProcessor for InstantPayment {
        async fn process(&self, _request: &PaymentRequest) -> Result<PaymentReceipt> {
            Ok(PaymentReceipt {
                reference: "MOCK_test00001".to_string(),
            })
        }
    }

    pub struct DecliningPayment;

    #[async_trait]
    impl PaymentProcessor for DecliningPayment {
        async fn process(&self, _request: &PaymentRequest) -> Result<PaymentReceipt> {
            Err(Error::payment("card declined"))
        }
    }
}
