//! Payment producers
//!
//! No real gateway is integrated. [`SimulatedPayment`] waits a moment and
//! approves everything with a mock reference.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::info;

use crate::error::Result;
use crate::models::{amount, Currency, PaymentMethod};

/// Prefix of simulated payment references
pub const MOCK_REFERENCE_PREFIX: &str = "MOCK_";

const REFERENCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub amount: f64,
    pub currency: Currency,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub reference: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn process(&self, request: &PaymentRequest) -> Result<PaymentReceipt>;
}

/// Approves every payment after `delay`
#[derive(Debug, Clone)]
pub struct SimulatedPayment {
    delay: Duration,
}

impl SimulatedPayment {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedPayment {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedPayment {
    async fn process(&self, request: &PaymentRequest) -> Result<PaymentReceipt> {
        tokio::time::sleep(self.delay).await;
        let reference = mock_reference();
        info!(
            reference = %reference,
            amount = %amount::format(request.amount),
            currency = request.currency.code,
            method = ?request.method,
            "simulated payment approved"
        );
        Ok(PaymentReceipt { reference })
    }
}

/// `MOCK_` followed by nine random base-36 characters
pub fn mock_reference() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", MOCK_REFERENCE_PREFIX, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_shape() {
        let reference = mock_reference();
        let suffix = reference.strip_prefix(MOCK_REFERENCE_PREFIX).unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn simulated_payment_waits_then_approves() {
        let processor = SimulatedPayment::new(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let receipt = processor
            .process(&PaymentRequest {
                amount: 2500.0,
                currency: Currency::XAF,
                method: PaymentMethod::Momo,
            })
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(receipt.reference.starts_with(MOCK_REFERENCE_PREFIX));
    }
}
