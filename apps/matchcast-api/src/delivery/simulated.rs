//! Stand-in for the external push/socket/email/SMS providers.

use std::time::Duration;

use rand::Rng;

use super::DeliveryError;

/// Fails with probability `fault_rate` and otherwise succeeds after
/// `latency`.
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    name: &'static str,
    fault_rate: f64,
    latency: Duration,
}

impl SimulatedProvider {
    pub fn new(name: &'static str, fault_rate: f64, latency: Duration) -> Self {
        let fault_rate = if fault_rate.is_nan() {
            0.0
        } else {
            fault_rate.clamp(0.0, 1.0)
        };
        Self {
            name,
            fault_rate,
            latency,
        }
    }

    pub async fn attempt(&self) -> Result<(), DeliveryError> {
        let fault = rand::thread_rng().gen_bool(self.fault_rate);
        if fault {
            return Err(DeliveryError::Unavailable {
                provider: self.name,
            });
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(())
    }
}
