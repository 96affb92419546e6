use rand::Rng;
use serde::{Deserialize, Serialize};

/// Impairments applied to every delivery on a [`super::LoopbackBus`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    pub loss_percent: f32,
    pub duplicate_percent: f32,
    pub min_latency_ms: u32,
    pub max_latency_ms: u32,
    pub jitter_ms: u32,
}

impl PacketLossSimulation {
    pub fn should_drop<R: Rng>(&self, rng: &mut R) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        rng.r#gen::<f32>() * 100.0 < self.loss_percent
    }

    pub fn should_duplicate<R: Rng>(&self, rng: &mut R) -> bool {
        if !self.enabled || self.duplicate_percent <= 0.0 {
            return false;
        }
        rng.r#gen::<f32>() * 100.0 < self.duplicate_percent
    }

    pub fn delay_ms<R: Rng>(&self, rng: &mut R) -> f64 {
        if !self.enabled || self.max_latency_ms == 0 {
            return 0.0;
        }
        let base = f64::from(self.min_latency_ms);
        let range = f64::from(self.max_latency_ms.saturating_sub(self.min_latency_ms));
        let jitter = f64::from(self.jitter_ms) * rng.r#gen::<f64>();
        base + range * rng.r#gen::<f64>() + jitter
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_delivered: u64,
    pub packets_dropped: u64,
    pub packets_duplicated: u64,
    pub bytes_sent: u64,
    pub bytes_delivered: u64,
}
