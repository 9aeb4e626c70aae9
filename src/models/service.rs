use serde::{Deserialize, Serialize};

/// A bookable service from the catalog. Prices are in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub duration: Option<u32>,
    #[serde(default)]
    pub buffer_time: u32,
    #[serde(default)]
    pub price: u64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Length of a service as quoted to customers, plus the clean-up time the
/// chair stays blocked afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDuration {
    pub minutes: u32,
    pub buffer_minutes: u32,
}

impl ServiceDuration {
    pub fn without_buffer(minutes: u32) -> Self {
        Self {
            minutes,
            buffer_minutes: 0,
        }
    }

    pub fn occupied_minutes(&self) -> u32 {
        self.minutes + self.buffer_minutes
    }
}

impl Service {
    /// `None` when the catalog entry has no usable duration.
    pub fn timing(&self) -> Option<ServiceDuration> {
        self.duration
            .filter(|minutes| *minutes > 0)
            .map(|minutes| ServiceDuration {
                minutes,
                buffer_minutes: self.buffer_time,
            })
    }
}
