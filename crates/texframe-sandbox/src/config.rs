use std::time::Duration;

use serde::{Deserialize, Serialize};
use texframe_renderer::{LOAD_DELAY, SETTLE_DELAYS};

/// Upper bound for any applied container height, in pixels.
pub const MAX_HEIGHT: u32 = 5000;
/// Added to every reported height before clamping.
pub const SAFETY_PAD: u32 = 10;

/// Settings shared by the host bridge and the headless sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Initial container height and lower clamp bound.
    pub min_height: u32,
    /// Upper clamp bound. Values above [`MAX_HEIGHT`] are capped.
    pub max_height: u32,
    pub safety_pad: u32,
    /// Delay before the sandbox typesets a freshly loaded document.
    pub load_delay_ms: u64,
    /// The two one-shot measurements after typesetting, measured from the end of the scan.
    pub settle_delays_ms: [u64; 2],
    /// Width of the headless viewport, in CSS pixels.
    pub viewport_width: f32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let [first, second] = SETTLE_DELAYS;
        Self {
            min_height: 20,
            max_height: MAX_HEIGHT,
            safety_pad: SAFETY_PAD,
            load_delay_ms: LOAD_DELAY.as_millis() as u64,
            settle_delays_ms: [first.as_millis() as u64, second.as_millis() as u64],
            viewport_width: 360.0,
        }
    }
}

impl BridgeConfig {
    pub fn with_min_height(mut self, min_height: u32) -> Self {
        self.min_height = min_height;
        self
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }

    pub fn settle_delays(&self) -> [Duration; 2] {
        self.settle_delays_ms.map(Duration::from_millis)
    }

    /// The effective upper bound: `max_height`, never above [`MAX_HEIGHT`].
    pub fn ceiling_height(&self) -> u32 {
        self.max_height.min(MAX_HEIGHT)
    }

    /// The effective lower bound: never above the ceiling.
    pub fn floor_height(&self) -> u32 {
        self.min_height.min(self.ceiling_height())
    }
}
