//! Slot configuration
//!
//! A [`ViewportConfig`] is fixed for the lifetime of a controller. It decides
//! when a slot starts loading, when it may autoplay and how far off-screen it
//! may drift before its media is released.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Per-slot configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewportConfig {
    /// Minimum intersection ratio before a load is considered (0..=1)
    pub loading_threshold: f64,
    /// Minimum intersection ratio before autoplay (0..=1)
    pub play_threshold: f64,
    /// Off-screen distance in pixels beyond which loaded media is released
    pub unload_distance: f64,
    /// Pre-fetch margin around the physical viewport, in pixels
    pub viewport_margin: f64,
    /// Load at `loading_threshold` regardless of connection quality
    pub prefetch_enabled: bool,
    /// Treat a data-saver preference as a slow connection
    pub respect_data_saver: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            loading_threshold: 0.1,
            play_threshold: 0.5,
            unload_distance: 2000.0,
            viewport_margin: 200.0,
            prefetch_enabled: true,
            respect_data_saver: true,
        }
    }
}

impl ViewportConfig {
    /// Inline card video.
    ///
    /// `loading_distance` doubles as the pre-fetch margin, and media is
    /// released once it drifts twice that far away. Prefetching follows
    /// `autoplay`.
    pub fn inline_video(loading_distance: f64, play_visibility: f64, autoplay: bool) -> Self {
        Self {
            loading_threshold: 0.1,
            play_threshold: play_visibility,
            unload_distance: loading_distance * 2.0,
            viewport_margin: loading_distance,
            prefetch_enabled: autoplay,
            respect_data_saver: true,
        }
    }

    /// Room card video with the card defaults (200px, 30% visible)
    pub fn room_card() -> Self {
        Self::inline_video(200.0, 0.3, true)
    }

    /// Lazily loaded gallery image; images never play
    pub fn gallery_image() -> Self {
        Self {
            loading_threshold: 0.1,
            play_threshold: 1.0,
            ..Default::default()
        }
    }

    /// Look up a named preset
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" => Some(Self::default()),
            "room-card" | "room_card" => Some(Self::room_card()),
            "gallery-image" | "gallery_image" => Some(Self::gallery_image()),
            _ => None,
        }
    }

    /// Names accepted by [`ViewportConfig::preset`]
    pub fn preset_names() -> &'static [&'static str] {
        &["default", "room-card", "gallery-image"]
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and ordering of the thresholds
    pub fn validate(&self) -> Result<()> {
        check_threshold("loading_threshold", self.loading_threshold)?;
        check_threshold("play_threshold", self.play_threshold)?;
        check_distance("unload_distance", self.unload_distance)?;
        check_distance("viewport_margin", self.viewport_margin)?;

        if self.loading_threshold > self.play_threshold {
            return Err(Error::config(format!(
                "loading_threshold ({}) must not exceed play_threshold ({})",
                self.loading_threshold, self.play_threshold
            )));
        }

        Ok(())
    }

    /// Trigger points and margin for the visibility tracker
    pub fn observer_options(&self) -> ObserverOptions {
        let mut thresholds = vec![0.0, self.loading_threshold, self.play_threshold, 0.75, 1.0];
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();

        ObserverOptions {
            thresholds,
            root_margin: self.viewport_margin,
        }
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::ThresholdOutOfRange { name, value })
    }
}

fn check_distance(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidDistance { name, value })
    }
}

/// Options used to register a slot with the visibility tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverOptions {
    /// Ratios at which the tracker must report, ascending
    pub thresholds: Vec<f64>,
    /// Margin around the viewport in pixels
    pub root_margin: f64,
}

impl ObserverOptions {
    /// Margin formatted as a CSS length
    pub fn root_margin_css(&self) -> String {
        format!("{}px", self.root_margin)
    }
}
