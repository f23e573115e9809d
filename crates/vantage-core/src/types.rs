//! Core types for Vantage

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

/// Unique identifier for a mounted media slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub Uuid);

impl SlotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of media held by a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Whether this kind of media can be played
    pub fn is_playable(&self) -> bool {
        matches!(self, MediaKind::Video)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Media to be shown in a slot. Immutable while the slot is mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Source URL of the image or video
    pub url: Url,
    /// Static placeholder shown until the live media is mounted
    #[serde(default)]
    pub thumbnail_url: Option<Url>,
    /// Image or video
    pub kind: MediaKind,
}

impl MediaDescriptor {
    pub fn video(url: &str) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            thumbnail_url: None,
            kind: MediaKind::Video,
        })
    }

    pub fn image(url: &str) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            thumbnail_url: None,
            kind: MediaKind::Image,
        })
    }

    /// Attach a thumbnail URL
    pub fn with_thumbnail(mut self, url: &str) -> Result<Self> {
        self.thumbnail_url = Some(Url::parse(url)?);
        Ok(self)
    }
}

/// A single report from the visibility tracker.
///
/// Bounding coordinates are relative to the top of the physical viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportObservation {
    /// Fraction of the element overlapping the (margin-expanded) viewport
    pub intersection_ratio: f64,
    /// Whether the tracker considers the element intersecting
    pub is_intersecting: bool,
    /// Top edge of the element's bounding box
    pub bounding_top: f64,
    /// Bottom edge of the element's bounding box
    pub bounding_bottom: f64,
    /// Height of the physical viewport
    pub viewport_height: f64,
}

impl ViewportObservation {
    pub fn new(
        intersection_ratio: f64,
        is_intersecting: bool,
        bounding_top: f64,
        bounding_bottom: f64,
        viewport_height: f64,
    ) -> Self {
        Self {
            intersection_ratio: intersection_ratio.clamp(0.0, 1.0),
            is_intersecting,
            bounding_top,
            bounding_bottom,
            viewport_height,
        }
    }

    /// Distance in pixels from the nearest viewport edge to the element.
    ///
    /// Zero while the element still overlaps the physical viewport.
    pub fn distance_from_viewport(&self) -> f64 {
        if self.bounding_top >= self.viewport_height {
            self.bounding_top - self.viewport_height
        } else if self.bounding_bottom <= 0.0 {
            -self.bounding_bottom
        } else {
            0.0
        }
    }
}

/// Effective connection class as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectiveConnectionType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl FromStr for EffectiveConnectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Ok(Self::Slow2g),
            "2g" => Ok(Self::TwoG),
            "3g" => Ok(Self::ThreeG),
            "4g" => Ok(Self::FourG),
            "unknown" | "" => Ok(Self::Unknown),
            other => Err(Error::UnknownConnectionType(other.to_string())),
        }
    }
}

impl std::fmt::Display for EffectiveConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slow2g => write!(f, "slow-2g"),
            Self::TwoG => write!(f, "2g"),
            Self::ThreeG => write!(f, "3g"),
            Self::FourG => write!(f, "4g"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Network information read from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkConditions {
    /// Effective connection class
    #[serde(default)]
    pub effective_type: EffectiveConnectionType,
    /// User asked for reduced data usage
    #[serde(default)]
    pub save_data: bool,
}

impl NetworkConditions {
    pub fn new(effective_type: EffectiveConnectionType, save_data: bool) -> Self {
        Self { effective_type, save_data }
    }
}

/// Coarse connection quality used for load decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl ConnectionQuality {
    /// Derive quality from platform network information.
    ///
    /// A data-saver preference forces `Slow` when `respect_data_saver` is set,
    /// regardless of the reported effective type.
    pub fn derive(conditions: &NetworkConditions, respect_data_saver: bool) -> Self {
        if conditions.save_data && respect_data_saver {
            return ConnectionQuality::Slow;
        }

        match conditions.effective_type {
            EffectiveConnectionType::Slow2g | EffectiveConnectionType::TwoG => {
                ConnectionQuality::Slow
            }
            EffectiveConnectionType::ThreeG => ConnectionQuality::Medium,
            EffectiveConnectionType::FourG => ConnectionQuality::Fast,
            EffectiveConnectionType::Unknown => ConnectionQuality::Medium,
        }
    }

    /// How aggressively the media element should fetch
    pub fn load_strategy(&self) -> LoadStrategy {
        match self {
            ConnectionQuality::Slow => LoadStrategy::None,
            ConnectionQuality::Medium => LoadStrategy::MetadataOnly,
            ConnectionQuality::Fast => LoadStrategy::Full,
        }
    }
}

impl std::fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionQuality::Slow => write!(f, "slow"),
            ConnectionQuality::Medium => write!(f, "medium"),
            ConnectionQuality::Fast => write!(f, "fast"),
        }
    }
}

/// Preload strategy handed to the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Fetch nothing until playback is requested
    None,
    /// Fetch dimensions and duration only
    MetadataOnly,
    /// Fetch the whole resource
    Full,
}

impl LoadStrategy {
    /// Value for an HTML media `preload` attribute
    pub fn as_preload_attr(&self) -> &'static str {
        match self {
            LoadStrategy::None => "none",
            LoadStrategy::MetadataOnly => "metadata",
            LoadStrategy::Full => "auto",
        }
    }
}

impl std::fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_preload_attr())
    }
}

/// Advisory media failure recorded in controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorKind {
    /// The platform refused to start playback without a user gesture
    AutoplayBlocked,
    /// Network or decode failure
    MediaLoadFailed,
    Unknown,
}

impl MediaErrorKind {
    /// Short label suitable for a status badge
    pub fn label(&self) -> &'static str {
        match self {
            MediaErrorKind::AutoplayBlocked => "Autoplay failed",
            MediaErrorKind::MediaLoadFailed => "Failed to load video",
            MediaErrorKind::Unknown => "Media error",
        }
    }
}

impl std::fmt::Display for MediaErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Named lifecycle phase of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaPhase {
    /// Nothing requested
    Idle,
    /// Load debounce timer pending
    Scheduled,
    /// Source attached, waiting for ready
    Loading,
    /// Ready to play but not playing
    Ready,
    Playing,
}

impl std::fmt::Display for MediaPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaPhase::Idle => write!(f, "idle"),
            MediaPhase::Scheduled => write!(f, "scheduled"),
            MediaPhase::Loading => write!(f, "loading"),
            MediaPhase::Ready => write!(f, "ready"),
            MediaPhase::Playing => write!(f, "playing"),
        }
    }
}

/// Observable state of one media slot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerState {
    pub is_in_view: bool,
    /// Set once the load debounce fired; cleared only by eviction
    pub should_load: bool,
    /// Set once the media signalled it can play
    pub is_loaded: bool,
    pub is_playing: bool,
    pub has_user_interacted: bool,
    /// Buffered percentage, 0..=100
    pub loading_progress: f64,
    pub error: Option<MediaErrorKind>,
    pub connection_quality: ConnectionQuality,
}

impl ControllerState {
    /// Initial state for a freshly mounted slot
    pub fn new(connection_quality: ConnectionQuality) -> Self {
        Self {
            connection_quality,
            ..Default::default()
        }
    }

    /// Preload strategy for the current connection
    pub fn preferred_load_strategy(&self) -> LoadStrategy {
        self.connection_quality.load_strategy()
    }

    /// Whether the caller should show the static placeholder
    pub fn should_render_thumbnail(&self) -> bool {
        !self.should_load || (!self.is_in_view && !self.is_playing)
    }

    /// Whether the caller should keep the live media element mounted
    pub fn should_render_media(&self) -> bool {
        self.should_load
    }

    /// Media is requested and ready, so playback may begin
    pub fn can_play(&self) -> bool {
        self.should_load && self.is_loaded
    }
}
