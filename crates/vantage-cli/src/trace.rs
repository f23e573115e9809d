//! Scroll trace format
//!
//! A trace describes a page of media slots and a timed sequence of scroll
//! positions and user actions to replay against them.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vantage_core::{ElementRect, MediaDescriptor, NetworkConditions, ViewportConfig};

/// Replayable scroll session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trace {
    /// Named preset used when `config` is absent
    #[serde(default)]
    pub preset: Option<String>,
    /// Explicit slot configuration
    #[serde(default)]
    pub config: Option<ViewportConfig>,
    /// Network conditions at mount time
    #[serde(default)]
    pub network: NetworkConditions,
    /// Physical viewport height in pixels
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
    /// Reveal slots page by page instead of mounting all at once
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Delay before a requested page appears
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
    /// Time from attaching a source until it reports ready
    #[serde(default = "default_ready_latency")]
    pub ready_latency_ms: u64,
    /// Platform refuses playback without a user gesture
    #[serde(default)]
    pub autoplay_blocked: bool,
    pub slots: Vec<TraceSlot>,
    pub steps: Vec<TraceStep>,
}

fn default_viewport_height() -> f64 {
    800.0
}

fn default_page_delay() -> u64 {
    1000
}

fn default_ready_latency() -> u64 {
    300
}

/// One media slot on the page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceSlot {
    pub name: String,
    pub media: MediaDescriptor,
    /// Document offset of the slot
    pub top: f64,
    pub height: f64,
}

impl TraceSlot {
    pub fn rect(&self) -> ElementRect {
        ElementRect::new(self.top, self.height)
    }
}

/// Timed input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: StepAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    Scroll { scroll_top: f64 },
    Play { slot: String },
    Pause { slot: String },
    Network { conditions: NetworkConditions },
    Error { slot: String },
}

impl Trace {
    /// Read and validate a trace file
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading trace {}", path.display()))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let trace: Trace = serde_json::from_str(raw).context("parsing trace")?;
        trace.validate()?;
        Ok(trace)
    }

    /// Resolve the slot configuration from `config` or `preset`
    pub fn resolve_config(&self) -> anyhow::Result<ViewportConfig> {
        let config = match (&self.config, &self.preset) {
            (Some(config), _) => config.clone(),
            (None, Some(name)) => ViewportConfig::preset(name)
                .with_context(|| format!("unknown preset '{name}'"))?,
            (None, None) => ViewportConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.viewport_height <= 0.0 {
            bail!("viewport_height must be positive");
        }

        let mut names = std::collections::HashSet::new();
        for slot in &self.slots {
            if !names.insert(slot.name.as_str()) {
                bail!("duplicate slot name '{}'", slot.name);
            }
            if slot.height < 0.0 {
                bail!("slot '{}' has negative height", slot.name);
            }
        }

        for step in &self.steps {
            if let StepAction::Play { slot } | StepAction::Pause { slot } | StepAction::Error { slot } =
                &step.action
            {
                if !names.contains(slot.as_str()) {
                    bail!("step at {}ms references unknown slot '{}'", step.at_ms, slot);
                }
            }
        }

        self.resolve_config()?;
        Ok(())
    }
}
