//! Harness settings, read from an optional JSON file

use anyhow::{Context, Result};
use gamekit_core::ecs::ExecutionGroup;
use gamekit_core::CoreConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Ticks each lane runs before the harness shuts down.
    pub ticks: u64,
    /// Demo entities spawned at startup.
    pub entities: usize,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Tick rate of each threaded lane, in Hz. Groups without an entry do
    /// not get a thread.
    pub tick_rates: BTreeMap<ExecutionGroup, u32>,
    pub core: CoreConfig,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            ticks: 120,
            entities: 16,
            log_filter: "info".to_string(),
            tick_rates: BTreeMap::from([
                (ExecutionGroup::Render, 60),
                (ExecutionGroup::Physics, 120),
                (ExecutionGroup::Update, 60),
                (ExecutionGroup::Input, 120),
                (ExecutionGroup::Io, 30),
            ]),
            core: CoreConfig::default(),
        }
    }
}

impl RuntimeSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings file {}", path.display()))
    }

    /// Lanes that get their own thread, in group order.
    pub fn lanes(&self) -> impl Iterator<Item = (ExecutionGroup, u32)> + '_ {
        self.tick_rates
            .iter()
            .filter(|(group, _)| **group != ExecutionGroup::Manual)
            .map(|(group, hz)| (*group, *hz))
    }
}
