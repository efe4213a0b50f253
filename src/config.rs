use serde::Deserialize;
use std::{fs, path::Path};

use crate::{
    core::Ticks,
    error::{Result, SimError},
    scheduler::SRR_QUANTUM_DFL,
};

/// Display commands at or beyond this time are the final display.
pub const FINAL_DISPLAY_TIME_DFL: Ticks = 999_999;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub static_quantum: Ticks,
    pub final_display_time: Ticks,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            static_quantum: SRR_QUANTUM_DFL,
            final_display_time: FINAL_DISPLAY_TIME_DFL,
        }
    }
}

impl SimConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    pub fn with_static_quantum(mut self, quantum: Ticks) -> Result<Self> {
        self.static_quantum = quantum;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.static_quantum == 0 {
            return Err(SimError::InvalidConfig(
                "static_quantum must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
