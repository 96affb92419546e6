use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tandem::{MatchConfig, PacketLossSimulation};

/// Everything the demo reads from its optional TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    #[serde(rename = "match")]
    pub game: MatchConfig,
    pub network: PacketLossSimulation,
}

impl DemoConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_optional() {
        let config: DemoConfig = toml::from_str(
            r#"
            [network]
            enabled = true
            loss_percent = 10.0

            [match.timing]
            snapshot_interval_ticks = 6
            "#,
        )
        .unwrap();

        assert!(config.network.enabled);
        assert_eq!(config.game.timing.snapshot_interval_ticks, 6);
        assert_eq!(config.game.timing.tick_rate, 60);
    }
}
