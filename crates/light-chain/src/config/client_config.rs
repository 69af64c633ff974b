use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::Deserialize;

use crate::config::{ConsensusConstants, Network};

/// Prefix of environment variables overriding file configuration.
pub const ENV_PREFIX: &str = "LIGHT_CHAIN_";

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub network: Network,
    pub constants: ConsensusConstants,
    pub cache_slack: u32,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Layers the network preset, the network's table of a TOML file and `LIGHT_CHAIN_*`
    /// environment variables, in that order of precedence.
    pub fn from_file(config_path: &Path, network: Network) -> Result<Self, figment::Error> {
        let profile = network.to_string();
        let base_provider = Serialized::from(network.to_base_config(), profile.as_str());
        let toml_provider = Toml::file(config_path).nested();
        let env_provider = Env::prefixed(ENV_PREFIX).global();

        Figment::new()
            .merge(base_provider)
            .merge(toml_provider)
            .merge(env_provider)
            .select(profile.as_str())
            .extract()
    }

    /// Number of block records kept around the peak.
    pub fn cache_size(&self) -> u32 {
        self.constants.sub_epoch_blocks + self.cache_slack
    }
}

impl From<Network> for Config {
    fn from(network: Network) -> Self {
        let base_config = network.to_base_config();
        Self {
            network: base_config.network,
            constants: base_config.constants,
            cache_slack: base_config.cache_slack,
            data_dir: None,
        }
    }
}
