use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use clap::{Arg, Command};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::{
    api::ApiSettings, log::LogSettings, sorting::GridSettings,
    telemetry_endpoint::TelemetryEndpointSettings, upstream::UpstreamSettings,
};

/// Immutable configuration snapshot. Loaded once in `main` and handed to
/// everything that needs it, nothing reads it through a global.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub listen: ApiSettings,
    pub telemetry_endpoint: TelemetryEndpointSettings,
    pub log: LogSettings,
    #[serde(default)]
    pub upstreams: Vec<UpstreamSettings>,
    #[serde(default)]
    pub grid: GridSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let opts = Command::new(clap::crate_name!())
            .version(clap::crate_version!())
            .about(clap::crate_description!())
            .author(clap::crate_authors!())
            .args([
                Arg::new("config")
                    .help("path of config file")
                    .takes_value(true)
                    .short('c')
                    .long("config")
                    .default_value("./config.yaml"),
                Arg::new("level")
                    .help("log level")
                    .possible_values(["Error", "Warn", "Info", "Debug", "Trace"])
                    .ignore_case(true)
                    .takes_value(true)
                    .long("log"),
            ])
            .get_matches();

        let config_path = opts
            .value_of("config")
            .context("config path has no value")?;

        let conf = Config::builder()
            .add_source(File::with_name(config_path))
            .add_source(Environment::with_prefix("ALERTDECK").separator("__"))
            .build()
            .context("can't load config")?;

        let mut settings: Settings = conf.try_deserialize().context("can't load config")?;

        if let Some(level) = opts.value_of("level") {
            settings.log.level = level.to_string();
        }

        settings.validate()?;

        Ok(settings)
    }

    /// upstream names identify upstreams in webhook urls and in the summary,
    /// so they have to be unique
    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for upstream in self.upstreams.iter() {
            if !names.insert(upstream.name.as_str()) {
                bail!("upstream {:?} is configured more than once", upstream.name);
            }
        }

        Ok(())
    }
}
