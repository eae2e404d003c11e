//! CLI commands module.

mod encode;
mod info;

pub use encode::EncodeCommand;
pub use info::InfoCommand;

use anyhow::Context as _;
use diffsvc_hubert::HubertConfig;
use serde::Serialize;

use crate::Cli;

/// Loads the hparams file (if any) and applies command-line overrides.
pub(crate) fn load_config(cli: &Cli) -> anyhow::Result<HubertConfig> {
    let mut config = match &cli.config {
        Some(path) => HubertConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => HubertConfig::default(),
    };

    if let Some(ckpt) = &cli.ckpt {
        config.hubert_path = Some(ckpt.clone());
    }
    if let Some(use_vec) = cli.use_vec {
        config.use_vec = Some(use_vec);
    }
    if cli.cpu {
        config.hubert_gpu = Some(false);
    }
    Ok(config)
}

/// Prints `value` as pretty JSON or via its human-readable form.
pub(crate) fn print_result<T: Serialize>(cli: &Cli, value: &T, human: impl FnOnce(&T)) -> anyhow::Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}
