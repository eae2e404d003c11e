use clap::Args;
use diffsvc_hubert::FeatureEncoder;

use super::{load_config, print_result};
use crate::Cli;

/// Show the resolved checkpoint, device and backend.
///
/// Loads the model, so a broken checkpoint is reported here as well.
#[derive(Args)]
pub struct InfoCommand {}

impl InfoCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let config = load_config(cli)?;
        let encoder = FeatureEncoder::new(config.checkpoint_hint(), &config)?;

        print_result(cli, encoder.options(), |opts| {
            println!("checkpoint: {}", opts.checkpoint.display());
            println!("device:     {}", opts.device);
            println!("backend:    {}", opts.backend);
            println!("hubert_gpu: {}", opts.hubert_gpu);
        })
    }
}
