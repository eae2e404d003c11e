use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use clap::Args;
use diffsvc_hubert::{cache_path, save_units, Backend, Device, FeatureEncoder};
use serde::Serialize;
use tracing::info;

use super::{load_config, print_result};
use crate::Cli;

/// Extract units from one audio file.
///
/// Prints the `[T, 256]` shape. With `--save` or `-o`, the units are
/// written as `.npy`; `--save` puts them next to the input where the
/// encoder will pick them up as a cache on the next run.
#[derive(Args)]
pub struct EncodeCommand {
    /// WAV file to encode, or "-" to read it from stdin
    input: String,

    /// Write units to this .npy file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Write units next to the input as <input>.npy
    #[arg(long)]
    save: bool,
}

#[derive(Serialize)]
struct EncodeResult {
    input: String,
    frames: usize,
    dim: usize,
    backend: Backend,
    device: Device,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
}

impl EncodeCommand {
    fn from_stdin(&self) -> bool {
        self.input == "-"
    }

    fn output_path(&self) -> anyhow::Result<Option<PathBuf>> {
        match (&self.output, self.save) {
            (Some(path), _) => Ok(Some(path.clone())),
            (None, true) if self.from_stdin() => {
                anyhow::bail!("--save needs -o when reading from stdin")
            }
            (None, true) => Ok(Some(cache_path(Path::new(&self.input)))),
            (None, false) => Ok(None),
        }
    }

    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let output = self.output_path()?;
        let config = load_config(cli)?;
        let encoder = FeatureEncoder::new(config.checkpoint_hint(), &config)?;

        let units = if self.from_stdin() {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            encoder.encode_stream(&mut Cursor::new(buf))?
        } else {
            encoder.encode_path(&self.input)?
        };

        if let Some(path) = &output {
            save_units(path, &units)?;
            info!(path = %path.display(), frames = units.nrows(), "hubert: units written");
        }

        let result = EncodeResult {
            input: self.input.clone(),
            frames: units.nrows(),
            dim: units.ncols(),
            backend: encoder.options().backend,
            device: encoder.options().device,
            output,
        };
        print_result(cli, &result, |r| {
            println!("{}: [{}, {}] ({} on {})", r.input, r.frames, r.dim, r.backend, r.device);
            if let Some(path) = &r.output {
                println!("written to {}", path.display());
            }
        })
    }
}
