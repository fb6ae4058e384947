use anyhow::{Context, Result};
use tracing::info;

use crate::cli::PresetsArgs;
use crate::preset;
use crate::util::write_json_pretty;

pub fn run(args: PresetsArgs) -> Result<()> {
    let preset = preset::builtin(args.preset);

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &preset)?;
            info!(preset = %preset.name, path = %path.display(), "wrote preset");
        }
        None => {
            let data = serde_json::to_string_pretty(&preset)
                .with_context(|| format!("failed to serialize preset {}", preset.name))?;
            println!("{data}");
        }
    }

    Ok(())
}
