use std::path::PathBuf;

use crate::error::{PaysheetError, Result};
use crate::settings::{save_settings, settings_path, shellexpand_path, Settings};

pub fn run(config: Option<&str>, force: bool) -> Result<()> {
    let path = config
        .map(|c| PathBuf::from(shellexpand_path(c)))
        .unwrap_or_else(settings_path);

    if path.exists() && !force {
        return Err(PaysheetError::Settings(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    save_settings(&Settings::default(), &path)?;
    println!("Settings written to {}", path.display());
    Ok(())
}
