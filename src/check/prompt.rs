//! Interactive prompts, used only when stdin is a terminal.

use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

pub fn input_path(theme: &ColorfulTheme) -> Result<PathBuf> {
    let path: String = Input::with_theme(theme)
        .with_prompt("Path to CSV or Excel file with addresses")
        .interact_text()
        .context("Input error")?;
    Ok(PathBuf::from(path.trim()))
}

/// Ask for a custom boundaries file; `None` means use the default dataset.
pub fn boundaries_override(theme: &ColorfulTheme) -> Result<Option<String>> {
    let custom = Confirm::with_theme(theme)
        .with_prompt("Do you have a custom tribal boundaries file?")
        .default(false)
        .interact()
        .context("Confirm error")?;

    if !custom {
        return Ok(None);
    }

    let path: String = Input::with_theme(theme)
        .with_prompt("Path to boundaries file (shapefile, .zip or GeoJSON)")
        .interact_text()
        .context("Input error")?;
    Ok(Some(path.trim().to_string()))
}

pub fn address_column(theme: &ColorfulTheme, columns: &[&str]) -> Result<usize> {
    Select::with_theme(theme)
        .with_prompt("Which column holds the address?")
        .items(columns)
        .default(0)
        .interact()
        .context("Selection error")
}
