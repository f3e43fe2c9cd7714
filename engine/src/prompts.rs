use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, eyre},
};
use nonempty::NonEmpty;
use serde::Deserialize;

/// One entry of a prompt file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptEntry {
    pub prompt: String,
    pub output_path: PathBuf,
}

/// Reads a JSON array of `{"prompt": .., "output_path": ..}` objects.
pub fn read_multi_prompt(path: &Path) -> Result<NonEmpty<PromptEntry>> {
    let src = fs::read_to_string(path)
        .wrap_err_with(|| format!("Couldn't read prompt file {}", path.display()))?;
    parse_multi_prompt(&src).wrap_err_with(|| format!("Invalid prompt file {}", path.display()))
}

pub fn parse_multi_prompt(src: &str) -> Result<NonEmpty<PromptEntry>> {
    let entries: Vec<PromptEntry> = serde_json::from_str(src)?;
    NonEmpty::from_vec(entries).ok_or(eyre!("The prompt file contains no prompts"))
}
