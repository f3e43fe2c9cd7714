use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, eyre},
};
use engine::{
    DEFAULT_OUTPUT_DIR, image_model::Model, params::GenerationParams, prompts::read_multi_prompt,
};
use log::{debug, info};
use serde::{Deserialize, de::DeserializeOwned};

use crate::cli::Cli;

pub mod cli;

/// Settings kept between runs, see [`config_path`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub replicate_token: Option<String>,
    pub model: Option<Model>,
    pub output_dir: Option<PathBuf>,
    pub replicate_base_url: Option<String>,
    pub replicate_version: Option<String>,
}

/// Command line merged over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub params: GenerationParams,
    pub model: Model,
    pub api_key: String,
    pub output_dir: PathBuf,
    pub base_url: Option<String>,
    pub version: Option<String>,
}

impl Settings {
    pub fn resolve(cli: Cli, cfg: Config) -> Result<Self> {
        let api_key = cli.api_key.or(cfg.replicate_token).ok_or(eyre!(
            "No Replicate token, pass --api-key, set REPLICATE_API_TOKEN or add replicate_token to {}",
            config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".into())
        ))?;
        Ok(Self {
            params: cli.params,
            model: cli.model.or(cfg.model).unwrap_or_default(),
            api_key,
            output_dir: cli
                .output_dir
                .or(cfg.output_dir)
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.into()),
            base_url: cfg.replicate_base_url,
            version: cli.model_version.or(cfg.replicate_version),
        })
    }
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    let cfg = match &cli.config {
        Some(path) => load_ron_file(path)?,
        None => load_config()?.unwrap_or_default(),
    };
    let settings = Settings::resolve(cli, cfg)?;
    debug!("Settings: model {}, output dir {}", settings.model, settings.output_dir.display());

    let multi_prompts = settings
        .params
        .multi_prompt
        .as_deref()
        .map(read_multi_prompt)
        .transpose()?;
    let params = match &multi_prompts {
        Some(entries) => settings.params.with_multi_prompt(entries),
        None => settings.params,
    };

    let imgmod = settings
        .model
        .make(settings.api_key, settings.base_url, settings.version);
    let written = engine::run::run(
        &*imgmod,
        &params,
        multi_prompts.as_ref(),
        &settings.output_dir,
    )
    .await?;
    info!("Wrote {} image(s)", written.len());
    Ok(())
}

pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path)
        .wrap_err_with(|| format!("Couldn't read {}", path.display()))?;
    ron::from_str(&src).wrap_err_with(|| format!("Invalid config file {}", path.display()))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or(eyre!("Couldn't get config dir"))?
        .join("text2img.ron"))
}

pub fn load_config() -> Result<Option<Config>> {
    let path = config_path()?;
    if !path.exists() {
        Ok(None)
    } else {
        load_ron_file(&path).map(Some)
    }
}
