use std::path::PathBuf;

use engine::{image_model::Model, params::GenerationParams};

#[derive(Debug, clap::Parser)]
#[command(
    name = "text2img",
    about = "Create images from a text prompt.",
    long_about = indoc::indoc! {"
        Create images from a text prompt.

        Without --output-path, images are written to the output directory and
        named after prompt, steps and scale. With --multi-prompt, every entry of
        the JSON file is rendered to its own output_path.
    "}
)]
pub struct Cli {
    #[command(flatten)]
    pub params: GenerationParams,

    /// Hosted model to call
    #[arg(long, value_enum)]
    pub model: Option<Model>,

    /// Pinned version id of the deployment [default: latest]
    #[arg(long)]
    pub model_version: Option<String>,

    /// Replicate API token
    #[arg(long, env = "REPLICATE_API_TOKEN", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory for generated file names [default: outputs]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,
}
