use std::path::PathBuf;

use nonempty::NonEmpty;
use strum::Display;

use crate::prompts::PromptEntry;

/// Named denoising strategy, passed through to the model by its identifier.
#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Hash,
    PartialEq,
    Eq,
    Default,
)]
#[value(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Sampler {
    #[default]
    PSampler,
    DdimSampler,
    PlmsSampler,
}

/// Generation settings for one run. Populated once from the command line.
#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct GenerationParams {
    /// A file with a list of prompts
    #[arg(long)]
    pub multi_prompt: Option<PathBuf>,

    /// Save the result in the output_path
    ///
    /// When the run writes more than one image to this path (--samples or
    /// --iters above 1), each file gets an index before the extension:
    /// out.png becomes out-0.png, out-1.png and so on.
    #[arg(long)]
    pub output_path: Option<PathBuf>,

    /// The prompt to render into an image
    #[arg(long, required_unless_present = "multi_prompt")]
    pub prompt: Option<String>,

    /// The input image to use for image-to-image diffusion
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// The cpu or cuda device to use to render images
    #[arg(long, default_value = "cuda")]
    pub device: String,

    /// Image height in pixels
    #[arg(long, default_value_t = 512)]
    pub height: u32,

    /// Image width in pixels
    #[arg(long, default_value_t = 512)]
    pub width: u32,

    /// Number of images to create per run
    #[arg(long, default_value_t = 1)]
    pub samples: u32,

    /// Override the sampler used to denoise the image
    #[arg(long, value_enum, default_value_t)]
    pub sampler: Sampler,

    /// Number of times to run pipeline
    #[arg(long, default_value_t = 1)]
    pub iters: u32,

    /// The prompt to not render into an image
    #[arg(long)]
    pub negative_prompt: Option<String>,

    /// How closely the image should follow the prompt
    #[arg(long, default_value_t = 7.5)]
    pub scale: f64,

    /// How closely the image embedding should follow the prompt
    #[arg(long, default_value_t = 4.0)]
    pub prior_scale: f64,

    /// Number of sampling steps
    #[arg(long, default_value_t = 50)]
    pub steps: u32,

    /// Number of prior sampling steps
    #[arg(long, default_value_t = 25)]
    pub prior_steps: u32,
}

impl GenerationParams {
    /// Takes the prompt and the number of iterations from a prompt file.
    pub fn with_multi_prompt(self, entries: &NonEmpty<PromptEntry>) -> Self {
        Self {
            prompt: Some(entries.head.prompt.clone()),
            iters: u32::try_from(entries.len()).unwrap_or(u32::MAX),
            ..self
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            multi_prompt: None,
            output_path: None,
            prompt: None,
            image: None,
            device: "cuda".into(),
            height: 512,
            width: 512,
            samples: 1,
            sampler: Sampler::default(),
            iters: 1,
            negative_prompt: None,
            scale: 7.5,
            prior_scale: 4.0,
            steps: 50,
            prior_steps: 25,
        }
    }
}
