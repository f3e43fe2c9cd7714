use crate::image_model::ImageModel;

pub mod image_model;
pub mod jobs;
pub mod naming;
pub mod params;
pub mod prompts;
pub mod run;

pub type ImgModBox = Box<dyn ImageModel + Send>;

/// Directory used for derived file names when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
