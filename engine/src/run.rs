use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::{Result, eyre::WrapErr as _};
use image::ImageFormat;
use log::{debug, info, warn};
use nonempty::NonEmpty;

use crate::{
    image_model::{GenerationRequest, ImageModel},
    jobs::plan,
    params::GenerationParams,
    prompts::PromptEntry,
};

/// Calls the model once per job and saves every returned image. Stops at the
/// first error. Returns the written paths in order.
pub async fn run(
    model: &dyn ImageModel,
    params: &GenerationParams,
    multi_prompts: Option<&NonEmpty<PromptEntry>>,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    if let Some(image) = &params.image {
        warn!(
            "{} only does text-to-image, ignoring --image {}",
            model.model(),
            image.display()
        );
    }
    for flag in model.model().ignored_flags(params) {
        warn!("{} has no input for {flag}, ignoring it", model.model());
    }
    debug!("Requested device {:?}, the hosted model picks its own", params.device);

    let jobs = plan(params, multi_prompts)?;
    let mut written = vec![];
    for job in &jobs {
        info!(
            "Generating {}/{}: {:?}",
            job.iteration + 1,
            jobs.len(),
            job.prompt
        );
        let request = GenerationRequest::new(params, &job.prompt);
        let images = model
            .get_images(&request)
            .await
            .wrap_err_with(|| format!("Generation failed for prompt {:?}", job.prompt))?;
        if images.len() != params.samples as usize {
            warn!(
                "Asked for {} image(s), the model returned {}",
                params.samples,
                images.len()
            );
        }

        for (sample, img) in (0..).zip(images) {
            let path = job.output_path(params, sample, out_dir);
            save_image(&img.data, &path)?;
            match img.predict_time {
                Some(secs) => info!("Saved {} ({secs:.1}s)", path.display()),
                None => info!("Saved {}", path.display()),
            }
            written.push(path);
        }
    }
    Ok(written)
}

/// Decodes `data` and writes it in the format implied by the extension of
/// `path`, PNG if there is none.
pub fn save_image(data: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Couldn't create {}", parent.display()))?;
    }
    let img = image::load_from_memory(data).wrap_err("Model returned undecodable image data")?;
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    img.save_with_format(path, format)
        .wrap_err_with(|| format!("Couldn't save {}", path.display()))?;
    Ok(())
}
