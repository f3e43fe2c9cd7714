use clap::Parser;
use color_eyre::Result;
use engine::{
    image_model::{GenerationRequest, Model},
    params::GenerationParams,
    run::save_image,
};

/// Sends one prompt with default settings to a hosted model.
#[derive(clap::Parser)]
struct Arg {
    model: Model,
    key: String,
    description: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();
    let Arg {
        model,
        key,
        description,
    } = Arg::parse();
    let imgmod = model.make(key, None, None);

    let request = GenerationRequest::new(&GenerationParams::default(), &description);
    let images = imgmod.get_images(&request).await?;
    for (i, image) in images.iter().enumerate() {
        let path = format!("output-{i}.png");
        save_image(&image.data, path.as_ref())?;
        println!("Saved {path}, {} bytes", image.data.len());
    }

    Ok(())
}
