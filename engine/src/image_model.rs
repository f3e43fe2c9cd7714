use std::pin::Pin;

use color_eyre::Result;
use serde::Deserialize;
use serde_json::{Value, json};
use strum::Display;

pub mod replicate;

use crate::{
    ImgModBox,
    params::{GenerationParams, Sampler},
};

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    Default,
)]
pub enum Model {
    #[default]
    #[strum(to_string = "Kandinsky 2.1")]
    Kandinsky21,
    #[strum(to_string = "Kandinsky 2.2")]
    Kandinsky22,
}

impl Model {
    /// Without a `version`, the latest published version of the deployment
    /// is used.
    pub fn make(
        &self,
        key: String,
        base_url: Option<String>,
        version: Option<String>,
    ) -> ImgModBox {
        let mut model = replicate::ReplicateImageModel::new(
            *self,
            key,
            self.replicate_slug().into(),
            match self {
                Model::Kandinsky21 => kandinsky21_input,
                Model::Kandinsky22 => kandinsky22_input,
            },
        );
        if let Some(url) = base_url {
            model = model.with_base_url(url);
        }
        if let Some(version) = version {
            model = model.with_version(version);
        }
        Box::new(model)
    }

    /// Flags set away from their defaults that this deployment has no input for.
    pub fn ignored_flags(&self, params: &GenerationParams) -> Vec<&'static str> {
        let defaults = GenerationParams::default();
        match self {
            Model::Kandinsky21 => params
                .negative_prompt
                .is_some()
                .then_some("--negative-prompt")
                .into_iter()
                .collect(),
            Model::Kandinsky22 => [
                (params.scale != defaults.scale, "--scale"),
                (params.sampler != defaults.sampler, "--sampler"),
                (params.prior_scale != defaults.prior_scale, "--prior-scale"),
            ]
            .into_iter()
            .filter_map(|(set, flag)| set.then_some(flag))
            .collect(),
        }
    }

    /// `owner/name` of the hosted deployment.
    pub fn replicate_slug(&self) -> &'static str {
        match self {
            Model::Kandinsky21 => "ai-forever/kandinsky-2",
            Model::Kandinsky22 => "ai-forever/kandinsky-2.2",
        }
    }
}

/// Parameters of a single model call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub width: u32,
    pub height: u32,
    pub sampler: Sampler,
    pub steps: u32,
    pub scale: f64,
    pub prior_steps: u32,
    pub prior_scale: f64,
    pub batch_size: u32,
    pub device: String,
}

impl GenerationRequest {
    pub fn new(params: &GenerationParams, prompt: &str) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: params.negative_prompt.clone(),
            width: params.width,
            height: params.height,
            sampler: params.sampler,
            steps: params.steps,
            scale: params.scale,
            prior_steps: params.prior_steps,
            prior_scale: params.prior_scale,
            batch_size: params.samples,
            device: params.device.clone(),
        }
    }
}

// The 2.1 deployment takes prior_steps as a string.
fn kandinsky21_input(req: &GenerationRequest) -> Value {
    json!({
        "prompt": req.prompt,
        "num_inference_steps": req.steps,
        "guidance_scale": req.scale,
        "scheduler": req.sampler.to_string(),
        "prior_cf_scale": req.prior_scale,
        "prior_steps": req.prior_steps.to_string(),
        "width": req.width,
        "height": req.height,
        "batch_size": req.batch_size,
        "output_format": "png",
    })
}

// 2.2 has no sampler or guidance inputs.
fn kandinsky22_input(req: &GenerationRequest) -> Value {
    let mut input = json!({
        "prompt": req.prompt,
        "width": req.width,
        "height": req.height,
        "num_outputs": req.batch_size,
        "num_inference_steps": req.steps,
        "num_inference_steps_prior": req.prior_steps,
        "output_format": "png",
    });
    if let Some(negative) = &req.negative_prompt {
        input["negative_prompt"] = json!(negative);
    }
    input
}

/// Encoded image bytes as returned by the model.
pub struct Image {
    pub data: Vec<u8>,
    /// Seconds the model spent on the prediction, when reported.
    pub predict_time: Option<f64>,
}

pub trait ImageModel {
    fn get_images<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Image>>> + Send + 'a>>;

    fn model(&self) -> Model;
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use httpmock::{Method::GET, Method::POST, MockServer};

    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            &GenerationParams {
                negative_prompt: Some("blurry".into()),
                samples: 2,
                ..GenerationParams::default()
            },
            "a cat",
        )
    }

    #[test]
    fn kandinsky21_input_serialization() {
        let expect = expect![[r#"{"batch_size":2,"guidance_scale":7.5,"height":512,"num_inference_steps":50,"output_format":"png","prior_cf_scale":4.0,"prior_steps":"25","prompt":"a cat","scheduler":"p_sampler","width":512}"#]];
        expect.assert_eq(&kandinsky21_input(&request()).to_string());
    }

    #[test]
    fn kandinsky22_input_serialization() {
        let expect = expect![[r#"{"height":512,"negative_prompt":"blurry","num_inference_steps":50,"num_inference_steps_prior":25,"num_outputs":2,"output_format":"png","prompt":"a cat","width":512}"#]];
        expect.assert_eq(&kandinsky22_input(&request()).to_string());
    }

    #[test]
    fn request_carries_params() {
        let req = request();
        assert_eq!(req.batch_size, 2);
        assert_eq!(req.device, "cuda");
        assert_eq!(req.sampler, Sampler::PSampler);
        assert_eq!(Model::default().replicate_slug(), "ai-forever/kandinsky-2");
    }

    #[test]
    fn ignored_flags_per_deployment() {
        let defaults = GenerationParams::default();
        assert!(Model::Kandinsky21.ignored_flags(&defaults).is_empty());
        assert!(Model::Kandinsky22.ignored_flags(&defaults).is_empty());

        let params = GenerationParams {
            negative_prompt: Some("blurry".into()),
            scale: 3.0,
            sampler: Sampler::DdimSampler,
            prior_scale: 1.0,
            ..GenerationParams::default()
        };
        assert_eq!(
            Model::Kandinsky21.ignored_flags(&params),
            vec!["--negative-prompt"]
        );
        assert_eq!(
            Model::Kandinsky22.ignored_flags(&params),
            vec!["--scale", "--sampler", "--prior-scale"]
        );
    }

    #[tokio::test]
    async fn made_model_posts_deployment_input() -> Result<()> {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/predictions")
                    .header("authorization", "Bearer key")
                    .json_body(json!({
                        "version": "v22",
                        "input": kandinsky22_input(&request()),
                    }));
                then.status(201).json_body(json!({
                    "id": "p1",
                    "status": "succeeded",
                    "output": [server.url("/a.png"), server.url("/b.png")],
                }));
            })
            .await;
        for file in ["/a.png", "/b.png"] {
            server
                .mock_async(|when, then| {
                    when.method(GET).path(file);
                    then.status(200).body(b"png");
                })
                .await;
        }

        let imgmod = Model::Kandinsky22.make(
            "key".into(),
            Some(format!("{}/", server.base_url())),
            Some("v22".into()),
        );
        let images = imgmod.get_images(&request()).await?;

        create.assert_async().await;
        assert_eq!(imgmod.model(), Model::Kandinsky22);
        assert_eq!(images.len(), 2);
        Ok(())
    }
}
