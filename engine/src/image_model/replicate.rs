use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, eyre},
};
use log::debug;
use reqwest::{Client, Response};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::time::sleep;

use crate::image_model::{GenerationRequest, Image, ImageModel, Model};

mod error;
pub use error::ReplicateApiError;

pub const REPLICATE_BASE_URL: &str = "https://api.replicate.com";

#[derive(Clone)]
pub struct ReplicateImageModel {
    model: Model,
    client: Client,
    api_key: String,
    base_url: String,
    slug: String,
    version: Option<String>,
    poll_interval: Duration,
    input_builder: Arc<dyn Fn(&GenerationRequest) -> Value + Send + Sync>,
}

impl ReplicateImageModel {
    pub fn new(
        model: Model,
        api_key: String,
        slug: String,
        input_builder: impl Fn(&GenerationRequest) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            model,
            client: Client::new(),
            api_key,
            base_url: REPLICATE_BASE_URL.into(),
            slug,
            version: None,
            poll_interval: Duration::from_millis(500),
            input_builder: Arc::new(input_builder),
        }
    }

    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..self
        }
    }

    /// Pins the deployment version. Without one, the latest version of the
    /// model is looked up before each prediction.
    pub fn with_version(self, version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..self
        }
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }

    async fn resolve_version(&self) -> Result<String> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }
        let url = format!("{}/v1/models/{}", self.base_url, self.slug);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let info: ModelInfo = parse_response(resp).await?;
        let version = info
            .latest_version
            .ok_or_else(|| eyre!("{} has no published version", self.slug))?
            .id;
        debug!("Using {}:{version}", self.slug);
        Ok(version)
    }

    async fn create_prediction(&self, request: &GenerationRequest) -> Result<Prediction> {
        let version = self.resolve_version().await?;
        let resp = self
            .client
            .post(format!("{}/v1/predictions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "version": version,
                "input": (self.input_builder)(request),
            }))
            .send()
            .await?;
        parse_response(resp).await
    }

    async fn wait_for(&self, mut prediction: Prediction) -> Result<Prediction> {
        loop {
            match prediction.status {
                Status::Succeeded => return Ok(prediction),
                Status::Failed | Status::Canceled | Status::Aborted => {
                    return Err(ReplicateApiError::PredictionFailed {
                        status: format!("{:?}", prediction.status).to_lowercase(),
                        message: prediction
                            .error
                            .as_ref()
                            .map(error_message)
                            .unwrap_or_else(|| "no error message".into()),
                        id: prediction.id,
                    }
                    .into());
                }
                Status::Starting | Status::Processing | Status::Other => {
                    debug!("Prediction {} is {:?}", prediction.id, prediction.status);
                    sleep(self.poll_interval).await;
                }
            }

            let get_url = prediction
                .urls
                .as_ref()
                .map(|u| u.get.clone())
                .ok_or_else(|| eyre!("Missing prediction get URL:\n{prediction:#?}"))?;
            let resp = self
                .client
                .get(&get_url)
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            prediction = parse_response(resp).await?;
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await
            .wrap_err_with(|| format!("Couldn't download {url}"))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    Aborted,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Urls {
    get: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Output {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct Metrics {
    predict_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    latest_version: Option<VersionInfo>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: Status,
    output: Option<Output>,
    error: Option<Value>,
    urls: Option<Urls>,
    metrics: Option<Metrics>,
}

async fn parse_response<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ReplicateApiError::from_response(status.as_u16(), &body).into());
    }
    serde_json::from_str(&body).wrap_err_with(|| format!("Unexpected response body: {body}"))
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ImageModel for ReplicateImageModel {
    fn get_images<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Image>>> + Send + 'a>> {
        Box::pin(async move {
            let prediction = self.create_prediction(request).await?;
            let prediction = self.wait_for(prediction).await?;

            let predict_time = prediction.metrics.as_ref().and_then(|m| m.predict_time);
            let urls = match prediction.output {
                Some(Output::One(url)) => vec![url],
                Some(Output::Many(urls)) => urls,
                None => vec![],
            };
            if urls.is_empty() {
                return Err(eyre!("Prediction {} has no output image", prediction.id));
            }

            let mut images = Vec::with_capacity(urls.len());
            for url in urls {
                images.push(Image {
                    data: self.download(&url).await?,
                    predict_time,
                });
            }
            Ok(images)
        })
    }

    fn model(&self) -> Model {
        self.model
    }
}
