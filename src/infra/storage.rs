use anyhow::{anyhow, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use url::Url;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
    bucket: String,
    public_endpoint: Option<String>,
}

impl ObjectStorage {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let region_provider = RegionProviderChain::first_try(Region::new(config.s3_region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config)
            .region(shared_config.region().cloned())
            .endpoint_url(config.s3_endpoint.clone())
            .force_path_style(true);
        if let Some(provider) = shared_config.credentials_provider() {
            s3_builder = s3_builder.credentials_provider(provider);
        }
        let s3_config = s3_builder.build();

        let client = Client::from_conf(s3_config);

        Ok(Self {
            client,
            bucket: config.s3_bucket.clone(),
            public_endpoint: config.s3_public_endpoint.clone(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Swap a presigned URL's origin for the public endpoint when one is
    /// configured; internal and browser-reachable hostnames differ behind
    /// most S3-compatible providers.
    pub fn rewrite_public(&self, presigned: &str) -> Result<String> {
        let Some(public) = &self.public_endpoint else {
            return Ok(presigned.to_string());
        };
        let mut original = Url::parse(presigned)?;
        let public = match Url::parse(public) {
            Ok(url) => url,
            Err(_) => Url::parse(&format!("http://{}", public))?,
        };
        original
            .set_scheme(public.scheme())
            .map_err(|_| anyhow!("invalid S3_PUBLIC_ENDPOINT scheme"))?;
        original
            .set_host(public.host_str())
            .map_err(|err| anyhow!("invalid S3_PUBLIC_ENDPOINT host: {}", err))?;
        original.set_port(public.port()).ok();
        Ok(original.to_string())
    }
}
