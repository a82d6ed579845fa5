//! Environment-driven configuration.

use anyhow::{Context, Result};

use crate::constants::DEFAULT_MAX_ASSET_BYTES;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,

    pub s3_bucket: String,
    pub s3_region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces). None for AWS.
    pub s3_endpoint_url: Option<String>,

    pub host: String,
    pub port: u16,

    /// Transfer-size budget per gallery image, in bytes.
    pub max_asset_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Best-effort: a missing .env file is fine in production.
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("DATABASE_MAX_CONNECTIONS must be a number")?
            .unwrap_or(10);

        let s3_bucket =
            std::env::var("AWS_BUCKET_NAME").context("AWS_BUCKET_NAME must be set")?;
        let s3_region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let s3_endpoint_url = std::env::var("S3_ENDPOINT_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .context("PORT must be a number")?
            .unwrap_or(8080);

        let max_asset_bytes = std::env::var("MAX_ASSET_BYTES")
            .ok()
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("MAX_ASSET_BYTES must be a number")?
            .unwrap_or(DEFAULT_MAX_ASSET_BYTES);

        Ok(Config {
            database_url,
            database_max_connections,
            s3_bucket,
            s3_region,
            s3_endpoint_url,
            host,
            port,
            max_asset_bytes,
        })
    }
}
