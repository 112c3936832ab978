use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Raw contents of the `dwh.toml` configuration file. Every value is
/// optional here; `AppConfig::resolve` decides what is required.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    #[serde(rename = "CLUSTER")]
    pub cluster: Option<ClusterFileConfig>,
    #[serde(rename = "IAM_ROLE")]
    pub iam_role: Option<IamRoleFileConfig>,
    #[serde(rename = "S3")]
    pub s3: Option<S3FileConfig>,
    #[serde(rename = "TRANSFORM")]
    pub transform: Option<TransformFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ClusterFileConfig {
    pub host: Option<String>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_port: Option<u16>,
    /// "redshift" (default) or "postgres"
    pub dialect: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct IamRoleFileConfig {
    pub arn: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct S3FileConfig {
    pub log_data: Option<String>,
    pub log_jsonpath: Option<String>,
    pub song_data: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TransformFileConfig {
    /// "latest_level" (default) or "distinct"
    pub users: Option<String>,
    /// "played_only" (default) or "all"
    pub songs: Option<String>,
    /// "one_per_artist" (default) or "distinct"
    pub artists: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
