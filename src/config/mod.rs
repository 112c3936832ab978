mod file_config;

pub use file_config::{
    ClusterFileConfig, FileConfig, IamRoleFileConfig, S3FileConfig, TransformFileConfig,
};

use crate::transform::{ArtistPolicy, SongPolicy, UserPolicy};
use crate::warehouse_persistence::Dialect;
use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "dwh.toml";
pub const DEFAULT_PORT: u16 = 5439;
pub const DEFAULT_REGION: &str = "us-west-2";

/// Connection settings for the warehouse cluster.
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterSettings {
    pub host: String,
    pub db_name: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub dialect: Dialect,
}

impl ClusterSettings {
    /// `host:port/db`, safe to log.
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.db_name)
    }
}

impl fmt::Debug for ClusterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterSettings")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("dialect", &self.dialect)
            .finish()
    }
}

/// Object storage locations for the raw data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub log_data: String,
    pub log_jsonpath: String,
    pub song_data: String,
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformSettings {
    pub users: UserPolicy,
    pub songs: SongPolicy,
    pub artists: ArtistPolicy,
}

/// Fully resolved configuration, loaded once at startup and handed to every
/// pipeline stage.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cluster: ClusterSettings,
    pub iam_role_arn: String,
    pub storage: StorageSettings,
    pub transform: TransformSettings,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        Self::resolve(FileConfig::load(path)?)
    }

    /// Validates the raw file config and fills in defaults.
    pub fn resolve(file: FileConfig) -> Result<Self> {
        let cluster_file = file
            .cluster
            .ok_or_else(|| anyhow!("Missing [CLUSTER] section"))?;
        let dialect = match cluster_file.dialect {
            Some(s) => Dialect::parse(&s)
                .ok_or_else(|| anyhow!("Unknown CLUSTER.DIALECT {:?}", s))?,
            None => Dialect::default(),
        };
        let cluster = ClusterSettings {
            host: required(cluster_file.host, "CLUSTER", "HOST")?,
            db_name: required(cluster_file.db_name, "CLUSTER", "DB_NAME")?,
            user: required(cluster_file.db_user, "CLUSTER", "DB_USER")?,
            password: required(cluster_file.db_password, "CLUSTER", "DB_PASSWORD")?,
            port: cluster_file.db_port.unwrap_or(DEFAULT_PORT),
            dialect,
        };

        let iam_role_file = file
            .iam_role
            .ok_or_else(|| anyhow!("Missing [IAM_ROLE] section"))?;
        let iam_role_arn = required(iam_role_file.arn, "IAM_ROLE", "ARN")?;
        if !iam_role_arn.starts_with("arn:") {
            bail!("IAM_ROLE.ARN must be an ARN, got {:?}", iam_role_arn);
        }

        let s3_file = file.s3.ok_or_else(|| anyhow!("Missing [S3] section"))?;
        let storage = StorageSettings {
            log_data: s3_path(s3_file.log_data, "LOG_DATA")?,
            log_jsonpath: s3_path(s3_file.log_jsonpath, "LOG_JSONPATH")?,
            song_data: s3_path(s3_file.song_data, "SONG_DATA")?,
            region: s3_file
                .region
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        };

        let transform_file = file.transform.unwrap_or_default();
        let transform = TransformSettings {
            users: match transform_file.users {
                Some(s) => UserPolicy::parse(&s)
                    .ok_or_else(|| anyhow!("Unknown TRANSFORM.USERS {:?}", s))?,
                None => UserPolicy::default(),
            },
            songs: match transform_file.songs {
                Some(s) => SongPolicy::parse(&s)
                    .ok_or_else(|| anyhow!("Unknown TRANSFORM.SONGS {:?}", s))?,
                None => SongPolicy::default(),
            },
            artists: match transform_file.artists {
                Some(s) => ArtistPolicy::parse(&s)
                    .ok_or_else(|| anyhow!("Unknown TRANSFORM.ARTISTS {:?}", s))?,
                None => ArtistPolicy::default(),
            },
        };

        Ok(AppConfig {
            cluster,
            iam_role_arn,
            storage,
            transform,
        })
    }
}

fn required(value: Option<String>, section: &str, key: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => bail!("{}.{} must not be empty", section, key),
        None => bail!("Missing {}.{}", section, key),
    }
}

fn s3_path(value: Option<String>, key: &str) -> Result<String> {
    let path = required(value, "S3", key)?;
    if !path.starts_with("s3://") {
        bail!("S3.{} must start with s3://, got {:?}", key, path);
    }
    Ok(path)
}
