//! Import source parameters
//!
//! Each variant describes where the raw gzip-compressed CSV files live.
//! The variant selects the built-in config template and supplies the
//! values substituted into it.

use serde::{Deserialize, Serialize};

/// Where an import reads its input files from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ImportParameters {
    /// Files on the local filesystem.
    Local {
        /// Path prefix matching the input files (embulk glob semantics).
        path_prefix: String,
    },
    /// Files in an S3-compatible object store.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Key prefix matching the input files.
        path_prefix: String,
        /// Endpoint host, e.g. "s3-us-west-2.amazonaws.com".
        endpoint: String,
        /// Access key id.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
    },
}

impl ImportParameters {
    /// File name of the built-in config template for this source kind.
    pub fn default_template(&self) -> &'static str {
        match self {
            ImportParameters::Local { .. } => "local_import.yml",
            ImportParameters::S3 { .. } => "s3_import.yml",
        }
    }

    /// Identity of the source location, recorded on the destination node
    /// after a successful run so unchanged imports can be skipped.
    pub fn source_marker(&self) -> String {
        match self {
            ImportParameters::Local { path_prefix } => path_prefix.clone(),
            ImportParameters::S3 {
                bucket, path_prefix, ..
            } => format!("{}/{}", bucket, path_prefix),
        }
    }

    /// Placeholder values this source contributes to the config template.
    pub fn template_values(&self) -> Vec<(&'static str, String)> {
        match self {
            ImportParameters::Local { path_prefix } => {
                vec![("path_prefix", path_prefix.clone())]
            }
            ImportParameters::S3 {
                bucket,
                path_prefix,
                endpoint,
                access_key_id,
                secret_access_key,
            } => vec![
                ("s3_bucket", bucket.clone()),
                ("s3_path_prefix", path_prefix.clone()),
                ("s3_endpoint", endpoint.clone()),
                ("aws_access_key", access_key_id.clone()),
                ("aws_secret_key", secret_access_key.clone()),
            ],
        }
    }
}
