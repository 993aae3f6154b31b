//! Config template materialization
//!
//! Renders the tool config for a run from a template: the user-supplied
//! template file when one is configured and readable, otherwise the
//! built-in template matching the source kind. Placeholders use the
//! `{{name}}` form and every placeholder must be covered by the source
//! parameters or the destination, a leftover one fails the run early.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use embridge_common::{Error, Result};

use crate::models::{ImportJob, ImportParameters};

fn builtin_template(name: &str) -> &'static str {
    match name {
        "s3_import.yml" => include_str!("../templates/s3_import.yml"),
        _ => include_str!("../templates/local_import.yml"),
    }
}

fn render(template: &str, values: &[(&str, String)]) -> Result<String> {
    let mut rendered = template.to_string();
    for (key, value) in values {
        rendered = rendered.replace(&format!("{{{{{}}}}}", key), value);
    }

    if let Some(start) = rendered.find("{{") {
        let rest = &rendered[start + 2..];
        let name = rest.split("}}").next().unwrap_or("").trim();
        return Err(Error::Config(format!(
            "config template placeholder '{}' has no value for this source",
            name
        )));
    }

    Ok(rendered)
}

/// Renders run config artifacts under the scratch directory.
#[derive(Debug, Clone)]
pub struct ConfigMaterializer {
    scratch_dir: PathBuf,
    explicit_template: Option<PathBuf>,
}

impl ConfigMaterializer {
    pub fn new(scratch_dir: PathBuf, explicit_template: Option<PathBuf>) -> Self {
        Self {
            scratch_dir,
            explicit_template,
        }
    }

    fn template_text(&self, params: &ImportParameters) -> (String, String) {
        if let Some(path) = &self.explicit_template {
            match std::fs::read_to_string(path) {
                Ok(text) => return (text, path.display().to_string()),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        "template config file not readable, using the built-in template: {}",
                        e
                    );
                }
            }
        }

        let name = params.default_template();
        (builtin_template(name).to_string(), format!("builtin {}", name))
    }

    /// Render the config for this run and write it to the job's config
    /// path, creating the scratch directory if needed. Returns a
    /// description of the template the config came from.
    pub fn materialize(
        &self,
        job: &ImportJob,
        params: &ImportParameters,
        db_path: &Path,
        write_table: &str,
    ) -> Result<String> {
        std::fs::create_dir_all(&self.scratch_dir)?;

        let (template, description) = self.template_text(params);

        let mut values = vec![
            ("db_path", db_path.display().to_string()),
            ("table", write_table.to_string()),
        ];
        values.extend(params.template_values());

        let rendered = render(&template, &values)?;
        std::fs::write(&job.config_path, rendered)?;

        debug!(
            run_id = %job.run_id,
            template = %description,
            config = %job.config_path.display(),
            "rendered import config"
        );
        Ok(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn local_params() -> ImportParameters {
        ImportParameters::Local {
            path_prefix: "/data/input/kv_".to_string(),
        }
    }

    #[test]
    fn test_render_substitutes_every_occurrence() {
        let rendered = render(
            "a: '{{x}}'\nb: '{{x}}'\nc: '{{y}}'\n",
            &[("x", "one".to_string()), ("y", "two".to_string())],
        )
        .unwrap();
        assert_eq!(rendered, "a: 'one'\nb: 'one'\nc: 'two'\n");
    }

    #[test]
    fn test_render_rejects_unresolved_placeholder() {
        let err = render("bucket: '{{s3_bucket}}'\n", &[]).unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.contains("s3_bucket"), "{}", msg),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_materialize_local_builtin_template() {
        let dir = TempDir::new().unwrap();
        let materializer = ConfigMaterializer::new(dir.path().to_path_buf(), None);
        let job = ImportJob::new(dir.path());

        let description = materializer
            .materialize(&job, &local_params(), Path::new("/var/lib/bridge.db"), "kv_d1")
            .unwrap();
        assert_eq!(description, "builtin local_import.yml");

        let content = std::fs::read_to_string(&job.config_path).unwrap();
        let config: serde_yaml::Value = serde_yaml::from_str(&content).unwrap();
        assert_eq!(config["in"]["type"], "file");
        assert_eq!(config["in"]["path_prefix"], "/data/input/kv_");
        assert_eq!(config["in"]["decoders"][0]["type"], "gzip");
        assert_eq!(config["out"]["location"], "/var/lib/bridge.db");
        assert_eq!(config["out"]["table"], "kv_d1");
    }

    #[test]
    fn test_materialize_s3_builtin_template() {
        let dir = TempDir::new().unwrap();
        let materializer = ConfigMaterializer::new(dir.path().to_path_buf(), None);
        let job = ImportJob::new(dir.path());
        let params = ImportParameters::S3 {
            bucket: "data-bucket".to_string(),
            path_prefix: "exports/".to_string(),
            endpoint: "s3-us-west-2.amazonaws.com".to_string(),
            access_key_id: "AKIATEST".to_string(),
            secret_access_key: "secret".to_string(),
        };

        materializer
            .materialize(&job, &params, Path::new("/var/lib/bridge.db"), "kv_d0")
            .unwrap();

        let content = std::fs::read_to_string(&job.config_path).unwrap();
        let config: serde_yaml::Value = serde_yaml::from_str(&content).unwrap();
        assert_eq!(config["in"]["type"], "s3");
        assert_eq!(config["in"]["bucket"], "data-bucket");
        assert_eq!(config["in"]["path_prefix"], "exports/");
        assert_eq!(config["in"]["endpoint"], "s3-us-west-2.amazonaws.com");
        assert_eq!(config["out"]["table"], "kv_d0");
    }

    #[test]
    fn test_materialize_prefers_readable_explicit_template() {
        let dir = TempDir::new().unwrap();
        let template_path = dir.path().join("custom.yml");
        std::fs::write(&template_path, "in:\n  type: file\n  path_prefix: '{{path_prefix}}'\nout:\n  type: sqlite\n  location: '{{db_path}}'\n  table: '{{table}}'\n").unwrap();

        let materializer =
            ConfigMaterializer::new(dir.path().to_path_buf(), Some(template_path.clone()));
        let job = ImportJob::new(dir.path());

        let description = materializer
            .materialize(&job, &local_params(), Path::new("bridge.db"), "kv_d1")
            .unwrap();
        assert_eq!(description, template_path.display().to_string());
    }

    #[test]
    fn test_materialize_falls_back_when_explicit_template_missing() {
        let dir = TempDir::new().unwrap();
        let materializer = ConfigMaterializer::new(
            dir.path().to_path_buf(),
            Some(dir.path().join("nope.yml")),
        );
        let job = ImportJob::new(dir.path());

        let description = materializer
            .materialize(&job, &local_params(), Path::new("bridge.db"), "kv_d1")
            .unwrap();
        assert_eq!(description, "builtin local_import.yml");
        assert!(job.config_path.exists());
    }
}
