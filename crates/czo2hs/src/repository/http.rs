use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use serde_json::json;
use tracing::{debug, info};

use crate::config::RepositoryConfig;
use crate::metadata::{Coverage, Creator};
use crate::repository::{ClientError, RepositoryClient};

/// REST client for a HydroShare-style repository API. All calls are blocking
/// request/response; timeouts live here, not in the migration core.
pub struct HttpRepositoryClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    /// Concrete transfers stage the source bytes here before upload.
    cache_dir: PathBuf,
    /// Reuse a previously staged copy instead of re-fetching the source URL.
    use_cached_files: bool,
}

impl HttpRepositoryClient {
    pub fn new(
        config: &RepositoryConfig,
        cache_dir: impl Into<PathBuf>,
        use_cached_files: bool,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            cache_dir: cache_dir.into(),
            use_cached_files,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.username, Some(&self.password))
    }

    fn check(operation: &'static str, response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(ClientError::Api {
            operation,
            status: status.as_u16(),
            body,
        })
    }

    /// Updates science metadata elements. One call per element group keeps
    /// failure attribution possible; the API gives no transactional batch.
    fn update_scimeta(
        &self,
        operation: &'static str,
        resource_id: &str,
        elements: serde_json::Value,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!("/hsapi/resource/{}/scimeta/elements/", resource_id));
        let response = self.authed(self.client.put(&url)).json(&elements).send()?;
        Self::check(operation, response)?;
        debug!(resource_id, operation, "Updated science metadata");
        Ok(())
    }

    /// Staging subdirectory for one source URL/path. Staged copies are
    /// namespaced by source, not basename alone: different rows routinely
    /// share names like `data.csv`, and a shared staging path would reuse
    /// one row's bytes for another.
    fn staging_dir(&self, source: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        self.cache_dir.join(format!("{:016x}", hasher.finish()))
    }

    /// Stages the source URL as a local file, reusing a cached copy when
    /// allowed, and returns the local path.
    fn stage_local_copy(&self, file_name: &str, source: &str) -> Result<PathBuf, ClientError> {
        let staging_dir = self.staging_dir(source);
        let local_path = staging_dir.join(file_name);
        if self.use_cached_files && local_path.is_file() {
            debug!(file_name, "Reusing cached local copy");
            return Ok(local_path);
        }

        std::fs::create_dir_all(&staging_dir)?;

        if source.starts_with("http://") || source.starts_with("https://") {
            let mut response = self
                .client
                .get(source)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| ClientError::Download {
                    url: source.to_string(),
                    reason: e.to_string(),
                })?;
            let mut out = std::fs::File::create(&local_path)?;
            response
                .copy_to(&mut out)
                .map_err(|e| ClientError::Download {
                    url: source.to_string(),
                    reason: e.to_string(),
                })?;
        } else {
            // Already a local path; copy it into the staging dir.
            std::fs::copy(Path::new(source), &local_path)?;
        }
        Ok(local_path)
    }
}

impl RepositoryClient for HttpRepositoryClient {
    fn create_resource(
        &self,
        title: &str,
        extra_metadata: &BTreeMap<String, String>,
    ) -> Result<String, ClientError> {
        let url = self.url("/hsapi/resource/");
        let body = json!({
            "resource_type": "CompositeResource",
            "title": title,
            "extra_metadata": serde_json::to_string(extra_metadata)
                .unwrap_or_else(|_| "{}".to_string()),
        });
        let response = self.authed(self.client.post(&url)).json(&body).send()?;
        let payload: serde_json::Value =
            Self::check("create-resource", response)?.json()?;

        let resource_id = payload
            .get("resource_id")
            .and_then(|v| v.as_str())
            .ok_or(ClientError::MissingField("resource_id"))?
            .to_string();
        info!(resource_id, "Created target resource");
        Ok(resource_id)
    }

    fn set_description(&self, resource_id: &str, abstract_text: &str) -> Result<(), ClientError> {
        self.update_scimeta(
            "set-description",
            resource_id,
            json!({ "description": abstract_text }),
        )
    }

    fn set_keywords(
        &self,
        resource_id: &str,
        keywords: &BTreeSet<String>,
    ) -> Result<(), ClientError> {
        let subjects: Vec<serde_json::Value> =
            keywords.iter().map(|kw| json!({ "value": kw })).collect();
        self.update_scimeta("set-keywords", resource_id, json!({ "subjects": subjects }))
    }

    fn set_creator(&self, resource_id: &str, creator: &Creator) -> Result<(), ClientError> {
        self.update_scimeta(
            "set-creator",
            resource_id,
            json!({
                "creators": [{
                    "name": creator.name,
                    "organization": creator.organization,
                    "email": creator.email,
                }]
            }),
        )
    }

    fn set_coverage(&self, resource_id: &str, coverage: &Coverage) -> Result<(), ClientError> {
        // Box and period travel in one payload; see trait docs.
        self.update_scimeta(
            "set-coverage",
            resource_id,
            json!({
                "coverages": [
                    {
                        "type": "box",
                        "value": {
                            "northlimit": coverage.spatial.north,
                            "southlimit": coverage.spatial.south,
                            "eastlimit": coverage.spatial.east,
                            "westlimit": coverage.spatial.west,
                            "name": coverage.spatial.name,
                            "units": "Decimal degrees",
                            "projection": "WGS 84 EPSG:4326",
                        },
                    },
                    {
                        "type": "period",
                        "value": {
                            "start": coverage.temporal.start,
                            "end": coverage.temporal.end,
                        },
                    },
                ]
            }),
        )
    }

    fn register_reference_file(
        &self,
        resource_id: &str,
        file_name: &str,
        ref_url: &str,
    ) -> Result<String, ClientError> {
        let url = self.url(&format!(
            "/hsapi/resource/{}/functions/create-referenced-file/",
            resource_id
        ));
        let body = json!({
            "path": "data/contents",
            "name": file_name,
            "ref_url": ref_url,
        });
        let response = self.authed(self.client.post(&url)).json(&body).send()?;
        let payload: serde_json::Value =
            Self::check("register-reference-file", response)?.json()?;

        payload
            .get("file_id")
            .map(json_id_to_string)
            .ok_or(ClientError::MissingField("file_id"))
    }

    fn upload_concrete_file(
        &self,
        resource_id: &str,
        file_name: &str,
        source: &str,
    ) -> Result<(), ClientError> {
        let local_path = self.stage_local_copy(file_name, source)?;

        let url = self.url(&format!("/hsapi/resource/{}/files/", resource_id));
        let form = multipart::Form::new().file("file", &local_path)?;
        let response = self.authed(self.client.post(&url)).multipart(form).send()?;
        Self::check("upload-concrete-file", response)?;
        debug!(resource_id, file_name, "Uploaded concrete file");
        Ok(())
    }

    fn find_file_id_by_name(
        &self,
        resource_id: &str,
        file_name: &str,
    ) -> Result<String, ClientError> {
        let url = self.url(&format!("/hsapi/resource/{}/files/", resource_id));
        let response = self.authed(self.client.get(&url)).send()?;
        let payload: serde_json::Value =
            Self::check("find-file-id-by-name", response)?.json()?;

        let results = payload
            .get("results")
            .and_then(|v| v.as_array())
            .ok_or(ClientError::MissingField("results"))?;

        for entry in results {
            let name = entry
                .get("file_name")
                .and_then(|v| v.as_str())
                .or_else(|| {
                    entry
                        .get("url")
                        .and_then(|v| v.as_str())
                        .and_then(|u| u.rsplit('/').next())
                });
            if name == Some(file_name) {
                if let Some(id) = entry.get("id") {
                    return Ok(json_id_to_string(id));
                }
            }
        }
        Err(ClientError::FileNotFound(file_name.to_string()))
    }

    fn attach_file_metadata(
        &self,
        resource_id: &str,
        file_id: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!(
            "/hsapi/resource/{}/files/{}/metadata/",
            resource_id, file_id
        ));
        let body = json!({ "extra_metadata": metadata });
        let response = self.authed(self.client.put(&url)).json(&body).send()?;
        Self::check("attach-file-metadata", response)?;
        Ok(())
    }

    fn set_public(&self, resource_id: &str) -> Result<(), ClientError> {
        let url = self.url(&format!("/hsapi/resource/accessRules/{}/", resource_id));
        let body = json!({ "public": true });
        let response = self.authed(self.client.put(&url)).json(&body).send()?;
        Self::check("set-public", response)?;
        info!(resource_id, "Resource made public");
        Ok(())
    }
}

/// File ids arrive as either numbers or strings depending on the endpoint.
fn json_id_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
