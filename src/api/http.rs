/// Blocking HTTP client for the platform's buildpack endpoints.
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::errors::ApiError;
use super::models::{Buildpack, OptionIntent};
use super::{BuildpackBitsRepository, BuildpackRepository};

/// Per-request timeout for platform calls and artifact downloads.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Multipart field name the platform expects for buildpack bits.
const BITS_FIELD: &str = "buildpack";

/// File name used when a URL has no usable last segment.
const FALLBACK_FILE_NAME: &str = "buildpack.zip";

/// Platform API client implementing both buildpack repositories.
#[derive(Debug, Clone)]
pub struct CloudControllerClient {
    http: Client,
    api: String,
    authorization: String,
}

#[derive(Debug, Serialize)]
struct CreateBuildpackRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct BuildpackResource {
    metadata: ResourceMetadata,
    entity: BuildpackEntity,
}

#[derive(Debug, Deserialize)]
struct ResourceMetadata {
    guid: String,
}

#[derive(Debug, Deserialize)]
struct BuildpackEntity {
    name: String,
    position: Option<i32>,
    enabled: Option<bool>,
    locked: Option<bool>,
    filename: Option<String>,
}

/// Error body returned by the platform on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct PlatformErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    description: String,
}

impl From<BuildpackResource> for Buildpack {
    fn from(resource: BuildpackResource) -> Self {
        Self {
            guid: resource.metadata.guid,
            name: resource.entity.name,
            position: resource.entity.position,
            enabled: resource.entity.enabled,
            locked: resource.entity.locked,
            filename: resource.entity.filename,
        }
    }
}

impl CloudControllerClient {
    /// Build a client for the API at `api` authenticating with `access_token`.
    ///
    /// The token may be stored with or without its `bearer ` prefix.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the TLS backend cannot be initialised.
    pub fn new(api: &str, access_token: &str, skip_ssl_validation: bool) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .danger_accept_invalid_certs(skip_ssl_validation)
            .build()?;
        Ok(Self {
            http,
            api: api.trim_end_matches('/').to_owned(),
            authorization: authorization_header(access_token),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api)
    }

    /// Fetch the artifact bytes and the file name to upload them under.
    fn load_artifact(&self, path: &str) -> Result<(String, Vec<u8>), ApiError> {
        if is_url(path) {
            debug!(url = path, "downloading buildpack artifact");
            let response = self.http.get(path).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::InvalidArtifact {
                    path: path.to_owned(),
                    reason: format!("download failed with status {}", status.as_u16()),
                });
            }
            let bytes = response.bytes()?.to_vec();
            return Ok((file_name_from_url(path), bytes));
        }

        let local = Path::new(path);
        let bytes = if local.is_dir() {
            debug!(dir = path, "zipping buildpack directory");
            zip_directory(local, path)?
        } else {
            std::fs::read(local).map_err(|source| ApiError::Io {
                path: path.to_owned(),
                source,
            })?
        };
        let name = local
            .file_name()
            .map_or_else(|| FALLBACK_FILE_NAME.to_owned(), |n| n.to_string_lossy().into_owned());
        Ok((name, bytes))
    }

    /// Turn a non-success response into a classified `ApiError`.
    fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "platform response");
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text()?;
        let body: PlatformErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let description = if body.description.is_empty() {
            text
        } else {
            body.description
        };
        Err(ApiError::from_platform(status.as_u16(), body.code, description))
    }

    fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        Ok(Self::check(response)?.json::<T>()?)
    }
}

impl BuildpackRepository for CloudControllerClient {
    fn create(
        &self,
        name: &str,
        position: Option<i32>,
        intent: OptionIntent,
        stack: Option<&str>,
    ) -> Result<Buildpack, ApiError> {
        let body = CreateBuildpackRequest {
            name,
            position,
            enabled: intent.as_enabled(),
            stack,
        };
        debug!(?body, "POST /v2/buildpacks");
        let response = self
            .http
            .post(self.url("/v2/buildpacks"))
            .header(AUTHORIZATION, &self.authorization)
            .json(&body)
            .send()?;
        let resource: BuildpackResource = Self::decode(response)?;
        Ok(resource.into())
    }
}

impl BuildpackBitsRepository for CloudControllerClient {
    fn upload_buildpack(&self, buildpack: &Buildpack, path: &str) -> Result<(), ApiError> {
        let (file_name, bytes) = self.load_artifact(path)?;
        if !is_zip(&bytes) {
            return Err(ApiError::InvalidArtifact {
                path: path.to_owned(),
                reason: "not a zip archive".to_owned(),
            });
        }

        let file_name = if file_name.ends_with(".zip") {
            file_name
        } else {
            format!("{file_name}.zip")
        };
        debug!(guid = %buildpack.guid, %file_name, size = bytes.len(), "uploading bits");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")?;
        let form = Form::new().part(BITS_FIELD, part);
        let response = self
            .http
            .put(self.url(&format!("/v2/buildpacks/{}/bits", buildpack.guid)))
            .header(AUTHORIZATION, &self.authorization)
            .multipart(form)
            .send()?;
        Self::check(response)?;
        Ok(())
    }
}

fn authorization_header(token: &str) -> String {
    let token = token.trim();
    if token
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("bearer "))
    {
        token.to_owned()
    } else {
        format!("bearer {token}")
    }
}

/// Archive the contents of `dir` (not the directory itself) into an in-memory zip.
///
/// Entry names are relative to `dir` and use `/` separators. Symlinks are skipped.
fn zip_directory(dir: &Path, path: &str) -> Result<Vec<u8>, ApiError> {
    let io_error = |source: std::io::Error| ApiError::Io {
        path: path.to_owned(),
        source,
    };
    let archive_error = |source: zip::result::ZipError| ApiError::Archive {
        path: path.to_owned(),
        source,
    };

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| io_error(e.into()))?;
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let options = entry_options(&entry);

        if entry.file_type().is_dir() {
            writer
                .add_directory(format!("{name}/"), options)
                .map_err(archive_error)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options).map_err(archive_error)?;
            let mut file = File::open(entry.path()).map_err(io_error)?;
            std::io::copy(&mut file, &mut writer).map_err(io_error)?;
        }
    }
    Ok(writer.finish().map_err(archive_error)?.into_inner())
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn entry_options(entry: &DirEntry) -> SimpleFileOptions {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    // Preserve file modes; buildpack scripts must stay executable.
    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        entry
            .metadata()
            .map_or(options, |m| options.unix_permissions(m.permissions().mode()))
    };
    options
}

fn is_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

fn is_zip(bytes: &[u8]) -> bool {
    // Local file header, or the end-of-central-directory record of an empty archive.
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06")
}

fn file_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map_or_else(|| FALLBACK_FILE_NAME.to_owned(), str::to_owned)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    const ZIP_BYTES: &[u8] = b"PK\x03\x04fake-buildpack-contents";

    fn client(server: &MockServer) -> CloudControllerClient {
        CloudControllerClient::new(&server.base_url(), "bearer test-token", false).unwrap()
    }

    fn buildpack(guid: &str) -> Buildpack {
        Buildpack {
            guid: guid.to_owned(),
            name: "ruby_bp".to_owned(),
            position: Some(3),
            enabled: None,
            locked: None,
            filename: None,
        }
    }

    #[test]
    fn test_create_omits_enabled_when_unspecified() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/buildpacks")
                .header("authorization", "bearer test-token")
                .json_body(json!({"name": "ruby_bp", "position": 3}));
            then.status(201).json_body(json!({
                "metadata": {"guid": "bp-guid-1"},
                "entity": {"name": "ruby_bp", "position": 3, "enabled": true, "locked": false}
            }));
        });

        let created = client(&server)
            .create("ruby_bp", Some(3), OptionIntent::Unspecified, None)
            .unwrap();

        mock.assert();
        assert_eq!(created.guid, "bp-guid-1");
        assert_eq!(created.position, Some(3));
        assert_eq!(created.enabled, Some(true));
        assert_eq!(created.filename, None);
    }

    #[test]
    fn test_create_sends_explicit_disable() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/buildpacks")
                .json_body(json!({"name": "ruby_bp", "position": 1, "enabled": false}));
            then.status(201).json_body(json!({
                "metadata": {"guid": "bp-guid-2"},
                "entity": {"name": "ruby_bp", "position": 1, "enabled": false}
            }));
        });

        let created = client(&server)
            .create("ruby_bp", Some(1), OptionIntent::Disabled, None)
            .unwrap();

        mock.assert();
        assert_eq!(created.enabled, Some(false));
    }

    #[test]
    fn test_create_name_taken_is_typed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2/buildpacks");
            then.status(400).json_body(json!({
                "code": 290001,
                "description": "The buildpack name is taken: ruby_bp",
                "error_code": "CF-BuildpackNameTaken"
            }));
        });

        let err = client(&server)
            .create("ruby_bp", Some(3), OptionIntent::Enabled, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::NameTaken { .. }));
    }

    #[test]
    fn test_create_other_error_keeps_status_and_code() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2/buildpacks");
            then.status(403).json_body(json!({
                "code": 10_003,
                "description": "You are not authorized to perform the requested action",
                "error_code": "CF-NotAuthorized"
            }));
        });

        let err = client(&server)
            .create("ruby_bp", Some(3), OptionIntent::Unspecified, None)
            .unwrap_err();
        match err {
            ApiError::Http { status, code, .. } => {
                assert_eq!(status, 403);
                assert_eq!(code, 10_003);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_create_non_json_error_uses_raw_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2/buildpacks");
            then.status(502).body("bad gateway");
        });

        let err = client(&server)
            .create("ruby_bp", Some(3), OptionIntent::Unspecified, None)
            .unwrap_err();
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn test_upload_local_zip() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("bp.zip");
        std::fs::write(&zip_path, ZIP_BYTES).unwrap();

        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/v2/buildpacks/bp-guid-1/bits")
                .header("authorization", "bearer test-token")
                .body_includes("name=\"buildpack\"")
                .body_includes("filename=\"bp.zip\"");
            then.status(201).json_body(json!({"metadata": {"guid": "bp-guid-1"}}));
        });

        client(&server)
            .upload_buildpack(&buildpack("bp-guid-1"), zip_path.to_str().unwrap())
            .unwrap();
        mock.assert();
    }

    #[test]
    fn test_upload_downloads_url_first() {
        let server = MockServer::start();
        let download = server.mock(|when, then| {
            when.method(GET).path("/artifacts/ruby");
            then.status(200).body(ZIP_BYTES);
        });
        let upload = server.mock(|when, then| {
            when.method(PUT)
                .path("/v2/buildpacks/bp-guid-1/bits")
                .body_includes("filename=\"ruby.zip\"");
            then.status(201);
        });

        let url = server.url("/artifacts/ruby");
        client(&server)
            .upload_buildpack(&buildpack("bp-guid-1"), &url)
            .unwrap();
        download.assert();
        upload.assert();
    }

    fn buildpack_dir() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("ruby_bp");
        std::fs::create_dir_all(dir.join("bin")).unwrap();
        std::fs::write(dir.join("bin/detect"), "#!/bin/sh\necho ruby\n").unwrap();
        std::fs::write(dir.join("manifest.yml"), "language: ruby\n").unwrap();
        root
    }

    #[test]
    fn test_zip_directory_uses_relative_entry_names() {
        let root = buildpack_dir();
        let dir = root.path().join("ruby_bp");

        let bytes = zip_directory(&dir, dir.to_str().unwrap()).unwrap();
        assert!(is_zip(&bytes));

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_owned).collect();
        names.sort();
        assert_eq!(names, ["bin/", "bin/detect", "manifest.yml"]);

        let mut detect = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("bin/detect").unwrap(), &mut detect)
            .unwrap();
        assert_eq!(detect, "#!/bin/sh\necho ruby\n");
    }

    #[test]
    fn test_upload_zips_directory() {
        let root = buildpack_dir();
        let dir = root.path().join("ruby_bp");

        let server = MockServer::start();
        let upload = server.mock(|when, then| {
            when.method(PUT)
                .path("/v2/buildpacks/bp-guid-1/bits")
                .body_includes("name=\"buildpack\"")
                .body_includes("filename=\"ruby_bp.zip\"");
            then.status(201);
        });

        client(&server)
            .upload_buildpack(&buildpack("bp-guid-1"), dir.to_str().unwrap())
            .unwrap();
        upload.assert();
    }

    #[test]
    fn test_upload_rejects_non_zip_file() {
        let server = MockServer::start();
        let upload = server.mock(|when, then| {
            when.method(PUT);
            then.status(201);
        });
        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("notes.txt");
        std::fs::write(&text_path, "plain text").unwrap();

        let err = client(&server)
            .upload_buildpack(&buildpack("g"), text_path.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArtifact { .. }));
        upload.assert_calls(0);
    }

    #[test]
    fn test_upload_missing_file_is_io_error() {
        let server = MockServer::start();
        let err = client(&server)
            .upload_buildpack(&buildpack("g"), "/definitely/not/here.zip")
            .unwrap_err();
        assert!(matches!(err, ApiError::Io { .. }));
    }

    #[test]
    fn test_authorization_header_prefix() {
        assert_eq!(authorization_header("abc"), "bearer abc");
        assert_eq!(authorization_header("bearer abc"), "bearer abc");
        assert_eq!(authorization_header("Bearer abc"), "Bearer abc");
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(file_name_from_url("https://x.io/a/ruby.zip?sig=1"), "ruby.zip");
        assert_eq!(file_name_from_url("https://x.io/"), FALLBACK_FILE_NAME);
    }
}
