//! Google Drive v3 over blocking `reqwest`.
//!
//! Authentication uses a stored OAuth refresh token: the credentials file is
//! exchanged for a short-lived access token once, when the client is built.

use std::path::Path;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::publish::{DriveApi, Permission, RemoteFile};

const API_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh-token credentials, as stored by the usual OAuth helpers.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl DriveCredentials {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::publish(format!("Failed to read drive credentials '{}': {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::publish(format!("Invalid drive credentials '{}': {e}", path.display())))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PermissionList {
    #[serde(default)]
    permissions: Vec<PermissionEntry>,
}

#[derive(Debug, Deserialize)]
struct PermissionEntry {
    #[serde(rename = "type")]
    grantee: String,
    role: String,
}

pub struct GoogleDrive {
    client: Client,
    access_token: String,
}

impl GoogleDrive {
    /// Load credentials from `path` and exchange the refresh token.
    pub fn connect(path: &Path) -> Result<Self, AppError> {
        let credentials = DriveCredentials::load(path)?;
        let client = Client::new();
        let token_uri = credentials.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);

        log::info!("Authenticating with Google Drive");
        let resp = client
            .post(token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()
            .map_err(|e| AppError::publish(format!("Drive token request failed: {e}")))?;
        let token: TokenResponse = check(resp, "token refresh")?
            .json()
            .map_err(|e| AppError::publish(format!("Failed to parse drive token response: {e}")))?;

        Ok(Self {
            client,
            access_token: token.access_token,
        })
    }

    fn send(&self, req: RequestBuilder, what: &str) -> Result<Response, AppError> {
        let resp = req
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|e| AppError::publish(format!("Drive {what} request failed: {e}")))?;
        check(resp, what)
    }
}

fn check(resp: Response, what: &str) -> Result<Response, AppError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    Err(AppError::publish(format!(
        "Drive {what} failed with status {status}: {}",
        body.trim()
    )))
}

/// Drive query string literal: backslashes and single quotes escaped.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

pub fn child_query(parent_id: &str, name: &str, mime_type: Option<&str>) -> String {
    let mut q = format!("name={} and {} in parents and trashed=false", quote(name), quote(parent_id));
    if let Some(mime) = mime_type {
        q.push_str(&format!(" and mimeType={}", quote(mime)));
    }
    q
}

impl DriveApi for GoogleDrive {
    fn find_child(&self, parent_id: &str, name: &str, mime_type: Option<&str>) -> Result<Option<RemoteFile>, AppError> {
        let q = child_query(parent_id, name, mime_type);
        let req = self
            .client
            .get(API_URL)
            .query(&[("q", q.as_str()), ("fields", "files(id,name)"), ("spaces", "drive")]);
        let list: FileList = self
            .send(req, "file search")?
            .json()
            .map_err(|e| AppError::publish(format!("Failed to parse drive file list: {e}")))?;
        Ok(list.files.into_iter().next().map(|f| RemoteFile { id: f.id, name: f.name }))
    }

    fn create(&self, parent_id: &str, name: &str, mime_type: Option<&str>) -> Result<RemoteFile, AppError> {
        let mut metadata = json!({ "name": name, "parents": [parent_id] });
        if let Some(mime) = mime_type {
            metadata["mimeType"] = json!(mime);
        }
        let req = self
            .client
            .post(API_URL)
            .query(&[("fields", "id,name")])
            .json(&metadata);
        let file: FileEntry = self
            .send(req, "create")?
            .json()
            .map_err(|e| AppError::publish(format!("Failed to parse drive create response: {e}")))?;
        Ok(RemoteFile { id: file.id, name: file.name })
    }

    fn write_content(&self, file_id: &str, bytes: Vec<u8>, mime_type: &str) -> Result<(), AppError> {
        let req = self
            .client
            .patch(format!("{UPLOAD_URL}/{file_id}"))
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes);
        self.send(req, "upload")?;
        Ok(())
    }

    fn permissions(&self, file_id: &str) -> Result<Vec<Permission>, AppError> {
        let req = self
            .client
            .get(format!("{API_URL}/{file_id}/permissions"))
            .query(&[("fields", "permissions(type,role)")]);
        let list: PermissionList = self
            .send(req, "permission list")?
            .json()
            .map_err(|e| AppError::publish(format!("Failed to parse drive permissions: {e}")))?;
        Ok(list
            .permissions
            .into_iter()
            .map(|p| Permission {
                grantee: p.grantee,
                role: p.role,
            })
            .collect())
    }

    fn grant(&self, file_id: &str, permission: &Permission) -> Result<(), AppError> {
        let req = self
            .client
            .post(format!("{API_URL}/{file_id}/permissions"))
            .json(&json!({ "type": permission.grantee, "role": permission.role }));
        self.send(req, "permission grant")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn query_escapes_quotes() {
        assert_eq!(
            child_query("root", "O'Neil.xlsx", None),
            r"name='O\'Neil.xlsx' and 'root' in parents and trashed=false"
        );
        assert!(child_query("root", "charts", Some(crate::publish::FOLDER_MIME))
            .ends_with("and mimeType='application/vnd.google-apps.folder'"));
    }

    #[test]
    fn credentials_accept_extra_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"client_id":"id","client_secret":"sec","refresh_token":"rt","access_token":"old","token_expiry":null}}"#
        )
        .unwrap();
        let creds = DriveCredentials::load(file.path()).unwrap();
        assert_eq!(creds.refresh_token, "rt");
        assert_eq!(creds.token_uri, None);
    }

    #[test]
    fn missing_credentials_is_a_publish_error() {
        let err = DriveCredentials::load(Path::new("/nonexistent/credentials.json")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Publish);
    }
}
