//! Publishing generated artifacts.
//!
//! - `git`: commit and push interactive charts to the static-site repository
//! - `drive`: Google Drive v3 REST client for the workbooks
//!
//! Remote objects are always looked up by name first, so re-running the
//! pipeline overwrites files in place instead of piling up duplicates.
//!
//! The site push and the workbook upload are independent; one failing never
//! stops the other.

use std::path::{Path, PathBuf};

use crate::domain::PublishTarget;
use crate::error::AppError;

pub mod drive;
pub mod git;

pub use drive::GoogleDrive;
pub use git::{CommandGit, GitRunner, sync_site};

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A file or folder in the drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// One access grant on a remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    /// `user`, `group`, `domain` or `anyone`.
    pub grantee: String,
    pub role: String,
}

impl Permission {
    pub fn public_reader() -> Self {
        Self {
            grantee: "anyone".to_string(),
            role: "reader".to_string(),
        }
    }

    pub fn is_public_reader(&self) -> bool {
        self.grantee == "anyone" && self.role == "reader"
    }
}

/// A local file and the remote object it was uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub local: PathBuf,
    pub name: String,
    pub remote_id: String,
    /// Public preview link, when sharing was requested.
    pub link: Option<String>,
}

/// The drive operations the publisher relies on.
pub trait DriveApi {
    /// First non-trashed child of `parent_id` named exactly `name`.
    fn find_child(&self, parent_id: &str, name: &str, mime_type: Option<&str>) -> Result<Option<RemoteFile>, AppError>;

    /// Create an empty object (or a folder when `mime_type` is the folder type).
    fn create(&self, parent_id: &str, name: &str, mime_type: Option<&str>) -> Result<RemoteFile, AppError>;

    /// Replace the content of an existing object.
    fn write_content(&self, file_id: &str, bytes: Vec<u8>, mime_type: &str) -> Result<(), AppError>;

    fn permissions(&self, file_id: &str) -> Result<Vec<Permission>, AppError>;

    fn grant(&self, file_id: &str, permission: &Permission) -> Result<(), AppError>;
}

/// Upload `local` as `name` under `parent_id`, overwriting an object of the
/// same name if one exists.
pub fn upload_or_update(
    drive: &dyn DriveApi,
    local: &Path,
    name: &str,
    parent_id: &str,
) -> Result<RemoteFile, AppError> {
    let bytes = std::fs::read(local)
        .map_err(|e| AppError::publish(format!("Failed to read '{}': {e}", local.display())))?;

    let file = match drive.find_child(parent_id, name, None)? {
        Some(existing) => {
            log::info!("Updating drive file {name} (id {})", existing.id);
            existing
        }
        None => {
            log::info!("Uploading new drive file {name}");
            drive.create(parent_id, name, None)?
        }
    };
    drive.write_content(&file.id, bytes, mime_for(name))?;
    Ok(file)
}

/// Id of the child folder `name` under `parent_id`, created when missing.
pub fn get_or_create_folder(drive: &dyn DriveApi, name: &str, parent_id: &str) -> Result<String, AppError> {
    if let Some(folder) = drive.find_child(parent_id, name, Some(FOLDER_MIME))? {
        log::debug!("Found drive folder '{name}' (id {})", folder.id);
        return Ok(folder.id);
    }
    let folder = drive.create(parent_id, name, Some(FOLDER_MIME))?;
    log::info!("Created drive folder '{name}' (id {})", folder.id);
    Ok(folder.id)
}

/// Make `file_id` readable by anyone with the link and return its preview URL.
///
/// The grant is only added when no `anyone`/`reader` grant exists yet.
pub fn promote_public_link(drive: &dyn DriveApi, file_id: &str) -> Result<String, AppError> {
    let public = drive.permissions(file_id)?.iter().any(Permission::is_public_reader);
    if public {
        log::debug!("Drive file {file_id} is already public");
    } else {
        log::info!("Granting public read access to drive file {file_id}");
        drive.grant(file_id, &Permission::public_reader())?;
    }
    Ok(preview_link(file_id))
}

pub fn preview_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}/preview")
}

fn mime_for(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("xlsx") => XLSX_MIME,
        Some("html") => "text/html",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Upload every existing workbook into the target drive folder.
///
/// Runs independently of the site push. The first drive error aborts the
/// remaining uploads.
pub fn upload_workbooks(
    target: &PublishTarget,
    drive: &dyn DriveApi,
    workbooks: &[PathBuf],
) -> Result<Vec<PublishedArtifact>, AppError> {
    let folder_id = match &target.drive_subfolder {
        Some(name) => get_or_create_folder(drive, name, &target.drive_folder_id)?,
        None => target.drive_folder_id.clone(),
    };

    let mut uploads = Vec::new();
    for local in workbooks {
        if !local.exists() {
            log::warn!("Skipping upload of missing file {}", local.display());
            continue;
        }
        let name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::publish(format!("Invalid upload file name '{}'.", local.display())))?
            .to_string();

        let file = upload_or_update(drive, local, &name, &folder_id)?;
        let link = if target.share_links {
            Some(promote_public_link(drive, &file.id)?)
        } else {
            None
        };
        uploads.push(PublishedArtifact {
            local: local.clone(),
            name,
            remote_id: file.id,
            link,
        });
    }
    Ok(uploads)
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-memory stand-ins for the drive and git.

    use std::cell::{Cell, RefCell};
    use std::path::Path;

    use super::*;

    #[derive(Debug, Clone)]
    pub struct FakeObject {
        pub id: String,
        pub parent: String,
        pub name: String,
        pub mime: Option<String>,
        pub content: Vec<u8>,
        pub grants: Vec<Permission>,
        pub trashed: bool,
    }

    #[derive(Debug, Default)]
    pub struct FakeDrive {
        pub objects: RefCell<Vec<FakeObject>>,
        next_id: Cell<u32>,
    }

    impl FakeDrive {
        pub fn named(&self, name: &str) -> Vec<FakeObject> {
            self.objects
                .borrow()
                .iter()
                .filter(|o| o.name == name && !o.trashed)
                .cloned()
                .collect()
        }

        fn with_object<T>(&self, id: &str, f: impl FnOnce(&mut FakeObject) -> T) -> Result<T, AppError> {
            let mut objects = self.objects.borrow_mut();
            let obj = objects
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or_else(|| AppError::publish(format!("404 {id}")))?;
            Ok(f(obj))
        }
    }

    impl DriveApi for FakeDrive {
        fn find_child(&self, parent_id: &str, name: &str, mime_type: Option<&str>) -> Result<Option<RemoteFile>, AppError> {
            Ok(self
                .objects
                .borrow()
                .iter()
                .find(|o| {
                    o.parent == parent_id
                        && o.name == name
                        && !o.trashed
                        && mime_type.is_none_or(|m| o.mime.as_deref() == Some(m))
                })
                .map(|o| RemoteFile {
                    id: o.id.clone(),
                    name: o.name.clone(),
                }))
        }

        fn create(&self, parent_id: &str, name: &str, mime_type: Option<&str>) -> Result<RemoteFile, AppError> {
            let n = self.next_id.get() + 1;
            self.next_id.set(n);
            let id = format!("id{n}");
            self.objects.borrow_mut().push(FakeObject {
                id: id.clone(),
                parent: parent_id.to_string(),
                name: name.to_string(),
                mime: mime_type.map(str::to_string),
                content: Vec::new(),
                grants: vec![Permission {
                    grantee: "user".into(),
                    role: "owner".into(),
                }],
                trashed: false,
            });
            Ok(RemoteFile {
                id,
                name: name.to_string(),
            })
        }

        fn write_content(&self, file_id: &str, bytes: Vec<u8>, _mime_type: &str) -> Result<(), AppError> {
            self.with_object(file_id, |o| o.content = bytes)
        }

        fn permissions(&self, file_id: &str) -> Result<Vec<Permission>, AppError> {
            self.with_object(file_id, |o| o.grants.clone())
        }

        fn grant(&self, file_id: &str, permission: &Permission) -> Result<(), AppError> {
            self.with_object(file_id, |o| o.grants.push(permission.clone()))
        }
    }

    /// Records git invocations; `status --porcelain` answers with `status`.
    #[derive(Debug, Default)]
    pub struct FakeGit {
        pub calls: RefCell<Vec<String>>,
        pub status: String,
        /// Subcommand that fails, e.g. `push`.
        pub fail_on: Option<String>,
    }

    impl GitRunner for FakeGit {
        fn run(&self, _repo: &Path, args: &[&str]) -> Result<String, AppError> {
            self.calls.borrow_mut().push(args.join(" "));
            let sub = args.first().copied().unwrap_or_default();
            if self.fail_on.as_deref() == Some(sub) {
                return Err(AppError::publish(format!("git {sub} failed")));
            }
            Ok(if sub == "status" { self.status.clone() } else { String::new() })
        }
    }
}
