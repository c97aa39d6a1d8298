//! Site repository sync through the `git` command line.

use std::path::Path;
use std::process::Command;

use chrono::NaiveDateTime;

use crate::domain::PublishTarget;
use crate::error::AppError;

/// Runs git subcommands inside a repository.
pub trait GitRunner {
    /// `git <args>` in `repo`; returns stdout.
    fn run(&self, repo: &Path, args: &[&str]) -> Result<String, AppError>;
}

/// The system `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandGit;

impl GitRunner for CommandGit {
    fn run(&self, repo: &Path, args: &[&str]) -> Result<String, AppError> {
        // Only the subcommand goes into messages; arguments may carry the token.
        let sub = args.first().copied().unwrap_or("git");
        log::debug!("git {sub} in {}", repo.display());

        let output = Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(args)
            .output()
            .map_err(|e| AppError::publish(format!("Failed to run git {sub}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::publish(format!(
                "git {sub} failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub fn authenticated_remote(user: &str, repo: &str, token: &str) -> String {
    format!("https://{token}@github.com/{user}/{repo}.git")
}

pub fn commit_message(now: NaiveDateTime) -> String {
    format!("Auto-update charts {}", now.format("%Y-%m-%d %H:%M:%S"))
}

/// Pull, then commit and push every change in the site repository.
///
/// Returns the commit message, or `None` when the tree was already clean
/// (nothing is committed or pushed in that case).
pub fn sync_site(git: &dyn GitRunner, target: &PublishTarget, now: NaiveDateTime) -> Result<Option<String>, AppError> {
    let repo = target.repo_path.as_path();
    let remote = authenticated_remote(&target.github_user, &target.github_repo, &target.token);
    let run = |args: &[&str]| git.run(repo, args).map_err(|e| redact(e, &target.token));

    run(&["remote", "set-url", "origin", &remote])?;
    run(&["pull", "--rebase", "--autostash"])?;

    let status = run(&["status", "--porcelain"])?;
    if status.trim().is_empty() {
        log::info!("Site repository is clean; nothing to push");
        return Ok(None);
    }

    let message = commit_message(now);
    run(&["add", "-A"])?;
    run(&["commit", "-m", &message])?;
    run(&["push"])?;
    log::info!("Pushed \"{message}\"");
    Ok(Some(message))
}

fn redact(err: AppError, secret: &str) -> AppError {
    if secret.is_empty() || !err.message().contains(secret) {
        return err;
    }
    AppError::new(err.kind(), err.message().replace(secret, "***"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::fakes::FakeGit;

    use chrono::NaiveDate;

    fn target() -> PublishTarget {
        PublishTarget {
            repo_path: ".".into(),
            pages_url: "https://user.github.io/charts/".into(),
            github_user: "user".into(),
            github_repo: "charts".into(),
            token: "s3cret".into(),
            drive_folder_id: "root".into(),
            drive_subfolder: None,
            share_links: false,
            drive_credentials: "credentials.json".into(),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    #[test]
    fn clean_tree_skips_commit_and_push() {
        let git = FakeGit::default();
        let commit = sync_site(&git, &target(), now()).unwrap();

        assert_eq!(commit, None);
        assert_eq!(
            *git.calls.borrow(),
            vec![
                "remote set-url origin https://s3cret@github.com/user/charts.git",
                "pull --rebase --autostash",
                "status --porcelain",
            ]
        );
    }

    #[test]
    fn dirty_tree_commits_and_pushes() {
        let git = FakeGit {
            status: "?? GC_F.html\n".into(),
            ..FakeGit::default()
        };
        let commit = sync_site(&git, &target(), now()).unwrap();

        assert_eq!(commit.as_deref(), Some("Auto-update charts 2025-03-10 08:30:00"));
        let calls = git.calls.borrow();
        assert_eq!(calls[3..], ["add -A", "commit -m Auto-update charts 2025-03-10 08:30:00", "push"]);
    }

    #[test]
    fn errors_never_leak_the_token() {
        let err = redact(AppError::publish("fatal: https://s3cret@github.com denied"), "s3cret");
        assert_eq!(err.message(), "fatal: https://***@github.com denied");
        assert_eq!(err.kind(), crate::error::ErrorKind::Publish);
    }
}
