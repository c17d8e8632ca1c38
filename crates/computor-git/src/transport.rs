//! Repository transport: clone, commit, and push through the system
//! `git` binary (§4.4 "push a local repository to an authenticated
//! HTTPS remote"). The credential lives only in the remote URL passed
//! to each `git` invocation's argv, never written into `.git/config`
//! or any file under the working tree.

use std::path::{Path, PathBuf};

use computor_core::error::ComputorError;
use tokio::process::Command;

pub struct GitTransport {
    /// Scoped working directory for one workflow run; reclaimed by the
    /// caller on completion (§5 "never shared").
    root: PathBuf,
}

async fn run(mut command: Command, context: &str) -> Result<String, ComputorError> {
    let output = command
        .output()
        .await
        .map_err(|e| ComputorError::ProviderTransient(format!("{context}: failed to spawn git: {e}")))?;
    if !output.status.success() {
        return Err(ComputorError::ProviderTransient(format!(
            "{context}: git exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl GitTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn clone_repository(&self, authenticated_url: &str, branch: &str, into: &str) -> Result<PathBuf, ComputorError> {
        let dest = self.root.join(into);
        let mut cmd = Command::new("git");
        cmd.arg("clone")
            .arg("--branch")
            .arg(branch)
            .arg(authenticated_url)
            .arg(&dest)
            .current_dir(&self.root);
        run(cmd, "clone").await?;
        Ok(dest)
    }

    /// Stages and commits everything under `repo_path`, returning the
    /// new commit's SHA (`git rev-parse HEAD`) for `DeploymentHistory`
    /// (§4.8 step 6). Note the SHA returned here is superseded if the
    /// commit is later rewritten by a rebase in
    /// [`Self::push_with_rebase_retry`]; callers that push after
    /// committing should use that method's returned SHA instead.
    pub async fn commit_all(&self, repo_path: &Path, message: &str, author: &str) -> Result<String, ComputorError> {
        let mut add = Command::new("git");
        add.arg("-C").arg(repo_path).arg("add").arg("-A");
        run(add, "add").await?;

        let mut commit = Command::new("git");
        commit
            .arg("-C")
            .arg(repo_path)
            .arg("-c")
            .arg(format!("user.name={author}"))
            .arg("-c")
            .arg("user.email=computor@localhost")
            .arg("commit")
            .arg("--allow-empty")
            .arg("-m")
            .arg(message);
        run(commit, "commit").await?;
        self.rev_parse_head(repo_path).await
    }

    /// Force-pushes the cloned seed history onto a freshly created,
    /// unrelated remote branch (§4.6's "assignments project may be
    /// seeded from `cfg.source.url`"). Unlike
    /// [`Self::push_with_rebase_retry`], there is no shared history to
    /// rebase onto: the destination is a brand-new project whose only
    /// commit is the provider's own initial README.
    pub async fn force_push(&self, repo_path: &Path, authenticated_url: &str, branch: &str) -> Result<String, ComputorError> {
        let mut push = Command::new("git");
        push.arg("-C")
            .arg(repo_path)
            .arg("push")
            .arg("--force")
            .arg(authenticated_url)
            .arg(format!("HEAD:{branch}"));
        run(push, "push --force").await?;
        self.rev_parse_head(repo_path).await
    }

    async fn rev_parse_head(&self, repo_path: &Path) -> Result<String, ComputorError> {
        let mut rev_parse = Command::new("git");
        rev_parse.arg("-C").arg(repo_path).arg("rev-parse").arg("HEAD");
        let sha = run(rev_parse, "rev-parse").await?;
        Ok(sha.trim().to_string())
    }

    /// Pushes `branch`, retrying once after a `pull --rebase` if the
    /// remote has moved on (§4.9's "commit/push with pull-rebase
    /// retry"). The retry is bounded to one attempt; a second failure
    /// surfaces to the caller's activity retry policy instead. Returns
    /// the SHA actually pushed — identical to `commit_all`'s SHA unless
    /// the rebase path rewrote the commit.
    pub async fn push_with_rebase_retry(
        &self,
        repo_path: &Path,
        authenticated_url: &str,
        branch: &str,
    ) -> Result<String, ComputorError> {
        let mut push = Command::new("git");
        push.arg("-C").arg(repo_path).arg("push").arg(authenticated_url).arg(branch);
        if run(push, "push").await.is_ok() {
            return self.rev_parse_head(repo_path).await;
        }

        tracing::info!(branch, "push rejected, rebasing onto remote before retrying");
        let mut pull = Command::new("git");
        pull.arg("-C")
            .arg(repo_path)
            .arg("pull")
            .arg("--rebase")
            .arg(authenticated_url)
            .arg(branch);
        run(pull, "pull --rebase").await?;

        let mut retry = Command::new("git");
        retry.arg("-C").arg(repo_path).arg("push").arg(authenticated_url).arg(branch);
        run(retry, "push (retry)").await?;
        self.rev_parse_head(repo_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commit_all_requires_a_git_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = GitTransport::new(tmp.path());
        let result = transport.commit_all(tmp.path(), "msg", "computor").await;
        assert!(result.is_err());
    }
}
