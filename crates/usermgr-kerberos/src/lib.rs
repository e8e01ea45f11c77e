//! Drives `kadmin -k -t <keytab> -p <admin>` as a child process, running
//! a bounded-read/prompt-match expect dialogue so that a principal's
//! password is never passed as a command-line argument.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod error;

pub use error::KerberosError;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// `kadmin` reads prompts in chunks; 512 bytes is large enough to contain
/// any of the fixed prompt strings below in one read, exactly as the
/// reference implementation assumes.
const PROMPT_BUF_SIZE: usize = 512;

const PROMPT_PASSWORD: &[u8] = b"Enter password for principal ";
const PROMPT_REENTER: &[u8] = b"\nRe-enter password for principal ";

/// A `kadmin` admin-protocol driver bound to one keytab and admin principal.
#[derive(Debug, Clone)]
pub struct KerberosAdmin {
    admin_principal: String,
    keytab: PathBuf,
}

impl KerberosAdmin {
    /// Build a driver from the `[kerberos]` section of a loaded config.
    #[must_use]
    pub fn new(admin_principal: impl Into<String>, keytab: impl Into<PathBuf>) -> Self {
        Self {
            admin_principal: admin_principal.into(),
            keytab: keytab.into(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("kadmin");
        cmd.arg("-k")
            .arg("-t")
            .arg(&self.keytab)
            .arg("-p")
            .arg(&self.admin_principal);
        cmd
    }

    /// `addPrincipal(name, password, expire)`.
    ///
    /// Pushes `+requires_preauth -allow_svr` so the resulting principal
    /// matches [`usermgr_types::PrincipalRecord`]'s default invariants.
    #[tracing::instrument(skip(self, password), fields(principal = %name))]
    pub async fn add_principal(
        &self,
        name: &str,
        password: &str,
        expire: &str,
    ) -> Result<(), KerberosError> {
        let mut cmd = self.command();
        cmd.args([
            "add_principal",
            "+requires_preauth",
            "-allow_svr",
            "-expire",
            expire,
            name,
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

        let mut child = cmd.spawn()?;
        let mut stdin = child.stdin.take().expect("stdin was piped");
        let mut stdout = child.stdout.take().expect("stdout was piped");

        let mut buf = vec![0u8; PROMPT_BUF_SIZE];

        let n = stdout.read(&mut buf).await?;
        if !buf[..n].starts_with(PROMPT_PASSWORD) {
            return Err(KerberosError::UnexpectedPrompt(
                String::from_utf8_lossy(&buf[..n]).into_owned(),
            ));
        }
        stdin.write_all(password.as_bytes()).await?;
        stdin.write_all(b"\n").await?;

        let n = stdout.read(&mut buf).await?;
        if !buf[..n].starts_with(PROMPT_REENTER) {
            return Err(KerberosError::UnexpectedPrompt(
                String::from_utf8_lossy(&buf[..n]).into_owned(),
            ));
        }
        stdin.write_all(password.as_bytes()).await?;
        stdin.write_all(b"\n").await?;

        let n = stdout.read(&mut buf).await?;
        let tail = &buf[..n];
        drop(stdin);

        let status = child.wait().await?;
        if !status.success() {
            return Err(KerberosError::CommandFailed(
                String::from_utf8_lossy(tail).into_owned(),
            ));
        }
        Ok(())
    }

    /// `getPrincipal(name) -> dict`. A non-zero exit is reported as
    /// [`KerberosError::NotFound`].
    #[tracing::instrument(skip(self), fields(principal = %name))]
    pub async fn get_principal(&self, name: &str) -> Result<HashMap<String, String>, KerberosError> {
        let mut cmd = self.command();
        cmd.args(["get_principal", name])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn()?;
        let mut stdout = child.stdout.take().expect("stdout was piped");
        let mut raw = Vec::new();
        stdout.read_to_end(&mut raw).await?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(KerberosError::NotFound);
        }

        Ok(parse_principal_output(&String::from_utf8_lossy(&raw)))
    }

    /// `deletePrincipal(name)`, passing `-force`. A non-zero exit is
    /// reported as [`KerberosError::CommandFailed`].
    #[tracing::instrument(skip(self), fields(principal = %name))]
    pub async fn delete_principal(&self, name: &str) -> Result<(), KerberosError> {
        let mut cmd = self.command();
        cmd.args(["delete_principal", "-force", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = cmd.spawn()?;
        let status = child.wait().await?;
        if !status.success() {
            return Err(KerberosError::CommandFailed(format!(
                "delete_principal {name} exited with {status}"
            )));
        }
        Ok(())
    }
}

/// Parses `kadmin get_principal`'s `key: value` lines, skipping any line
/// that doesn't split cleanly (continuation lines for key policy lists).
#[must_use]
pub fn parse_principal_output(text: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in text.split('\n') {
        if let Some((k, v)) = line.split_once(": ") {
            out.insert(k.to_string(), v.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines() {
        let text = "Principal: jdoe@EXAMPLE.ORG\nExpiration date: [never]\nnonsense line\nMax life: 86400\n";
        let parsed = parse_principal_output(text);
        assert_eq!(parsed.get("Principal").unwrap(), "jdoe@EXAMPLE.ORG");
        assert_eq!(parsed.get("Expiration date").unwrap(), "[never]");
        assert_eq!(parsed.get("Max life").unwrap(), "86400");
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn parses_empty_output() {
        assert!(parse_principal_output("").is_empty());
    }

    #[test]
    fn command_never_embeds_password() {
        let admin = KerberosAdmin::new("usermgr/admin@EXAMPLE.ORG", "/etc/usermgr.keytab");
        let cmd = admin.command();
        let rendered = format!("{cmd:?}");
        assert!(rendered.contains("kadmin"));
        assert!(!rendered.contains("hunter2"));
    }
}
