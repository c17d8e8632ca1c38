//! Upload safety policy (§4.2): reject on oversize, disallowed
//! extension, or an unsafe filename. The whitelist covers documents,
//! source files, archives, and media commonly used in educational
//! content; executables are refused outright.

use thiserror::Error;

const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;

const EXTENSION_WHITELIST: &[&str] = &[
    // documents
    "md", "rst", "txt", "pdf", "adoc",
    // source files
    "py", "rs", "c", "h", "cpp", "hpp", "java", "js", "ts", "go", "rb", "sh", "sql", "yaml",
    "yml", "toml", "json", "ipynb",
    // archives
    "zip", "tar", "gz", "tgz",
    // media
    "png", "jpg", "jpeg", "gif", "svg", "mp4", "webm",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadViolation {
    #[error("file `{name}` is {size} bytes, exceeding the {max} byte limit")]
    TooLarge { name: String, size: u64, max: u64 },
    #[error("file `{0}` has a disallowed extension")]
    DisallowedExtension(String),
    #[error("file `{0}` contains a path-traversal or non-portable sequence")]
    UnsafeFilename(String),
}

#[derive(Debug, Clone)]
pub struct UploadSafetyPolicy {
    pub max_bytes: u64,
    pub whitelist: Vec<String>,
}

impl Default for UploadSafetyPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            whitelist: EXTENSION_WHITELIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl UploadSafetyPolicy {
    pub fn check(&self, filename: &str, size: u64) -> Result<(), UploadViolation> {
        if size > self.max_bytes {
            return Err(UploadViolation::TooLarge {
                name: filename.to_string(),
                size,
                max: self.max_bytes,
            });
        }

        if filename.contains("..")
            || filename.starts_with('/')
            || filename.contains('\0')
            || filename.chars().any(|c| c.is_control())
        {
            return Err(UploadViolation::UnsafeFilename(filename.to_string()));
        }

        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.whitelist.iter().any(|allowed| allowed == &ext) {
            return Err(UploadViolation::DisallowedExtension(filename.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_whitelisted_source_file() {
        let policy = UploadSafetyPolicy::default();
        assert!(policy.check("main.py", 1024).is_ok());
    }

    #[test]
    fn rejects_executable_extension() {
        let policy = UploadSafetyPolicy::default();
        assert_eq!(
            policy.check("payload.exe", 10),
            Err(UploadViolation::DisallowedExtension("payload.exe".to_string()))
        );
    }

    #[test]
    fn rejects_path_traversal() {
        let policy = UploadSafetyPolicy::default();
        assert!(matches!(
            policy.check("../../etc/passwd.txt", 10),
            Err(UploadViolation::UnsafeFilename(_))
        ));
    }

    #[test]
    fn rejects_oversized_file() {
        let policy = UploadSafetyPolicy {
            max_bytes: 100,
            ..UploadSafetyPolicy::default()
        };
        assert!(matches!(
            policy.check("main.py", 200),
            Err(UploadViolation::TooLarge { .. })
        ));
    }
}
