//! The object key convention from §4.2/§6:
//! `repositories/{repository_id}/{example_id}/{version_tag}/<path-within-example>`.

use uuid::Uuid;

/// Builds the key prefix for one example version. Individual file
/// keys are this prefix joined with the file's path inside the
/// example (see [`file_key`]).
pub fn version_prefix(repository_id: Uuid, example_id: Uuid, version_tag: &str) -> String {
    format!("repositories/{repository_id}/{example_id}/{version_tag}")
}

pub fn file_key(repository_id: Uuid, example_id: Uuid, version_tag: &str, path_in_example: &str) -> String {
    format!(
        "{}/{}",
        version_prefix(repository_id, example_id, version_tag),
        path_in_example.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_key() {
        let repo = Uuid::nil();
        let example = Uuid::nil();
        let key = file_key(repo, example, "v1.0", "main.py");
        assert_eq!(
            key,
            format!("repositories/{repo}/{example}/v1.0/main.py")
        );
    }
}
