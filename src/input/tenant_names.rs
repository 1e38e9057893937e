//! Tenant names pulled out of raw hosted-site URL dumps

use crate::input::InputError;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

static TENANT_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://([^./\s]+)\.avature\.net(?:[:/?#]|$)").expect("hardcoded regex pattern is valid")
});

/// Placeholder tenants that never host a real career site
const SKIPPED_TENANTS: [&str; 4] = ["demo", "test", "sandbox", "staging"];

/// Collects the unique tenant names found in a URL dump
///
/// Only lines that start with a hosted-site URL count; everything else,
/// including hosts that merely begin with the hosting domain, is ignored.
/// Names are lowercased.
///
/// # Examples
///
/// ```
/// use avature_harvester::input::extract_tenant_names;
///
/// let dump = "https://Acme.avature.net/careers/JobDetail/1\nhttps://demo.avature.net\n";
/// let names: Vec<_> = extract_tenant_names(dump).into_iter().collect();
/// assert_eq!(names, vec!["acme"]);
/// ```
pub fn extract_tenant_names(content: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut lines = 0usize;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        lines += 1;
        let Some(caps) = TENANT_HOST.captures(line) else {
            continue;
        };
        let name = caps[1].to_lowercase();
        if !SKIPPED_TENANTS.contains(&name.as_str()) {
            names.insert(name);
        }
    }

    tracing::info!("Found {} unique tenants in {} URLs", names.len(), lines);
    names
}

/// Reads a URL dump and extracts its tenant names
pub fn extract_tenant_names_from_file(path: &Path) -> Result<BTreeSet<String>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(extract_tenant_names(&content))
}

/// Writes names one per line, in the set's sorted order
pub fn write_tenant_names(path: &Path, names: &BTreeSet<String>) -> Result<(), InputError> {
    let mut content = String::new();
    for name in names {
        content.push_str(name);
        content.push('\n');
    }
    std::fs::write(path, content).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Saved {} tenants to {}", names.len(), path.display());
    Ok(())
}

/// Loads a name file; blank lines and `#` comments are skipped
pub fn load_tenant_names(path: &Path) -> Result<Vec<String>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut seen = BTreeSet::new();
    let names: Vec<String> = content
        .lines()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter(|l| seen.insert(l.clone()))
        .collect();
    tracing::info!("Loaded {} tenant names from {}", names.len(), path.display());
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_tenant_names() {
        let dump = "\
https://acme.avature.net/careers/JobDetail/Engineer/1
http://ACME.avature.net/en_US/jobs
https://globex.avature.net

https://staging.avature.net/careers
https://Test.avature.net/careers
https://acme.avature.net.evil.com/careers
https://evil.example.com/acme.avature.net
not a url
";
        let names: Vec<_> = extract_tenant_names(dump).into_iter().collect();
        assert_eq!(names, vec!["acme", "globex"]);
    }

    #[test]
    fn test_lookalike_host_is_ignored() {
        assert!(extract_tenant_names("https://acme.avature.net.evil.com/careers").is_empty());
        assert!(extract_tenant_names("https://acme.avature.network/careers").is_empty());
        let names: Vec<_> = extract_tenant_names("https://acme.avature.net:443?x=1").into_iter().collect();
        assert_eq!(names, vec!["acme"]);
    }

    #[test]
    fn test_name_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tenants.txt");
        let names = extract_tenant_names("https://zeta.avature.net\nhttps://alpha.avature.net/x\n");
        write_tenant_names(&path, &names).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "alpha\nzeta\n");

        std::fs::write(&path, "# names\nalpha\n\nZeta\nalpha\n").unwrap();
        assert_eq!(load_tenant_names(&path).unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_missing_dump() {
        let result = extract_tenant_names_from_file(Path::new("/nonexistent/urls.txt"));
        assert!(matches!(result, Err(InputError::Io { .. })));
    }
}
