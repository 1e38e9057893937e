use crate::input::InputError;
use crate::url::{company_from_url, is_trusted_url, parse_http_url};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// A hosted career site to run discovery on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub company: String,
    pub base_url: Url,
}

/// Loads a newline-delimited tenant list
///
/// Blank lines and `#` comments are skipped. Lines that are not URLs on a
/// trusted hosting domain are logged and skipped; repeated companies keep
/// their first entry.
pub fn load_tenants(path: &Path, trusted: &[String]) -> Result<Vec<Tenant>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tenants = parse_tenants(&content, trusted);
    tracing::info!("Loaded {} tenants from {}", tenants.len(), path.display());
    Ok(tenants)
}

/// Parses tenant list text; see [`load_tenants`]
pub fn parse_tenants(content: &str, trusted: &[String]) -> Vec<Tenant> {
    let mut seen = HashSet::new();
    let mut tenants = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_number = index + 1;

        let url = match parse_http_url(line) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Invalid URL on line {}: {} ({})", line_number, line, e);
                continue;
            }
        };

        if !is_trusted_url(&url, trusted) {
            tracing::warn!("Untrusted host on line {}: {}", line_number, line);
            continue;
        }

        let Some(company) = company_from_url(&url) else {
            tracing::warn!("No company subdomain on line {}: {}", line_number, line);
            continue;
        };

        if seen.insert(company.clone()) {
            tenants.push(Tenant {
                company,
                base_url: url,
            });
        } else {
            tracing::debug!("Duplicate tenant {} on line {}", company, line_number);
        }
    }

    tenants
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn trusted() -> Vec<String> {
        vec!["*.avature.net".to_string()]
    }

    #[test]
    fn test_parse_tenants() {
        let content = "\
# career sites
https://acme.avature.net/careers

https://globex.avature.net
https://acme.avature.net/other
https://evil.example.com/careers
https://acme.avature.net.evil.com/careers
not a url
";
        let tenants = parse_tenants(content, &trusted());
        assert_eq!(tenants.len(), 2);
        assert_eq!(tenants[0].company, "acme");
        assert_eq!(tenants[0].base_url.path(), "/careers");
        assert_eq!(tenants[1].company, "globex");
    }

    #[test]
    fn test_load_tenants_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "https://initech.avature.net/careers").unwrap();
        let tenants = load_tenants(file.path(), &trusted()).unwrap();
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].company, "initech");
    }

    #[test]
    fn test_missing_file() {
        let result = load_tenants(Path::new("/nonexistent/tenants.txt"), &trusted());
        assert!(matches!(result, Err(InputError::Io { .. })));
    }
}
