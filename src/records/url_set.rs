use crate::state::SourceMethod;
use crate::url::extract_job_id;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A job-detail URL together with where it was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub url: String,
    pub job_id: String,
    pub source: SourceMethod,
}

/// Insertion-ordered set of job URLs keyed by job id
///
/// Two URLs with the same job id are duplicates even if their scheme or
/// query differ; the first one inserted wins. URLs without a job id are
/// rejected.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredUrlSet {
    entries: Vec<DiscoveredUrl>,
    ids: HashSet<String>,
}

impl DiscoveredUrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a URL unless its job id is already present
    ///
    /// # Returns
    ///
    /// * `true` - The URL introduced a new job id
    /// * `false` - Duplicate job id, or no job id could be extracted
    pub fn insert(&mut self, url: &str, source: SourceMethod) -> bool {
        let Some(job_id) = extract_job_id(url) else {
            return false;
        };
        if !self.ids.insert(job_id.clone()) {
            return false;
        }
        self.entries.push(DiscoveredUrl {
            url: url.to_string(),
            job_id,
            source,
        });
        true
    }

    /// Inserts every URL, returning how many were new
    pub fn extend<'a, I>(&mut self, urls: I, source: SourceMethod) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        urls.into_iter()
            .filter(|url| self.insert(url, source))
            .count()
    }

    /// Folds another set into this one; entries already here keep precedence
    pub fn merge(&mut self, other: DiscoveredUrlSet) -> usize {
        let mut added = 0;
        for entry in other.entries {
            if self.ids.insert(entry.job_id.clone()) {
                self.entries.push(entry);
                added += 1;
            }
        }
        added
    }

    pub fn contains_id(&self, job_id: &str) -> bool {
        self.ids.contains(job_id)
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscoveredUrl> {
        self.entries.iter()
    }

    /// URLs in insertion order
    pub fn urls(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.url.clone()).collect()
    }

    pub fn into_entries(self) -> Vec<DiscoveredUrl> {
        self.entries
    }
}

/// Deduplicates a URL list by job id, keeping the first occurrence
///
/// Applying it twice gives the same result as applying it once.
///
/// # Examples
///
/// ```
/// use avature_harvester::records::dedup_by_job_id;
///
/// let urls = vec![
///     "https://acme.avature.net/careers/JobDetail/A/1".to_string(),
///     "http://acme.avature.net/careers/JobDetail/A/1?src=rss".to_string(),
///     "https://acme.avature.net/careers/JobDetail/B/2".to_string(),
/// ];
/// let once = dedup_by_job_id(&urls);
/// assert_eq!(once.len(), 2);
/// assert_eq!(dedup_by_job_id(&once), once);
/// ```
pub fn dedup_by_job_id(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .filter(|url| match extract_job_id(url) {
            Some(id) => seen.insert(id),
            None => false,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: u32) -> String {
        format!("https://acme.avature.net/careers/JobDetail/Role/{id}")
    }

    #[test]
    fn test_first_seen_wins() {
        let mut set = DiscoveredUrlSet::new();
        assert!(set.insert(&job(1), SourceMethod::Sitemap));
        assert!(!set.insert(&format!("{}?src=list", job(1)), SourceMethod::Html));
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().source, SourceMethod::Sitemap);
        assert_eq!(set.urls(), vec![job(1)]);
    }

    #[test]
    fn test_scheme_difference_is_duplicate() {
        let mut set = DiscoveredUrlSet::new();
        set.insert(&job(5), SourceMethod::Sitemap);
        assert!(!set.insert(&job(5).replace("https", "http"), SourceMethod::Html));
    }

    #[test]
    fn test_job_id_query_difference_is_duplicate() {
        let plain = job(1234);
        let with_query = format!("{}?jobId=555", job(1234));

        let mut set = DiscoveredUrlSet::new();
        assert!(set.insert(&plain, SourceMethod::Sitemap));
        assert!(!set.insert(&with_query, SourceMethod::Html));
        assert_eq!(set.len(), 1);
        assert!(set.contains_id("1234"));

        assert_eq!(dedup_by_job_id(&[plain.clone(), with_query]), vec![plain]);
    }

    #[test]
    fn test_merge_keeps_precedence() {
        let mut sitemap = DiscoveredUrlSet::new();
        sitemap.extend([job(1), job(2), job(3)].iter().map(String::as_str), SourceMethod::Sitemap);

        let mut html = DiscoveredUrlSet::new();
        html.extend([job(2), job(3), job(4)].iter().map(String::as_str), SourceMethod::Html);

        let added = sitemap.merge(html);
        assert_eq!(added, 1);
        assert_eq!(sitemap.len(), 4);

        let sources: Vec<_> = sitemap.iter().map(|e| (e.job_id.as_str(), e.source)).collect();
        assert_eq!(sources[1], ("2", SourceMethod::Sitemap));
        assert_eq!(sources[3], ("4", SourceMethod::Html));
    }

    #[test]
    fn test_no_duplicate_ids_invariant() {
        let mut set = DiscoveredUrlSet::new();
        for i in [1, 2, 2, 3, 1, 4, 3] {
            set.insert(&job(i), SourceMethod::Html);
        }
        let unique: HashSet<_> = set.iter().map(|e| e.job_id.clone()).collect();
        assert_eq!(unique.len(), set.len());
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_dedup_idempotent() {
        let urls: Vec<String> = [1, 2, 1, 3, 2, 4].iter().map(|i| job(*i)).collect();
        let once = dedup_by_job_id(&urls);
        let twice = dedup_by_job_id(&once);
        assert_eq!(once, twice);
        assert_eq!(once, vec![job(1), job(2), job(3), job(4)]);
    }
}
