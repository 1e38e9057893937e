//! Sitemap and RSS feed parsing

use crate::url::is_job_detail_url;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;

/// Every `<loc>` value in a sitemap (urlset or sitemapindex)
///
/// Parsing stops quietly at the first malformed element; whatever was read
/// before it is returned.
pub fn parse_sitemap_locs(xml: &[u8]) -> Vec<String> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut in_loc = false;
    let mut locs = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(e)) => {
                if e.name().as_ref().ends_with(b"loc") {
                    in_loc = true;
                }
            }
            Ok(XmlEvent::End(e)) => {
                if e.name().as_ref().ends_with(b"loc") {
                    in_loc = false;
                }
            }
            Ok(XmlEvent::Text(t)) if in_loc => match t.unescape() {
                Ok(text) => locs.push(text.trim().to_string()),
                Err(e) => tracing::debug!("Skipping undecodable <loc>: {}", e),
            },
            Ok(XmlEvent::CData(t)) if in_loc => {
                locs.push(String::from_utf8_lossy(&t).trim().to_string());
            }
            Ok(XmlEvent::Eof) => break,
            Err(e) => {
                tracing::debug!("Sitemap parse stopped at byte {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    locs.retain(|loc| !loc.is_empty());
    locs
}

/// Job-detail URLs listed in a sitemap, in document order
pub fn job_urls_from_sitemap(xml: &[u8]) -> Vec<String> {
    parse_sitemap_locs(xml)
        .into_iter()
        .filter(|loc| is_job_detail_url(loc))
        .collect()
}

/// Number of `<item>` elements in an RSS feed
pub fn count_feed_items(xml: &[u8]) -> usize {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut items = 0;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(e)) if e.name().as_ref() == b"item" => items += 1,
            Ok(XmlEvent::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://acme.avature.net/careers/JobDetail/Engineer/1</loc></url>
  <url><loc>https://acme.avature.net/careers/SearchJobs</loc></url>
  <url><loc> https://acme.avature.net/careers/JobDetail/Analyst/2 </loc></url>
  <url><loc><![CDATA[https://acme.avature.net/careers/JobDetail/Nurse/3]]></loc></url>
</urlset>"#;

    #[test]
    fn test_parse_sitemap_locs() {
        let locs = parse_sitemap_locs(SITEMAP.as_bytes());
        assert_eq!(locs.len(), 4);
        assert_eq!(locs[2], "https://acme.avature.net/careers/JobDetail/Analyst/2");
    }

    #[test]
    fn test_job_urls_filtered() {
        let urls = job_urls_from_sitemap(SITEMAP.as_bytes());
        assert_eq!(urls.len(), 3);
        assert!(urls.iter().all(|u| u.contains("/JobDetail/")));
    }

    #[test]
    fn test_malformed_sitemap_keeps_prefix() {
        let xml = b"<urlset><url><loc>https://a.avature.net/JobDetail/x/1</loc></url></bogus>\
                    <url><loc>https://a.avature.net/JobDetail/x/2</loc></url></urlset>";
        let locs = parse_sitemap_locs(xml);
        assert_eq!(locs, vec!["https://a.avature.net/JobDetail/x/1".to_string()]);
    }

    #[test]
    fn test_non_xml_body_yields_nothing() {
        assert!(job_urls_from_sitemap(b"<html><body>Not found</body></html>").is_empty());
    }

    #[test]
    fn test_count_feed_items() {
        let feed = br#"<rss><channel><title>Jobs</title>
            <item><title>A</title></item>
            <item><title>B</title></item>
        </channel></rss>"#;
        assert_eq!(count_feed_items(feed), 2);
        assert_eq!(count_feed_items(b"<rss><channel/></rss>"), 0);
    }
}
