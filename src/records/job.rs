use crate::state::SourceMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Location value used when a posting does not state one
pub const LOCATION_NOT_SPECIFIED: &str = "Not specified";

/// A successfully scraped job posting
///
/// Identity is `job_id`. Records are built once by the detail fetcher and
/// handed to the output sink unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub title: String,
    pub url: String,
    pub location: String,
    pub company: String,
    pub source_method: SourceMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_posted: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_url: Option<String>,

    pub scraped_at: DateTime<Utc>,
}

impl JobRecord {
    /// Names of the fields that carry a real value
    ///
    /// Title, URL and company are always present; location counts only when
    /// it is not the "Not specified" placeholder.
    pub fn fields_extracted(&self) -> Vec<&'static str> {
        let mut fields = vec!["job_id", "title", "url", "company"];
        if self.location != LOCATION_NOT_SPECIFIED && !self.location.is_empty() {
            fields.push("location");
        }
        let optional = [
            ("description", &self.description),
            ("date_posted", &self.date_posted),
            ("department", &self.department),
            ("employment_type", &self.employment_type),
            ("application_url", &self.application_url),
        ];
        for (name, value) in optional {
            if value.is_some() {
                fields.push(name);
            }
        }
        fields
    }
}
