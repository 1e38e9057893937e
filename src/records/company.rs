use crate::url::is_trusted_url;
use crate::HarvestError;
use serde::Serialize;
use url::Url;

/// One tenant's career site as seen by the discovery engine
///
/// `resolved_base_url` starts equal to `base_url` and can only be replaced by
/// a URL on a trusted hosting domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyContext {
    pub company_name: String,
    base_url: Url,
    resolved_base_url: Url,
}

impl CompanyContext {
    pub fn new(company_name: impl Into<String>, base_url: Url) -> Self {
        Self {
            company_name: company_name.into(),
            resolved_base_url: base_url.clone(),
            base_url,
        }
    }

    /// Replaces the resolved base URL after following redirects
    ///
    /// # Returns
    ///
    /// * `Ok(CompanyContext)` - The resolved URL stays on a trusted domain
    /// * `Err(HarvestError::ExternalRedirect)` - The redirect left the trusted domains
    pub fn with_resolved(self, resolved: Url, trusted: &[String]) -> Result<Self, HarvestError> {
        if !is_trusted_url(&resolved, trusted) {
            return Err(HarvestError::ExternalRedirect {
                from: self.base_url.to_string(),
                to: resolved.to_string(),
            });
        }
        Ok(Self {
            resolved_base_url: resolved,
            ..self
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn resolved_base_url(&self) -> &Url {
        &self.resolved_base_url
    }

    /// Returns true if resolution moved the site to a different URL
    pub fn was_redirected(&self) -> bool {
        self.base_url != self.resolved_base_url
    }
}
