use crate::ConfigError;
use url::Url;

/// Builds the URL of each page of one listing
///
/// Page 1 is always the bare base URL. Later pages either append
/// `/?page=N` to the base path or, when a query parameter name is set, add
/// `param=N` to the base URL's query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTemplate {
    base: Url,
    page_param: Option<String>,
}

impl PageTemplate {
    pub fn parse(base: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(base)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid page URL '{}': {}", base, e)))?;
        Ok(Self {
            base,
            page_param: None,
        })
    }

    pub fn with_page_param(mut self, param: &str) -> Self {
        self.page_param = Some(param.to_string());
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn url_for(&self, page: u32) -> String {
        if page <= 1 {
            return self.base.to_string();
        }

        match &self.page_param {
            Some(param) => {
                let mut url = self.base.clone();
                url.query_pairs_mut()
                    .append_pair(param, &page.to_string());
                url.to_string()
            }
            None => format!(
                "{}/?page={}",
                self.base.as_str().trim_end_matches('/'),
                page
            ),
        }
    }
}
