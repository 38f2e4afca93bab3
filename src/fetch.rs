use anyhow::{Context, Result};
use scraper::{Html, Selector};
use std::fs;
use std::time::Duration;
use tracing::info;

/// Load the organization dump from a URL or a local file.
pub struct OrgSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl OrgSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub async fn load(&self, source: &str) -> Result<String> {
        let content = if source.starts_with("http://") || source.starts_with("https://") {
            self.fetch_url(source).await?
        } else {
            fs::read_to_string(source)
                .with_context(|| format!("Failed to read file: {}", source))?
        };

        Ok(unwrap_preformatted(&content))
    }

    async fn fetch_url(&self, url: &str) -> Result<String> {
        println!("🌐 Fetching organization list from: {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "HTTP request failed with status: {}",
                response.status()
            ));
        }

        let content = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {}", url))?;

        info!(url, bytes = content.len(), "organization list fetched");
        Ok(content)
    }
}

/// A script viewed through the browser arrives wrapped in `<pre>`; take
/// the text back out of it. Anything else is returned as is.
pub fn unwrap_preformatted(content: &str) -> String {
    if !content.contains("<pre") {
        return content.to_string();
    }

    let document = Html::parse_document(content);
    let pre_selector = Selector::parse("pre").unwrap();
    match document.select(&pre_selector).next() {
        Some(pre) => pre.text().collect(),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_script_is_untouched() {
        let script = "var organizations = [{program: \"A\"}];";
        assert_eq!(unwrap_preformatted(script), script);
    }

    #[test]
    fn pre_wrapper_is_removed_and_entities_decoded() {
        let html = "<html><head></head><body><pre style=\"word-wrap: break-word\">\
                    var organizations = [{program: &quot;A &amp; B&quot;}];</pre></body></html>";
        assert_eq!(
            unwrap_preformatted(html),
            "var organizations = [{program: \"A & B\"}];"
        );
    }

    #[tokio::test]
    async fn loads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("organizations.js");
        fs::write(&path, "<pre>program: \"A\"</pre>").unwrap();

        let source = OrgSource::new(Duration::from_secs(1));
        let text = source.load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(text, "program: \"A\"");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = OrgSource::new(Duration::from_secs(1));
        let err = source.load("/definitely/not/here.js").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
