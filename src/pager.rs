use crate::models::ResultSet;
use crate::scraper::{parse_total_entries, RowExtractor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Write;
use tracing::{debug, info};

/// A directory listing positioned on some page, able to move forward.
#[async_trait]
pub trait DirectoryPage {
    /// Markup of the page currently shown.
    async fn page_source(&mut self) -> Result<String>;

    /// The "Showing X to Y of Z entries" text under the table.
    async fn summary_text(&mut self) -> Result<String>;

    /// Whether the "next" control carries its disabled marker.
    async fn next_disabled(&mut self) -> Result<bool>;

    /// Activate "next" and return once the following page is rendered.
    async fn advance(&mut self) -> Result<()>;
}

/// True when a space-separated class list contains `marker`.
pub fn has_class(class_attr: &str, marker: &str) -> bool {
    class_attr.split_whitespace().any(|class| class == marker)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryOutcome {
    /// Total the site reported before paging started.
    pub expected: usize,
    pub pages: usize,
    pub extracted: usize,
}

pub struct Pager<'a> {
    extractor: &'a RowExtractor,
    progress_every: usize,
}

impl<'a> Pager<'a> {
    pub fn new(extractor: &'a RowExtractor) -> Self {
        Self {
            extractor,
            progress_every: 10,
        }
    }

    /// Read the reported total, then walk every page into `results`.
    pub async fn scrape_directory<P>(
        &self,
        page: &mut P,
        results: &mut ResultSet,
    ) -> Result<DirectoryOutcome>
    where
        P: DirectoryPage + Send,
    {
        let summary = page.summary_text().await?;
        let expected = parse_total_entries(&summary)?;
        info!(expected, "directory reports total entries");

        let (pages, extracted) = self.run(page, results).await?;
        Ok(DirectoryOutcome {
            expected,
            pages,
            extracted,
        })
    }

    /// Extract the current page, then move on while "next" is enabled.
    /// Returns pages visited and records added.
    pub async fn run<P>(&self, page: &mut P, results: &mut ResultSet) -> Result<(usize, usize)>
    where
        P: DirectoryPage + Send,
    {
        let mut pages = 0;
        let mut extracted = 0;

        loop {
            let html = page.page_source().await?;
            let added = self
                .extractor
                .extract_page(&html, results)
                .with_context(|| format!("Failed to extract directory page {}", pages + 1))?;
            pages += 1;
            extracted += added;
            debug!(page = pages, added, "page extracted");

            // The last page has already been extracted when this fires.
            if page.next_disabled().await? {
                break;
            }

            page.advance()
                .await
                .with_context(|| format!("Failed to move past directory page {}", pages))?;

            if pages % self.progress_every == 1 {
                print!("|");
                if let Err(e) = std::io::stdout().flush() {
                    debug!("failed to flush progress marker: {}", e);
                }
            }
        }

        if pages > 1 {
            println!();
        }
        info!(pages, extracted, "pagination finished");
        Ok((pages, extracted))
    }
}
