use crate::models::Selectors;
use crate::pager::{has_class, DirectoryPage};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory pages saved to disk, one HTML file per page, read in
/// file-name order.
pub struct SavedPages {
    files: Vec<PathBuf>,
    current: usize,
    html: String,
    next_button: Selector,
    info: Selector,
    disabled_class: String,
}

impl SavedPages {
    pub fn open(dir: &Path, selectors: &Selectors) -> Result<Self> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Failed to read pages directory: {}", dir.display()))?
        {
            let path = entry?.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if matches!(ext, Some("html") | Some("htm")) {
                files.push(path);
            }
        }
        files.sort();

        let first = files
            .first()
            .ok_or_else(|| anyhow!("No .html pages found in {}", dir.display()))?;
        let html = read_page(first)?;

        Ok(Self {
            files,
            current: 0,
            html,
            next_button: parse_selector(&selectors.next_button)?,
            info: parse_selector(&selectors.info)?,
            disabled_class: selectors.disabled_class.clone(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.files.len()
    }

    fn current_file(&self) -> &Path {
        &self.files[self.current]
    }
}

#[async_trait]
impl DirectoryPage for SavedPages {
    async fn page_source(&mut self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn summary_text(&mut self) -> Result<String> {
        let document = Html::parse_document(&self.html);
        let info = document
            .select(&self.info)
            .next()
            .ok_or_else(|| anyhow!("No summary element in {}", self.current_file().display()))?;
        Ok(info.text().collect())
    }

    async fn next_disabled(&mut self) -> Result<bool> {
        let class = {
            let document = Html::parse_document(&self.html);
            let next = document.select(&self.next_button).next().ok_or_else(|| {
                anyhow!("No next control in {}", self.current_file().display())
            })?;
            next.value().attr("class").unwrap_or("").to_string()
        };

        if has_class(&class, &self.disabled_class) {
            return Ok(true);
        }
        if self.current + 1 >= self.files.len() {
            warn!(
                file = %self.current_file().display(),
                "next control is enabled but no further saved page exists"
            );
            return Ok(true);
        }
        Ok(false)
    }

    async fn advance(&mut self) -> Result<()> {
        if self.current + 1 >= self.files.len() {
            bail!("No saved page after {}", self.current_file().display());
        }
        self.current += 1;
        self.html = read_page(&self.files[self.current])?;
        Ok(())
    }
}

fn read_page(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid selector {:?}: {}", selector, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultSet;
    use crate::pager::Pager;
    use crate::scraper::RowExtractor;
    use crate::test_support::{directory_page, numbered_rows};

    fn write_pages(dir: &Path, sizes: &[usize], total: usize, last_disabled: bool) {
        let mut first = 1;
        for (i, &size) in sizes.iter().enumerate() {
            let info = format!("Showing {} to {} of {} entries", first, first + size - 1, total);
            let disabled = last_disabled && i + 1 == sizes.len();
            let html = directory_page(&numbered_rows(first, size), &info, disabled);
            fs::write(dir.join(format!("page-{:03}.html", i + 1)), html).unwrap();
            first += size;
        }
    }

    #[tokio::test]
    async fn walks_saved_pages_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_pages(dir.path(), &[10, 10, 5], 25, true);
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut pages = SavedPages::open(dir.path(), &Selectors::default()).unwrap();
        assert_eq!(pages.page_count(), 3);

        let extractor = RowExtractor::new("#location-table").unwrap();
        let mut results = ResultSet::new();
        let outcome = Pager::new(&extractor)
            .scrape_directory(&mut pages, &mut results)
            .await
            .unwrap();

        assert_eq!(outcome.expected, 25);
        assert_eq!(outcome.pages, 3);
        assert_eq!(outcome.extracted, 25);
        let last = results.iter().last().unwrap();
        assert_eq!(last.partner_program, "Partner 25");
        assert_eq!(last.lat, "25.0");
    }

    #[tokio::test]
    async fn running_out_of_files_ends_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        write_pages(dir.path(), &[10, 10], 47, false);

        let mut pages = SavedPages::open(dir.path(), &Selectors::default()).unwrap();
        assert!(!pages.next_disabled().await.unwrap());
        pages.advance().await.unwrap();
        assert!(pages.next_disabled().await.unwrap());
        assert!(pages.advance().await.is_err());
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SavedPages::open(dir.path(), &Selectors::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("No .html pages"));
    }
}
