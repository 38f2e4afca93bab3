use crate::models::{Config, Selectors, Timeouts};
use crate::pager::{has_class, DirectoryPage};
use crate::scraper::{parse_total_entries, ScrapeError};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Poll `probe` until it yields a value or `timeout` passes.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = Instant::now();
    loop {
        if let Some(value) = probe().await {
            debug!(what, waited_ms = started.elapsed().as_millis() as u64, "ready");
            return Ok(value);
        }
        if started.elapsed() >= timeout {
            return Err(ScrapeError::Timeout {
                what: what.to_string(),
                waited: started.elapsed(),
            });
        }
        tokio::time::sleep(interval).await;
    }
}

/// The live directory, driven through a headless Chromium.
pub struct BrowserDirectory {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
    selectors: Selectors,
    timeouts: Timeouts,
}

impl BrowserDirectory {
    /// Open the directory page and run the empty search that fills the
    /// table. Returns once page 1 is rendered.
    pub async fn launch(config: &Config) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow!("Invalid browser configuration: {}", e))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page(config.directory_url.as_str())
            .await
            .with_context(|| format!("Failed to open {}", config.directory_url))?;

        let directory = Self {
            browser,
            handler_task,
            page,
            selectors: config.selectors.clone(),
            timeouts: config.timeouts.clone(),
        };
        if let Err(e) = directory.start_search().await {
            if let Err(close_err) = directory.close().await {
                debug!("{:#}", close_err);
            }
            return Err(e);
        }
        Ok(directory)
    }

    async fn start_search(&self) -> Result<()> {
        let search = poll_until(
            "search input",
            secs(self.timeouts.page_load_secs),
            self.poll_interval(),
            || self.find(&self.selectors.search_input),
        )
        .await?;

        search
            .press_key("Enter")
            .await
            .context("Failed to submit directory search")?;

        let summary = poll_until(
            "directory search results",
            secs(self.timeouts.search_secs),
            self.poll_interval(),
            || self.rendered_summary(None),
        )
        .await?;

        info!(summary = %summary, "directory search loaded");
        Ok(())
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await.context("Failed to close Chromium")?;
        if let Err(e) = self.browser.wait().await {
            debug!("waiting for Chromium to exit: {}", e);
        }
        self.handler_task.abort();
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.timeouts.poll_interval_ms)
    }

    async fn find(&self, selector: &str) -> Option<Element> {
        self.page.find_element(selector).await.ok()
    }

    async fn read_summary(&self) -> Result<String> {
        let info = self
            .page
            .find_element(self.selectors.info.as_str())
            .await
            .with_context(|| format!("Summary element {} not found", self.selectors.info))?;
        Ok(info.inner_text().await?.unwrap_or_default())
    }

    /// The summary, once the table has rows and the summary reports a
    /// total, and differs from `previous` when one is given.
    async fn rendered_summary(&self, previous: Option<&str>) -> Option<String> {
        let rows = format!("{} tbody tr", self.selectors.table);
        let has_rows = self
            .page
            .find_elements(rows.as_str())
            .await
            .map(|rows| !rows.is_empty())
            .unwrap_or(false);
        if !has_rows {
            return None;
        }

        let summary = self.read_summary().await.ok()?;
        parse_total_entries(&summary).ok()?;
        match previous {
            Some(previous) if previous == summary => None,
            _ => Some(summary),
        }
    }

    async fn next_button(&self) -> Result<Element> {
        self.page
            .find_element(self.selectors.next_button.as_str())
            .await
            .with_context(|| format!("Next control {} not found", self.selectors.next_button))
    }
}

#[async_trait]
impl DirectoryPage for BrowserDirectory {
    async fn page_source(&mut self) -> Result<String> {
        self.page.content().await.context("Failed to read page source")
    }

    async fn summary_text(&mut self) -> Result<String> {
        self.read_summary().await
    }

    async fn next_disabled(&mut self) -> Result<bool> {
        let class = self.next_button().await?.attribute("class").await?;
        Ok(has_class(
            class.as_deref().unwrap_or(""),
            &self.selectors.disabled_class,
        ))
    }

    async fn advance(&mut self) -> Result<()> {
        let before = self.read_summary().await?;
        self.next_button()
            .await?
            .click()
            .await
            .context("Failed to activate next control")?;

        let this = &*self;
        poll_until(
            "next directory page",
            secs(this.timeouts.navigation_secs),
            this.poll_interval(),
            || this.rendered_summary(Some(before.as_str())),
        )
        .await?;
        Ok(())
    }
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}
