//! Category listing scraper.
//!
//! Each category page (e.g. `/left/`) carries one table, identified by a
//! stable `id`, that links to every outlet rated in that category.

use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::html::{Page, anchors_in};
use crate::models::SourceLink;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Fetch a category listing page and return its source links.
///
/// A missing listing table is not an error: it yields no links and a warning.
///
/// # Arguments
///
/// * `fetcher` - Fetcher used for the listing request
/// * `url` - Absolute URL of the category listing page
/// * `table_id` - `id` of the `<table>` holding the source links
/// * `category` - Category name stamped onto every link
///
/// # Returns
///
/// The category's [`SourceLink`]s in page order, or the [`FetchError`] of the listing request.
#[instrument(level = "info", skip(fetcher, url, table_id), fields(url = %url))]
pub async fn index_category<F: Fetcher>(
    fetcher: &F,
    url: &Url,
    table_id: &str,
    category: &str,
) -> Result<Vec<SourceLink>, FetchError> {
    let body = fetcher.fetch(url.as_str()).await?;
    let links = collect_links(&body, table_id, url, category);
    info!(count = links.len(), category, "Indexed category sources");
    Ok(links)
}

/// Pull every `(text, href)` pair out of the listing table.
///
/// Anchors with empty text or an empty `href` are ignored. Absolute hrefs are
/// kept byte-for-byte, since they are the resume key. Relative hrefs are
/// resolved against `base`; anything that cannot be resolved is kept as-is.
pub fn collect_links(body: &str, table_id: &str, base: &Url, category: &str) -> Vec<SourceLink> {
    let page = Page::parse(body);
    let Some(table) = page.find_by_id("table", table_id) else {
        warn!(category, table_id, "No listing table found; category yields no sources");
        return Vec::new();
    };

    let links: Vec<SourceLink> = anchors_in(table)
        .into_iter()
        .filter(|a| !a.text.is_empty() && !a.href.is_empty())
        .map(|a| SourceLink {
            detail_url: resolve_href(base, a.href),
            name: a.text,
            category: category.to_string(),
        })
        .collect();
    debug!(urls = ?links.iter().map(|l| &l.detail_url).collect::<Vec<_>>(), "Listing URLs");
    links
}

fn resolve_href(base: &Url, href: String) -> String {
    if Url::parse(&href).is_ok() {
        return href;
    }
    base.join(&href).map(|u| u.to_string()).unwrap_or(href)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const LISTING: &str = r#"<html><body>
        <nav><a href="https://mediabiasfactcheck.com/about/">About</a></nav>
        <table id="mbfc-table">
          <tr><td><a href="https://mediabiasfactcheck.com/alternet/">AlterNet</a></td></tr>
          <tr><td><a href="/the-atlantic/"> The <em>Atlantic</em> </a></td></tr>
          <tr><td><a href="https://mediabiasfactcheck.com/blank/">  </a></td></tr>
          <tr><td><a>No target</a></td></tr>
          <tr><td><a href="">Empty target</a></td></tr>
        </table>
    </body></html>"#;

    fn base() -> Url {
        Url::parse("https://mediabiasfactcheck.com/left/").unwrap()
    }

    #[test]
    fn test_collects_table_links_in_order() {
        let links = collect_links(LISTING, "mbfc-table", &base(), "Left");
        assert_eq!(
            links,
            vec![
                SourceLink {
                    name: "AlterNet".to_string(),
                    detail_url: "https://mediabiasfactcheck.com/alternet/".to_string(),
                    category: "Left".to_string(),
                },
                SourceLink {
                    name: "TheAtlantic".to_string(),
                    detail_url: "https://mediabiasfactcheck.com/the-atlantic/".to_string(),
                    category: "Left".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_absolute_hrefs_are_kept_verbatim() {
        let body = r#"<table id="mbfc-table">
            <tr><td><a href="https://MediaBiasFactCheck.com/le-québécois/">Le Québécois</a></td></tr>
            <tr><td><a href="relative-page/">Relative</a></td></tr>
        </table>"#;
        let links = collect_links(body, "mbfc-table", &base(), "Left");
        assert_eq!(links[0].detail_url, "https://MediaBiasFactCheck.com/le-québécois/");
        assert_eq!(links[1].detail_url, "https://mediabiasfactcheck.com/left/relative-page/");
    }

    #[test]
    fn test_missing_table_yields_no_links() {
        let body = "<html><body><table id=\"other\"><tr><td><a href=\"/x/\">X</a></td></tr></table></body></html>";
        assert!(collect_links(body, "mbfc-table", &base(), "Left").is_empty());
    }

    struct OnePage(HashMap<String, String>);

    impl Fetcher for OnePage {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.0.get(url).cloned().ok_or_else(|| FetchError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_index_category_fetches_listing() {
        let fetcher = OnePage(HashMap::from([(base().to_string(), LISTING.to_string())]));
        let links = index_category(&fetcher, &base(), "mbfc-table", "Left").await.unwrap();
        assert_eq!(links.len(), 2);

        let right = Url::parse("https://mediabiasfactcheck.com/right/").unwrap();
        let err = index_category(&fetcher, &right, "mbfc-table", "Right").await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
    }
}
