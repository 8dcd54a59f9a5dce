//! Scrapers for the two kinds of page on the ratings site.
//!
//! Each scraper follows the same two-step pattern: fetch through a
//! [`Fetcher`](crate::fetcher::Fetcher), then parse the body with a pure
//! function that can be tested without the network.
//!
//! | Page | Module | Fetch + parse | Pure parser |
//! |------|--------|---------------|-------------|
//! | Category listing | [`category`] | `index_category` | `collect_links` |
//! | Source detail page | [`source`] | `fetch_record` | `extract_record` |

pub mod category;
pub mod source;
