// # HTTP Adapters
//
// Network-facing implementations of the core traits:
//
// - [`HttpListingFeed`]: fetches `{"data": [listing, ...]}` from the listings API
// - [`HttpAddressLookup`]: fetches a listing's page and collects the token
//   contract addresses it links to on the block explorer
//
// Both adapters are single-shot. Pacing between listings belongs to the
// engine's throttle, so nothing here retries or sleeps.

use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use tokensync_core::model::{Address, Listing, ListingId};
use tokensync_core::traits::{AddressLookup, ListingFeed, LookupResult};
use tokensync_core::{Error, Result};

/// Default HTTP timeout for requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Sent on every request; the listings API rejects empty agents
const USER_AGENT: &str = concat!("tokensync/", env!("CARGO_PKG_VERSION"));

/// Metadata value recorded for addresses found through etherscan links
const EXPLORER: &str = "etherscan";

static TOKEN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"etherscan\.io/token/(0x[0-9a-fA-F]{40})\b").expect("valid token link pattern")
});

fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
}

/// Listings feed backed by the remote listings API
pub struct HttpListingFeed {
    url: String,
    client: reqwest::Client,
}

impl HttpListingFeed {
    /// Create a feed reading from `url`
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            client: build_client()?,
        })
    }
}

#[async_trait]
impl ListingFeed for HttpListingFeed {
    async fn fetch(&self) -> Result<Vec<Listing>> {
        tracing::debug!("Fetching listings from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::feed(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                429 => Error::feed(format!("Rate limit exceeded. Status: {}", status)),
                500..=599 => Error::feed(format!("Server error (transient): {}", status)),
                _ => Error::feed(format!("HTTP error: {}", status)),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::feed(format!("Failed to parse response: {}", e)))?;

        parse_listings(body)
    }

    fn feed_name(&self) -> &'static str {
        "http"
    }
}

/// Feed element as sent on the wire; blank fields are caught by the processor
#[derive(Debug, Deserialize)]
struct WireListing {
    id: Option<ListingId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    website_slug: Option<String>,
}

/// Extract listings from a feed response body
///
/// The body must hold a `data` array. Elements without a numeric `id` are
/// dropped with a warning; elements missing other fields are kept with the
/// field blank so the processor reports them as ineligible.
pub fn parse_listings(body: Value) -> Result<Vec<Listing>> {
    let Value::Object(mut root) = body else {
        return Err(Error::feed("Response is not a JSON object"));
    };
    let Some(Value::Array(data)) = root.remove("data") else {
        return Err(Error::feed("Response has no \"data\" array"));
    };

    let mut listings = Vec::with_capacity(data.len());
    for element in data {
        let wire: WireListing = match serde_json::from_value(element) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::warn!("Ignoring unreadable listing: {}", e);
                continue;
            }
        };
        let Some(id) = wire.id else {
            tracing::warn!("Ignoring listing without an id");
            continue;
        };
        listings.push(Listing::new(
            id,
            wire.name.unwrap_or_default(),
            wire.symbol.unwrap_or_default(),
            wire.website_slug.unwrap_or_default(),
        ));
    }
    Ok(listings)
}

/// Address lookup that scrapes a listing's page for explorer token links
///
/// A page without any token link is reported as unresolvable (`Ok(None)`),
/// never as an empty address set. Scraping cannot tell "this listing has no
/// contract any more" apart from "the page layout changed", so this lookup
/// never asks the reconciler to deprecate every address of a listing. An
/// address only gets deprecated when the page still links other addresses.
pub struct HttpAddressLookup {
    url_template: String,
    client: reqwest::Client,
}

impl HttpAddressLookup {
    /// Create a lookup; `url_template` must contain `{slug}`
    pub fn new(url_template: impl Into<String>) -> Result<Self> {
        let url_template = url_template.into();
        if !url_template.contains("{slug}") {
            return Err(Error::config(
                "Lookup URL template must contain a {slug} placeholder",
            ));
        }
        Ok(Self {
            url_template,
            client: build_client()?,
        })
    }

    /// Page URL for `listing`
    pub fn page_url(&self, listing: &Listing) -> String {
        self.url_template.replace("{slug}", &listing.website_slug)
    }
}

#[async_trait]
impl AddressLookup for HttpAddressLookup {
    async fn lookup(&self, listing: &Listing) -> Result<Option<LookupResult>> {
        let url = self.page_url(listing);
        tracing::debug!("Looking up addresses for '{}' at {}", listing.website_slug, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::lookup(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 404 {
            tracing::debug!("No page for '{}'", listing.website_slug);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::lookup(format!("HTTP error: {}", status)));
        }

        let page = response
            .text()
            .await
            .map_err(|e| Error::lookup(format!("Failed to read response: {}", e)))?;

        Ok(lookup_result(&page))
    }

    fn lookup_name(&self) -> &'static str {
        "http"
    }
}

/// Lookup answer for a fetched page; `None` when it links no token
pub fn lookup_result(page: &str) -> Option<LookupResult> {
    let addresses = extract_addresses(page);
    if addresses.is_empty() {
        return None;
    }
    Some(LookupResult::new(addresses).with_metadata("explorer", Value::from(EXPLORER)))
}

/// Collect the distinct token addresses linked from `page`, lowercased
pub fn extract_addresses(page: &str) -> BTreeSet<Address> {
    TOKEN_LINK
        .captures_iter(page)
        .map(|caps| caps[1].to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_listings_reads_data_array() {
        let body = json!({
            "data": [
                {"id": 1, "name": "Bitcoin", "symbol": "BTC", "website_slug": "bitcoin"},
                {"id": 1027, "name": "Ethereum", "symbol": "ETH", "website_slug": "ethereum"}
            ],
            "metadata": {"num_cryptocurrencies": 2}
        });

        let listings = parse_listings(body).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0], Listing::new(1, "Bitcoin", "BTC", "bitcoin"));
        assert_eq!(listings[1].website_slug, "ethereum");
    }

    #[test]
    fn test_parse_listings_blank_fields_and_missing_ids() {
        let body = json!({
            "data": [
                {"id": 5, "name": "No Slug", "symbol": "NS"},
                {"name": "No Id", "symbol": "NI", "website_slug": "no-id"},
                {"id": "seven"}
            ]
        });

        let listings = parse_listings(body).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, 5);
        assert_eq!(listings[0].missing_field(), Some("website_slug"));
    }

    #[test]
    fn test_parse_listings_requires_data() {
        assert!(matches!(parse_listings(json!({"status": "ok"})), Err(Error::Feed(_))));
        assert!(matches!(parse_listings(json!([])), Err(Error::Feed(_))));
    }

    #[test]
    fn test_extract_addresses() {
        let page = r#"
            <a href="https://etherscan.io/token/0xB8c77482e45F1F44dE1745F52C74426C631bDD52">BNB</a>
            <a href="https://etherscan.io/token/0xb8c77482e45f1f44de1745f52c74426c631bdd52?a=1">again</a>
            <a href="https://etherscan.io/address/0x0000000000000000000000000000000000000001">not a token</a>
            <a href="https://etherscan.io/token/0x1234">too short</a>
        "#;

        let addresses = extract_addresses(page);
        assert_eq!(addresses.len(), 1);
        assert!(addresses.contains("0xb8c77482e45f1f44de1745f52c74426c631bdd52"));
    }

    #[test]
    fn test_extract_addresses_none() {
        assert!(extract_addresses("<html>Bitcoin has no token contract</html>").is_empty());
    }

    #[test]
    fn test_page_without_links_is_unresolvable() {
        assert_eq!(lookup_result("<html>Bitcoin has no token contract</html>"), None);

        let found = lookup_result(
            r#"<a href="https://etherscan.io/token/0x00000000000000000000000000000000000000aa">x</a>"#,
        )
        .unwrap();
        assert_eq!(found.addresses.len(), 1);
        assert_eq!(found.metadata.get("explorer"), Some(&Value::from("etherscan")));
    }

    #[test]
    fn test_lookup_requires_slug_placeholder() {
        assert!(HttpAddressLookup::new("https://example.org/currencies/").is_err());

        let lookup = HttpAddressLookup::new("https://example.org/currencies/{slug}/").unwrap();
        let listing = Listing::new(2, "Binance Coin", "BNB", "binance-coin");
        assert_eq!(lookup.page_url(&listing), "https://example.org/currencies/binance-coin/");
    }
}
