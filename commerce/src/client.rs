//! HTTP client for one storefront's orders API.

use crate::config::StoreCredentials;
use crate::error::CommerceError;
use crate::orders::{Order, OrdersPage};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::header::HeaderMap;
use url::Url;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const REALTIME_WINDOW_MINUTES: i64 = 30;
const REALTIME_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
const HISTORICAL_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);
const HISTORICAL_PAGE_LIMIT: &str = "250";

const REALTIME_FIELDS: &str = "line_items,total_shipping_price_set,subtotal_price,created_at";
const HISTORICAL_FIELDS: &str = "id,line_items,subtotal_price,total_shipping_price_set,created_at";

pub struct StoreClient {
    store_id: String,
    endpoint: Url,
    access_token: String,
    http: reqwest::Client,
}

impl StoreClient {
    pub fn new(creds: &StoreCredentials) -> Result<Self, CommerceError> {
        let endpoint = format!(
            "https://{}/admin/api/{}/orders.json",
            creds.shop_domain, creds.api_version
        );
        let endpoint = Url::parse(&endpoint).map_err(|e| CommerceError::InvalidEndpoint {
            store_id: creds.store_id.clone(),
            message: e.to_string(),
        })?;
        Ok(Self::with_endpoint(
            &creds.store_id,
            &creds.access_token,
            endpoint,
        ))
    }

    /// Builds a client against an explicit endpoint URL. Useful when the
    /// orders API is fronted by a proxy, and for tests against a local
    /// mock server.
    pub fn with_endpoint(store_id: &str, access_token: &str, endpoint: Url) -> Self {
        StoreClient {
            store_id: store_id.to_string(),
            endpoint,
            access_token: access_token.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Orders created in the last 30 minutes, any status. Single page: the
    /// realtime window is small enough that one page always covers it.
    pub async fn fetch_recent_orders(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Order>, CommerceError> {
        let created_at_min = (now - Duration::minutes(REALTIME_WINDOW_MINUTES))
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let response = self
            .http
            .get(self.endpoint.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .query(&[
                ("status", "any"),
                ("created_at_min", created_at_min.as_str()),
                ("fields", REALTIME_FIELDS),
            ])
            .timeout(REALTIME_TIMEOUT)
            .send()
            .await?;

        let (page, _) = self.decode_page(response).await?;
        Ok(page.orders)
    }

    /// All orders created in `[start, end)`, following the `Link` header
    /// "next" cursor until the upstream stops returning one.
    pub async fn fetch_orders_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, CommerceError> {
        let created_at_min = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let created_at_max = end.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut request = self.http.get(self.endpoint.clone()).query(&[
            ("status", "any"),
            ("created_at_min", created_at_min.as_str()),
            ("created_at_max", created_at_max.as_str()),
            ("limit", HISTORICAL_PAGE_LIMIT),
            ("fields", HISTORICAL_FIELDS),
        ]);

        let mut orders = Vec::new();
        loop {
            let response = request
                .header(ACCESS_TOKEN_HEADER, &self.access_token)
                .timeout(HISTORICAL_TIMEOUT)
                .send()
                .await?;

            let (page, next) = self.decode_page(response).await?;
            orders.extend(page.orders);

            match next {
                // The next-page URL carries the full cursor; no query
                // params are re-applied.
                Some(url) => request = self.http.get(url),
                None => break,
            }
        }
        Ok(orders)
    }

    /// Checks the status, extracts the "next" cursor and decodes the body.
    async fn decode_page(
        &self,
        response: reqwest::Response,
    ) -> Result<(OrdersPage, Option<Url>), CommerceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(CommerceError::BadStatus {
                store_id: self.store_id.clone(),
                status,
            });
        }

        let next = next_page_url(response.headers());
        let page = response
            .json::<OrdersPage>()
            .await
            .map_err(|e| CommerceError::MalformedPayload {
                store_id: self.store_id.clone(),
                message: e.to_string(),
            })?;
        Ok((page, next))
    }
}

/// Extracts the `rel="next"` target from a `Link` header, e.g.
/// `<https://…/orders.json?page_info=abc>; rel="next"`.
fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    let value = headers.get(reqwest::header::LINK)?.to_str().ok()?;
    for part in value.split(',') {
        let mut sections = part.split(';');
        let Some(target) = sections.next() else {
            continue;
        };
        if sections.any(|section| section.trim() == r#"rel="next""#) {
            let target = target.trim();
            if let Some(url) = target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .and_then(|t| Url::parse(t).ok())
            {
                return Some(url);
            }
        }
    }
    None
}
