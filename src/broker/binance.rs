// =============================================================================
// Binance Broker — kline backfill and HMAC-SHA256 signed market orders
// =============================================================================
//
// SECURITY: The secret key is never logged or serialized. All signed requests
// include X-MBX-APIKEY as a header and a recvWindow of 5 000 ms to tolerate
// minor clock drift between the bot and Binance servers.
// =============================================================================

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;
use tracing::{debug, info, instrument, warn};

use super::{interval_for_period, Broker, OrderAck, OrderRequest};
use crate::types::Candle;

type HmacSha256 = Hmac<Sha256>;

/// Default recv-window sent with every signed request (milliseconds).
const RECV_WINDOW: u64 = 5000;

/// Largest page `GET /api/v3/klines` will return.
const KLINES_PAGE_LIMIT: usize = 1000;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

#[derive(Clone)]
pub struct BinanceBroker {
    secret: String,
    base_url: String,
    client: reqwest::Client,
}

impl BinanceBroker {
    /// `api_key` is sent as a header, never in query params. `secret` is
    /// used exclusively for HMAC signing.
    pub fn new(api_key: &str, secret: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        if !api_key.is_empty() {
            let val = HeaderValue::from_str(api_key).context("BINANCE_API_KEY is not a valid header value")?;
            default_headers.insert("X-MBX-APIKEY", val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "BinanceBroker initialised");

        Ok(Self {
            secret: secret.into(),
            base_url,
            client,
        })
    }

    /// Build from `BINANCE_API_KEY`, `BINANCE_API_SECRET` and the optional
    /// `BINANCE_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("BINANCE_API_KEY").unwrap_or_default();
        let secret = std::env::var("BINANCE_API_SECRET").unwrap_or_default();
        let base_url = std::env::var("BINANCE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        if api_key.is_empty() || secret.is_empty() {
            warn!("BINANCE_API_KEY / BINANCE_API_SECRET not set; signed requests will be rejected");
        }
        Self::new(&api_key, secret, base_url)
    }

    // -------------------------------------------------------------------------
    // Signing helpers
    // -------------------------------------------------------------------------

    /// HMAC-SHA256 hex signature of `query`.
    pub fn sign(&self, query: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).context("invalid HMAC key")?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Appends timestamp, recvWindow and signature to `params`.
    fn signed_query(&self, params: &str) -> Result<String> {
        let ts = Utc::now().timestamp_millis();
        let base = if params.is_empty() {
            format!("timestamp={ts}&recvWindow={RECV_WINDOW}")
        } else {
            format!("{params}&timestamp={ts}&recvWindow={RECV_WINDOW}")
        };
        let sig = self.sign(&base)?;
        Ok(format!("{base}&signature={sig}"))
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /api/v3/klines (public). One page starting at `start_ms`.
    #[instrument(skip(self), name = "binance::get_klines")]
    async fn get_klines(&self, symbol: &str, interval: &str, start_ms: i64) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&startTime={}&limit={}",
            self.base_url, symbol, interval, start_ms, KLINES_PAGE_LIMIT
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await.context("failed to parse klines response")?;

        if !status.is_success() {
            bail!("Binance GET /api/v3/klines returned {}: {}", status, body);
        }

        parse_klines(&body)
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// POST /api/v3/order (signed). MARKET order sized in quote currency.
    #[instrument(skip(self, order), fields(id = %order.id, symbol = %order.symbol, side = %order.side), name = "binance::place_order")]
    async fn place_market_order(&self, order: &OrderRequest) -> Result<serde_json::Value> {
        let params = format!(
            "symbol={}&side={}&type=MARKET&quoteOrderQty={}&newClientOrderId={}",
            order.symbol,
            order.side.as_str(),
            order.amount,
            order.id
        );
        let qs = self.signed_query(&params)?;
        let url = format!("{}/api/v3/order?{}", self.base_url, qs);

        debug!(amount = order.amount, "placing market order");

        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .context("POST /api/v3/order request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await.context("failed to parse order response")?;

        if !status.is_success() {
            bail!("Binance POST /api/v3/order returned {}: {}", status, body);
        }

        Ok(body)
    }
}

#[async_trait]
impl Broker for BinanceBroker {
    async fn fetch_candles(&self, symbol: &str, from: DateTime<Utc>, period_seconds: u32) -> Result<Vec<Candle>> {
        let interval = interval_for_period(period_seconds)?;
        let now_ms = Utc::now().timestamp_millis();
        let mut start_ms = from.timestamp_millis();
        let mut candles: Vec<Candle> = Vec::new();

        while start_ms <= now_ms {
            let page = self.get_klines(symbol, interval, start_ms).await?;
            let Some(last) = page.last() else { break };
            let next_ms = last.timestamp.timestamp_millis() + 1;
            let full_page = page.len() == KLINES_PAGE_LIMIT;

            candles.extend(page);
            if !full_page {
                break;
            }
            start_ms = next_ms;
        }

        info!(symbol, interval, count = candles.len(), from = %from.to_rfc3339(), "klines backfilled");
        Ok(candles)
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck> {
        let body = self.place_market_order(order).await?;
        let order_id = body
            .get("orderId")
            .map(|v| v.to_string())
            .unwrap_or_else(|| order.id.clone());
        let status = body
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("UNKNOWN")
            .to_string();

        info!(order_id = %order_id, status = %status, "order accepted");
        Ok(OrderAck {
            order_id,
            status,
            raw: body,
        })
    }
}

impl std::fmt::Debug for BinanceBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceBroker")
            .field("api_key", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Kline parsing
// -----------------------------------------------------------------------------

/// Parse Binance's array-of-arrays klines response.
///
/// Array indices:
///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
///   [6] closeTime, ...
fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;
    let mut candles = Vec::with_capacity(raw.len());

    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;
        if arr.len() < 5 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }
        candles.push(parse_kline_row(arr)?);
    }

    Ok(candles)
}

fn parse_kline_row(arr: &[serde_json::Value]) -> Result<Candle> {
    let open_time = arr[0].as_i64().context("kline openTime is not an integer")?;
    let timestamp = Utc
        .timestamp_millis_opt(open_time)
        .single()
        .with_context(|| format!("kline openTime {open_time} out of range"))?;

    Ok(Candle::new(
        timestamp,
        parse_str_f64(&arr[1])?,
        parse_str_f64(&arr[2])?,
        parse_str_f64(&arr[3])?,
        parse_str_f64(&arr[4])?,
    ))
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>().with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        bail!("expected string or number, got: {val}")
    }
}
