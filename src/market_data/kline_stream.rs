// ---------------------------------------------------------------------------
// Kline WebSocket stream
// ---------------------------------------------------------------------------

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tracing::{debug, error, info, warn};

use super::candle_buffer::{CandleBuffer, CandleKey};
use crate::types::Candle;

pub const DEFAULT_STREAM_URL: &str = "wss://stream.binance.com:9443/ws";

/// Emitted once for every candle that closes on the stream.
#[derive(Debug, Clone)]
pub struct CandleClosed {
    pub key: CandleKey,
    pub open_time: DateTime<Utc>,
}

/// One decoded kline update.
#[derive(Debug, Clone)]
pub struct KlineUpdate {
    pub key: CandleKey,
    pub candle: Candle,
    pub is_closed: bool,
}

/// Helper: Binance sends numeric values as JSON strings inside kline objects.
fn parse_string_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}")),
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64")),
        _ => bail!("field {name} has unexpected JSON type"),
    }
}

/// Parse a kline message, accepting both the combined-stream envelope and
/// the direct single-stream payload.
///
/// ```json
/// { "e": "kline", "s": "EURUSDT", "k": { "t": ..., "i": "1m", "o": "...", "x": false } }
/// ```
pub fn parse_kline_message(text: &str) -> Result<KlineUpdate> {
    let root: serde_json::Value = serde_json::from_str(text).context("failed to parse kline JSON")?;

    let data = if root.get("data").is_some() { &root["data"] } else { &root };

    let symbol = data["s"].as_str().context("missing field s")?.to_uppercase();

    let k = &data["k"];

    let interval = k["i"].as_str().context("missing field k.i")?.to_string();
    let open_time = k["t"].as_i64().context("missing field k.t")?;
    let timestamp = Utc
        .timestamp_millis_opt(open_time)
        .single()
        .with_context(|| format!("k.t {open_time} out of range"))?;

    let candle = Candle::new(
        timestamp,
        parse_string_f64(&k["o"], "k.o")?,
        parse_string_f64(&k["h"], "k.h")?,
        parse_string_f64(&k["l"], "k.l")?,
        parse_string_f64(&k["c"], "k.c")?,
    );
    let is_closed = k["x"].as_bool().context("missing field k.x")?;

    Ok(KlineUpdate {
        key: CandleKey { symbol, interval },
        candle,
        is_closed,
    })
}

/// Connect to the kline WebSocket stream for a single (symbol, interval)
/// pair, feed candles into `buffer` and announce every close on `closed_tx`.
///
/// Runs until the stream disconnects or an error occurs, then returns so that
/// the caller can handle reconnection.
pub async fn run_kline_stream(
    base_url: &str,
    symbol: &str,
    interval: &str,
    buffer: &Arc<CandleBuffer>,
    closed_tx: &mpsc::Sender<CandleClosed>,
) -> Result<()> {
    let lower = symbol.to_lowercase();
    let url = format!("{}/{lower}@kline_{interval}", base_url.trim_end_matches('/'));
    info!(url = %url, symbol = %symbol, interval = %interval, "connecting to kline WebSocket");

    let (ws_stream, _response) = connect_async(&url)
        .await
        .context("failed to connect to kline WebSocket")?;

    info!(symbol = %symbol, interval = %interval, "kline WebSocket connected");
    let (_write, mut read) = ws_stream.split();

    loop {
        match read.next().await {
            Some(Ok(msg)) => {
                if let tokio_tungstenite::tungstenite::Message::Text(text) = msg {
                    match parse_kline_message(&text) {
                        Ok(update) => {
                            debug!(
                                key = %update.key,
                                close = update.candle.close,
                                closed = update.is_closed,
                                "candle update"
                            );
                            let open_time = update.candle.timestamp;
                            let key = update.key.clone();
                            if buffer.update(update.key, update.candle, update.is_closed)
                                && closed_tx.send(CandleClosed { key, open_time }).await.is_err()
                            {
                                info!(symbol = %symbol, "close receiver dropped, stopping kline stream");
                                return Ok(());
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to parse kline message");
                        }
                    }
                }
                // Ping / Pong / Binary / Close frames are ignored; tungstenite
                // answers pings itself.
            }
            Some(Err(e)) => {
                error!(error = %e, "kline WebSocket read error");
                return Err(e.into());
            }
            None => {
                warn!(symbol = %symbol, interval = %interval, "kline WebSocket stream ended");
                return Ok(());
            }
        }
    }
}
