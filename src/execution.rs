// =============================================================================
// Execution Engine — turns actionable signal reports into orders, with full
// demo-mode simulation support
// =============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::broker::{Broker, OrderAck, OrderRequest};
use crate::signal_report::SignalReport;
use crate::types::{AccountMode, TradingMode};

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

/// Outcome of an execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionResult {
    /// Order was accepted by the broker (live account).
    Placed(OrderAck),
    /// Order was simulated locally (demo account).
    Simulated(OrderRequest),
    /// Nothing was sent: the decision was NONE or trading is paused.
    Skipped(String),
    /// The broker rejected the order or could not be reached.
    Error(String),
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed(ack) => write!(f, "Placed({} {})", ack.order_id, ack.status),
            Self::Simulated(order) => write!(f, "Simulated({} {} {})", order.symbol, order.side, order.amount),
            Self::Skipped(reason) => write!(f, "Skipped({reason})"),
            Self::Error(err) => write!(f, "Error({err})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct ExecutionEngine {
    broker: Arc<dyn Broker>,
    trade_amount: f64,
    trade_duration_secs: u32,
}

impl ExecutionEngine {
    pub fn new(broker: Arc<dyn Broker>, trade_amount: f64, trade_duration_secs: u32) -> Self {
        Self {
            broker,
            trade_amount,
            trade_duration_secs,
        }
    }

    /// Execute the decision carried by `report`.
    ///
    /// NONE and a paused bot never reach the broker. In **demo mode** the
    /// order is built and logged but not submitted. In **live mode** it is
    /// forwarded to the broker; a broker failure is returned as
    /// `ExecutionResult::Error`.
    pub async fn execute(&self, report: &SignalReport, trading_mode: TradingMode, account_mode: AccountMode) -> ExecutionResult {
        let Some(order) = OrderRequest::from_report(report, self.trade_amount, self.trade_duration_secs) else {
            info!(symbol = %report.symbol, candle = %report.timestamp.to_rfc3339(), "no actionable signal");
            return ExecutionResult::Skipped("no actionable signal".to_string());
        };

        if trading_mode == TradingMode::Paused {
            info!(
                symbol = %order.symbol,
                side = %order.side,
                label = order.side.option_label(),
                "trading paused, signal reported only"
            );
            return ExecutionResult::Skipped("trading paused".to_string());
        }

        match account_mode {
            AccountMode::Demo => self.execute_demo(order),
            AccountMode::Live => self.execute_live(order).await,
        }
    }

    // -------------------------------------------------------------------------
    // Demo execution
    // -------------------------------------------------------------------------

    fn execute_demo(&self, order: OrderRequest) -> ExecutionResult {
        info!(
            id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            label = order.side.option_label(),
            amount = order.amount,
            duration_secs = order.duration_secs,
            "demo fill"
        );
        ExecutionResult::Simulated(order)
    }

    // -------------------------------------------------------------------------
    // Live execution
    // -------------------------------------------------------------------------

    async fn execute_live(&self, order: OrderRequest) -> ExecutionResult {
        debug!(id = %order.id, symbol = %order.symbol, side = %order.side, "sending live order");

        match self.broker.submit_order(&order).await {
            Ok(ack) => {
                info!(
                    id = %order.id,
                    symbol = %order.symbol,
                    side = %order.side,
                    order_id = %ack.order_id,
                    status = %ack.status,
                    "live order placed"
                );
                ExecutionResult::Placed(ack)
            }
            Err(e) => {
                warn!(
                    id = %order.id,
                    symbol = %order.symbol,
                    side = %order.side,
                    error = %e,
                    "live order placement failed"
                );
                ExecutionResult::Error(format!("order placement failed: {e}"))
            }
        }
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("broker", &"<dyn Broker>")
            .field("trade_amount", &self.trade_amount)
            .field("trade_duration_secs", &self.trade_duration_secs)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator_engine::IndicatorPoint;
    use crate::types::{Candle, Side};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct StubBroker {
        submitted: Mutex<Vec<OrderRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl Broker for StubBroker {
        async fn fetch_candles(&self, _symbol: &str, _from: DateTime<Utc>, _period_seconds: u32) -> anyhow::Result<Vec<Candle>> {
            Ok(Vec::new())
        }

        async fn submit_order(&self, order: &OrderRequest) -> anyhow::Result<OrderAck> {
            if self.fail {
                anyhow::bail!("insufficient balance");
            }
            self.submitted.lock().push(order.clone());
            Ok(OrderAck {
                order_id: "42".into(),
                status: "FILLED".into(),
                raw: serde_json::Value::Null,
            })
        }
    }

    fn report(macd_prev: f64, signal_prev: f64, macd: f64, signal: f64) -> SignalReport {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let point = |minute: i64, m: f64, s: f64| IndicatorPoint {
            timestamp: t0 + chrono::Duration::minutes(minute),
            close: 1.08,
            trend_ma: Some(1.07),
            macd: Some(m),
            signal: Some(s),
            histogram: Some(m - s),
        };
        SignalReport::from_pair("EURUSDT", &point(0, macd_prev, signal_prev), &point(1, macd, signal))
    }

    fn long_report() -> SignalReport {
        report(-0.004, -0.003, -0.002, -0.0025)
    }

    fn engine(broker: Arc<StubBroker>) -> ExecutionEngine {
        ExecutionEngine::new(broker, 50.0, 60)
    }

    #[tokio::test]
    async fn none_is_skipped() {
        let broker = Arc::new(StubBroker::default());
        let result = engine(broker.clone())
            .execute(&report(-0.003, -0.002, -0.0025, -0.002), TradingMode::Live, AccountMode::Live)
            .await;
        assert!(matches!(result, ExecutionResult::Skipped(_)));
        assert!(broker.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn paused_never_submits() {
        let broker = Arc::new(StubBroker::default());
        let result = engine(broker.clone())
            .execute(&long_report(), TradingMode::Paused, AccountMode::Live)
            .await;
        assert!(matches!(result, ExecutionResult::Skipped(ref r) if r == "trading paused"));
        assert!(broker.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn demo_simulates_without_broker() {
        let broker = Arc::new(StubBroker::default());
        let result = engine(broker.clone())
            .execute(&long_report(), TradingMode::Live, AccountMode::Demo)
            .await;
        match result {
            ExecutionResult::Simulated(order) => {
                assert_eq!(order.side, Side::Buy);
                assert_eq!(order.duration_secs, 60);
            }
            other => panic!("expected simulated fill, got {other}"),
        }
        assert!(broker.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn live_submits_to_broker() {
        let broker = Arc::new(StubBroker::default());
        let result = engine(broker.clone())
            .execute(&report(0.004, 0.003, 0.002, 0.0025), TradingMode::Live, AccountMode::Live)
            .await;
        assert!(matches!(result, ExecutionResult::Placed(ref ack) if ack.order_id == "42"));
        let submitted = broker.submitted.lock();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].side, Side::Sell);
        assert!((submitted[0].amount - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn broker_failure_is_reported_not_raised() {
        let broker = Arc::new(StubBroker {
            fail: true,
            ..StubBroker::default()
        });
        let result = engine(broker).execute(&long_report(), TradingMode::Live, AccountMode::Live).await;
        match result {
            ExecutionResult::Error(msg) => assert!(msg.contains("insufficient balance")),
            other => panic!("expected error, got {other}"),
        }
    }
}
