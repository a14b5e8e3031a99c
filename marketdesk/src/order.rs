/// Quick-order entry
///
/// Validates and submits a discretionary order (market or limit) against the
/// current selection. One submission in flight at a time; validation
/// failures never reach the network; outcomes surface as explicit state for
/// the form to render.
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::OrderError;
use crate::rest::{MarketApi, OrderAck, OrderRequest};
use crate::types::{Selection, Side, TickerSnapshot};

/// Order type selected on the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

/// A validated order, ready for submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderIntent {
    Market { quantity: Decimal },
    Limit { quantity: Decimal, price: Decimal },
}

impl OrderIntent {
    pub fn quantity(&self) -> Decimal {
        match self {
            OrderIntent::Market { quantity } => *quantity,
            OrderIntent::Limit { quantity, .. } => *quantity,
        }
    }

    pub fn limit_price(&self) -> Option<Decimal> {
        match self {
            OrderIntent::Market { .. } => None,
            OrderIntent::Limit { price, .. } => Some(*price),
        }
    }
}

/// Raw quick-order form inputs
#[derive(Debug, Clone, Default)]
pub struct OrderForm {
    pub quantity: String,
    pub limit_price: String,
    pub order_type: OrderType,
}

impl OrderForm {
    /// Validate the inputs into a tagged intent. Quantity must parse as a
    /// positive decimal; limit orders additionally need a positive price.
    pub fn build_intent(&self) -> Result<OrderIntent, OrderError> {
        let quantity = parse_positive(&self.quantity).ok_or_else(|| {
            OrderError::Validation("quantity must be a positive number".to_string())
        })?;
        match self.order_type {
            OrderType::Market => Ok(OrderIntent::Market { quantity }),
            OrderType::Limit => {
                let price = parse_positive(&self.limit_price).ok_or_else(|| {
                    OrderError::Validation("limit price must be a positive number".to_string())
                })?;
                Ok(OrderIntent::Limit { quantity, price })
            }
        }
    }
}

fn parse_positive(input: &str) -> Option<Decimal> {
    let value = Decimal::from_str(input.trim()).ok()?;
    (value > Decimal::ZERO).then_some(value)
}

/// Submission phase: Idle -> Submitting -> Accepted | Rejected -> Idle
/// (on the next edit, or via `reset`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrderPhase {
    #[default]
    Idle,
    Submitting,
    Accepted(String),
    Rejected(OrderError),
}

/// Controller behind the quick-order form
pub struct OrderController {
    api: MarketApi,
    form: OrderForm,
    phase: OrderPhase,
}

impl OrderController {
    pub fn new(api: MarketApi) -> Self {
        Self {
            api,
            form: OrderForm::default(),
            phase: OrderPhase::Idle,
        }
    }

    pub fn form(&self) -> &OrderForm {
        &self.form
    }

    pub fn phase(&self) -> &OrderPhase {
        &self.phase
    }

    pub fn set_quantity(&mut self, quantity: impl Into<String>) {
        self.form.quantity = quantity.into();
        self.clear_result();
    }

    pub fn set_limit_price(&mut self, price: impl Into<String>) {
        self.form.limit_price = price.into();
        self.clear_result();
    }

    /// Changing order type survives submissions; only the result display resets.
    pub fn set_order_type(&mut self, order_type: OrderType) {
        self.form.order_type = order_type;
        self.clear_result();
    }

    /// Seed an empty limit price from the latest ticker (done when the form
    /// opens; a cleared price re-seeds on next open).
    pub fn seed_limit_price(&mut self, ticker: &TickerSnapshot) {
        if self.form.limit_price.is_empty() {
            if let Some(last) = ticker.last {
                self.form.limit_price = last.to_string();
            }
        }
    }

    pub fn reset(&mut self) {
        self.phase = OrderPhase::Idle;
    }

    fn clear_result(&mut self) {
        if matches!(self.phase, OrderPhase::Accepted(_) | OrderPhase::Rejected(_)) {
            self.phase = OrderPhase::Idle;
        }
    }

    /// Validation plus the single-in-flight guard. `None` while a submit is
    /// in flight (rapid double clicks are no-ops) or when validation fails,
    /// in which case the phase moves straight to Rejected with no network
    /// call.
    pub fn begin(&mut self) -> Option<OrderIntent> {
        if self.phase == OrderPhase::Submitting {
            debug!("submit already in flight, ignoring");
            return None;
        }
        match self.form.build_intent() {
            Ok(intent) => {
                self.phase = OrderPhase::Submitting;
                Some(intent)
            }
            Err(e) => {
                self.phase = OrderPhase::Rejected(e);
                None
            }
        }
    }

    /// Record the submission outcome. Returns true when dependent
    /// collaborators (order history, positions, balances) should refresh.
    pub fn finish(&mut self, outcome: Result<OrderAck, OrderError>) -> bool {
        match outcome {
            Ok(ack) if ack.ok => {
                let message = ack
                    .message
                    .unwrap_or_else(|| "order accepted".to_string());
                info!(%message, "order accepted");
                self.phase = OrderPhase::Accepted(message);
                // Inputs clear on success; order type selection survives
                self.form.quantity.clear();
                self.form.limit_price.clear();
                true
            }
            Ok(ack) => {
                let reason = ack
                    .reason
                    .or(ack.message)
                    .unwrap_or_else(|| "order rejected".to_string());
                warn!(%reason, "order rejected by backend");
                self.phase = OrderPhase::Rejected(OrderError::Rejected(reason));
                false
            }
            Err(e) => {
                warn!("order submission failed: {}", e);
                self.phase = OrderPhase::Rejected(e);
                false
            }
        }
    }

    /// Validate and submit the current form against `selection`. Returns
    /// true when the order was accepted and collaborators should refresh.
    pub async fn submit(&mut self, selection: &Selection, side: Side) -> bool {
        let Some(intent) = self.begin() else {
            return false;
        };
        let request = OrderRequest {
            symbol: selection.symbol.clone(),
            side,
            quantity: intent.quantity(),
            price: intent.limit_price(),
            strategy_id: None,
            exchange: selection.exchange.clone(),
        };
        let outcome = self
            .api
            .submit_order(&request)
            .await
            .map_err(|e| {
                debug!("order transport failure: {}", e);
                OrderError::Connection
            });
        self.finish(outcome)
    }
}
