//! Per-trade risk sizing and advisory feedback.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::TradeType;

use super::{FeedbackProvider, OfflineAdvisor};

/// Returned when there is not enough input to size the risk.
pub const MISSING_INPUTS_FEEDBACK: &str =
    "Add your account balance and stop-loss to receive risk management feedback.";

/// Returned when the advisor answers with nothing.
pub const EMPTY_ADVICE_FEEDBACK: &str =
    "Consider keeping risk below 2% of your account balance for better risk management.";

/// Risk above this share of the account is flagged as high.
const HIGH_RISK_PCT: f64 = 3.0;

/// Risk at or below this share of the account is considered conservative.
const CONSERVATIVE_RISK_PCT: f64 = 1.0;

/// Computes risk percentages and produces feedback text for trade entry.
#[derive(Clone)]
pub struct RiskAssessor {
    advisor: Arc<dyn FeedbackProvider>,
}

impl RiskAssessor {
    /// Create an assessor backed by the given advisor.
    pub fn new(advisor: Arc<dyn FeedbackProvider>) -> Self {
        Self { advisor }
    }

    /// Assessor that always answers with the rule-based fallback.
    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineAdvisor))
    }

    pub fn advisor_name(&self) -> &'static str {
        self.advisor.name()
    }

    /// Potential loss to the stop as a percentage of account balance.
    ///
    /// Returns `None` without a non-zero stop loss or a positive account
    /// balance, or when the position is too large to size. Leverage, fees
    /// and slippage are not considered.
    pub fn risk_percentage(
        price: Decimal,
        quantity: Decimal,
        stop_loss: Option<Decimal>,
        account_balance: Option<Decimal>,
    ) -> Option<f64> {
        if !Self::has_risk_inputs(stop_loss, account_balance) {
            return None;
        }
        let stop_loss = stop_loss?;
        let balance = account_balance?;

        let potential_loss = price.checked_sub(stop_loss)?.abs().checked_mul(quantity)?;
        let pct = potential_loss.checked_div(balance)?.to_f64()? * 100.0;
        Some(pct)
    }

    /// Whether the inputs needed to size risk are present. A zero stop loss
    /// counts as no stop.
    pub fn has_risk_inputs(stop_loss: Option<Decimal>, account_balance: Option<Decimal>) -> bool {
        stop_loss.is_some_and(|s| !s.is_zero())
            && account_balance.is_some_and(|b| b > Decimal::ZERO)
    }

    /// Produce one or two sentences of risk feedback for a trade.
    ///
    /// Asks the advisor once; any failure falls through to
    /// [`RiskAssessor::fallback_feedback`], so this never errors.
    pub async fn generate_feedback(
        &self,
        symbol: &str,
        risk_percentage: Option<f64>,
        trade_type: TradeType,
        strategy: Option<&str>,
    ) -> String {
        let Some(risk) = risk_percentage else {
            return MISSING_INPUTS_FEEDBACK.to_string();
        };

        let prompt = Self::build_prompt(symbol, risk, trade_type, strategy);
        debug!(advisor = self.advisor.name(), symbol = %symbol, "Requesting risk feedback");

        match self.advisor.advise(&prompt).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    EMPTY_ADVICE_FEEDBACK.to_string()
                } else {
                    text.to_string()
                }
            }
            Err(e) => {
                warn!(advisor = self.advisor.name(), error = %e, "Risk feedback unavailable, using fallback");
                Self::fallback_feedback(risk)
            }
        }
    }

    /// Deterministic feedback keyed on the risk level.
    pub fn fallback_feedback(risk_percentage: f64) -> String {
        if risk_percentage > HIGH_RISK_PCT {
            format!(
                "Your risk of {:.2}% is relatively high. Consider reducing to 1-2% of your account balance for better risk management.",
                risk_percentage
            )
        } else if risk_percentage > CONSERVATIVE_RISK_PCT {
            format!(
                "Your risk of {:.2}% is within reasonable limits for most trading strategies.",
                risk_percentage
            )
        } else {
            format!(
                "Your risk of {:.2}% is conservative, which is good for capital preservation.",
                risk_percentage
            )
        }
    }

    fn build_prompt(
        symbol: &str,
        risk_percentage: f64,
        trade_type: TradeType,
        strategy: Option<&str>,
    ) -> String {
        format!(
            "As a trading risk management advisor, provide brief feedback (1-2 sentences) on this trade:\n\
             - Symbol: {}\n\
             - Trade type: {}\n\
             - Strategy: {}\n\
             - Risk percentage: {:.2}% of account balance\n\n\
             Focus on whether the risk percentage is appropriate, and suggest any improvements.",
            symbol,
            trade_type,
            strategy.filter(|s| !s.is_empty()).unwrap_or("Not specified"),
            risk_percentage
        )
    }
}

impl Default for RiskAssessor {
    fn default() -> Self {
        Self::offline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::AdvisorError;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// Advisor that replays a canned answer and records prompts.
    struct StubAdvisor {
        answer: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl StubAdvisor {
        fn new(answer: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.map(str::to_string).map_err(str::to_string),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl FeedbackProvider for StubAdvisor {
        async fn advise(&self, prompt: &str) -> Result<String, AdvisorError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer.clone().map_err(AdvisorError::Api)
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    #[test]
    fn test_risk_percentage_example_conservative() {
        let risk = RiskAssessor::risk_percentage(dec!(100), dec!(10), Some(dec!(95)), Some(dec!(10000)));
        assert!((risk.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_risk_percentage_example_high() {
        let risk = RiskAssessor::risk_percentage(dec!(50), dec!(20), Some(dec!(40)), Some(dec!(2000)));
        assert!((risk.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_risk_percentage_stop_above_entry() {
        // Short with a stop above entry still risks the distance
        let risk = RiskAssessor::risk_percentage(dec!(50), dec!(10), Some(dec!(55)), Some(dec!(1000)));
        assert!((risk.unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_risk_percentage_undefined_inputs() {
        let p = dec!(100);
        let q = dec!(10);
        assert_eq!(RiskAssessor::risk_percentage(p, q, None, Some(dec!(1000))), None);
        assert_eq!(RiskAssessor::risk_percentage(p, q, Some(dec!(95)), None), None);
        assert_eq!(RiskAssessor::risk_percentage(p, q, Some(dec!(95)), Some(dec!(0))), None);
        assert_eq!(RiskAssessor::risk_percentage(p, q, Some(dec!(95)), Some(dec!(-500))), None);
    }

    #[test]
    fn test_zero_stop_loss_is_no_stop() {
        assert_eq!(
            RiskAssessor::risk_percentage(dec!(100), dec!(10), Some(dec!(0)), Some(dec!(1000))),
            None
        );
        assert!(!RiskAssessor::has_risk_inputs(Some(Decimal::ZERO), Some(dec!(1000))));
        assert!(RiskAssessor::has_risk_inputs(Some(dec!(95)), Some(dec!(1000))));
    }

    #[test]
    fn test_risk_percentage_oversized_position() {
        let risk = RiskAssessor::risk_percentage(dec!(1e16), dec!(1e14), Some(dec!(1)), Some(dec!(1000)));
        assert_eq!(risk, None);

        // Fits, but the ratio to a tiny balance does not
        let risk = RiskAssessor::risk_percentage(
            dec!(2),
            dec!(1e27),
            Some(dec!(1)),
            Some(dec!(0.0000000000001)),
        );
        assert_eq!(risk, None);
    }

    #[test]
    fn test_fallback_thresholds() {
        assert!(RiskAssessor::fallback_feedback(10.0).contains("relatively high"));
        assert!(RiskAssessor::fallback_feedback(3.01).contains("relatively high"));
        assert!(RiskAssessor::fallback_feedback(3.0).contains("within reasonable limits"));
        assert!(RiskAssessor::fallback_feedback(1.5).contains("within reasonable limits"));
        assert!(RiskAssessor::fallback_feedback(1.0).contains("conservative"));
        assert!(RiskAssessor::fallback_feedback(0.5).contains("conservative"));
    }

    #[test]
    fn test_fallback_formats_two_decimals() {
        assert_eq!(
            RiskAssessor::fallback_feedback(0.5),
            "Your risk of 0.50% is conservative, which is good for capital preservation."
        );
        assert!(RiskAssessor::fallback_feedback(10.0).starts_with("Your risk of 10.00% is relatively high."));
    }

    #[tokio::test]
    async fn test_feedback_without_risk_is_instructional() {
        let stub = StubAdvisor::new(Ok("should not be used"));
        let assessor = RiskAssessor::new(stub.clone());

        let text = assessor
            .generate_feedback("AAPL", None, TradeType::SellShort, Some("Scalp"))
            .await;

        assert_eq!(text, MISSING_INPUTS_FEEDBACK);
        assert!(stub.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_offline_uses_fallback() {
        let assessor = RiskAssessor::offline();

        let text = assessor.generate_feedback("AAPL", Some(0.5), TradeType::Buy, None).await;
        assert!(text.contains("conservative"));

        let text = assessor.generate_feedback("AAPL", Some(10.0), TradeType::Buy, None).await;
        assert!(text.contains("relatively high"));
    }

    #[tokio::test]
    async fn test_feedback_advisor_failure_uses_fallback() {
        let assessor = RiskAssessor::new(StubAdvisor::new(Err("500 Internal Server Error")));

        let text = assessor.generate_feedback("TSLA", Some(2.0), TradeType::Buy, None).await;
        assert!(text.contains("within reasonable limits"));
    }

    #[tokio::test]
    async fn test_feedback_uses_advisor_text_and_prompt() {
        let stub = StubAdvisor::new(Ok("  Solid sizing for a swing trade.  "));
        let assessor = RiskAssessor::new(stub.clone());

        let text = assessor.generate_feedback("NVDA", Some(1.23456), TradeType::BuyToCover, None).await;
        assert_eq!(text, "Solid sizing for a swing trade.");

        let prompts = stub.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("- Symbol: NVDA"));
        assert!(prompts[0].contains("- Trade type: buy_to_cover"));
        assert!(prompts[0].contains("- Strategy: Not specified"));
        assert!(prompts[0].contains("- Risk percentage: 1.23% of account balance"));
    }

    #[tokio::test]
    async fn test_feedback_empty_advice() {
        let assessor = RiskAssessor::new(StubAdvisor::new(Ok("   ")));

        let text = assessor.generate_feedback("NVDA", Some(5.0), TradeType::Buy, Some("Breakout")).await;
        assert_eq!(text, EMPTY_ADVICE_FEEDBACK);
    }
}
