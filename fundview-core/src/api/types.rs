//! Wire types for the dashboard backend.
//!
//! Shapes are inferred from what the screens consume; unknown fields are kept
//! where a screen may render them (stock rows) and ignored elsewhere.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A free-form row object (imports, market index rows).
pub type Row = serde_json::Map<String, serde_json::Value>;

/// One row of `/api/stock-data` and its variants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StockRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_loss_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Which stock-data endpoint to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockDataKind {
    Plain,
    WithBeta,
    Asset { market_code: Option<String> },
}

impl StockDataKind {
    pub fn path(&self) -> &'static str {
        match self {
            StockDataKind::Plain => "/stock-data",
            StockDataKind::WithBeta => "/stock-data-with-beta",
            StockDataKind::Asset { .. } => "/stock-data-asset",
        }
    }
}

/// Body of `POST /api/calculate-beta`. An empty body asks for every stock.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BetaRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_predict: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaResult {
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub interpretation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BetaResult {
    /// Label for tables: ticker, else stock code, else market code.
    pub fn label(&self) -> &str {
        self.ticker
            .as_deref()
            .or(self.stock_code.as_deref())
            .or(self.market_code.as_deref())
            .unwrap_or("?")
    }
}

/// The beta endpoint answers with one object or an array of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum BetaResponse {
    Many(Vec<BetaResult>),
    One(BetaResult),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioBetaRequest {
    pub portfolio: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_predict: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentBeta {
    pub stock_code: String,
    #[serde(default)]
    pub beta: Option<f64>,
    pub weight: f64,
    #[serde(default)]
    pub weighted_beta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioBeta {
    pub portfolio_beta: f64,
    #[serde(default)]
    pub interpretation: String,
    #[serde(default)]
    pub component_betas: Vec<ComponentBeta>,
}

/// Body of `POST /api/svm-analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmRequest {
    pub days_to_predict: u32,
    pub use_beta: bool,
    pub market_code: String,
    pub ticker: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    #[serde(default)]
    pub confusion_matrix: Vec<Vec<f64>>,
    #[serde(default)]
    pub report: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub stock_code: String,
    pub signal: String,
    #[serde(default)]
    pub prediction_label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub beta_interpretation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_trend: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmAnalysis {
    pub model_metrics: ModelMetrics,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

/// Optional filters for `GET /api/latest-svm-analysis`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisFilter {
    pub market_code: Option<String>,
    pub ticker: Option<String>,
}

impl AnalysisFilter {
    /// Query pairs for the non-empty filters only.
    pub fn query(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if let Some(m) = self.market_code.as_deref().filter(|m| !m.is_empty()) {
            pairs.push(("market_code", m));
        }
        if let Some(t) = self.ticker.as_deref().filter(|t| !t.is_empty()) {
            pairs.push(("ticker", t));
        }
        pairs
    }
}

/// Last stored analysis, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestAnalysis {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub days_to_predict: Option<u32>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub use_beta: Option<bool>,
    #[serde(default)]
    pub market_code: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
}

impl LatestAnalysis {
    /// The record a finished run leaves behind, dated `date`.
    pub fn from_run(req: &SvmRequest, analysis: &SvmAnalysis, date: String) -> Self {
        Self {
            date: Some(date),
            days_to_predict: Some(req.days_to_predict),
            accuracy: Some(analysis.model_metrics.accuracy),
            predictions: analysis.predictions.clone(),
            use_beta: Some(req.use_beta),
            market_code: Some(req.market_code.clone()).filter(|m| !m.is_empty()),
            ticker: Some(req.ticker.clone()).filter(|t| !t.is_empty()),
        }
    }
}

/// Which department's server answers the selection and analysis endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    #[default]
    Fund,
    Research,
}

impl Department {
    pub fn label(self) -> &'static str {
        match self {
            Department::Fund => "fund",
            Department::Research => "research",
        }
    }
}

/// Where an import is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportTarget {
    Fund,
    Research,
    ResearchMarketIndex,
}

impl ImportTarget {
    pub fn path(self) -> &'static str {
        match self {
            ImportTarget::Fund => "/import-data",
            ImportTarget::Research => "/research-import-data",
            ImportTarget::ResearchMarketIndex => "/research-import-market-index",
        }
    }

    pub fn department(self) -> Department {
        match self {
            ImportTarget::Fund => Department::Fund,
            ImportTarget::Research | ImportTarget::ResearchMarketIndex => Department::Research,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImportTarget::Fund => "fund data",
            ImportTarget::Research => "research data",
            ImportTarget::ResearchMarketIndex => "research market index",
        }
    }
}

/// Body of the import endpoints.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ImportBody<'a> {
    pub data: &'a [Row],
}

/// `{ message }` acknowledgement of an import or recalculation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionReceipt {
    #[serde(default)]
    pub message: Option<String>,
}

/// Row objects from an import file: a JSON array, or `{"data": [...]}`.
pub fn parse_rows(json: &str) -> Result<Vec<Row>, crate::error::FetchError> {
    use crate::error::FetchError;
    use serde_json::Value;

    let value: Value =
        serde_json::from_str(json).map_err(|e| FetchError::validation(format!("not JSON: {e}")))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(FetchError::validation(
                    "expected an array of rows or an object with a \"data\" array",
                ))
            }
        },
        _ => return Err(FetchError::validation("expected an array of rows")),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(FetchError::validation(format!("row {i} is not an object: {other}"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rows_accepts_array_or_data_wrapper() {
        let bare = parse_rows(r#"[{"Ticker": "FPT"}, {"Ticker": "VNM"}]"#).unwrap();
        assert_eq!(bare.len(), 2);
        let wrapped = parse_rows(r#"{"data": [{"Ticker": "FPT"}]}"#).unwrap();
        assert_eq!(wrapped[0].get("Ticker").and_then(|v| v.as_str()), Some("FPT"));
        assert!(parse_rows("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_rows_rejects_other_shapes() {
        for bad in ["[1, 2]", r#"{"rows": []}"#, "\"text\"", "not json"] {
            let err = parse_rows(bad).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Validation, "{bad}");
        }
    }

    #[test]
    fn stock_row_reads_pascal_case_and_keeps_extras() {
        let json = r#"{
            "MarketCode": "HOSE", "Ticker": "FPT", "OpenPrice": 10.5,
            "CurrentPrice": 11.0, "ProfitLossPercent": 4.76, "Industry": "Tech"
        }"#;
        let row: StockRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.market_code.as_deref(), Some("HOSE"));
        assert_eq!(row.ticker.as_deref(), Some("FPT"));
        assert_eq!(row.current_price, Some(11.0));
        assert_eq!(row.close_price, None);
        assert_eq!(row.extra.get("Industry").and_then(|v| v.as_str()), Some("Tech"));
    }

    #[test]
    fn beta_response_accepts_object_or_array() {
        let one: BetaResponse =
            serde_json::from_str(r#"{"beta": 1.2, "interpretation": "aggressive", "ticker": "FPT"}"#)
                .unwrap();
        assert!(matches!(one, BetaResponse::One(ref r) if r.beta == Some(1.2)));

        let many: BetaResponse =
            serde_json::from_str(r#"[{"beta": 0.4, "stock_code": "HNX"}, {"beta": null}]"#).unwrap();
        match many {
            BetaResponse::Many(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[0].label(), "HNX");
                assert_eq!(v[1].beta, None);
            }
            BetaResponse::One(_) => panic!("expected array"),
        }
    }

    #[test]
    fn empty_beta_request_serializes_to_empty_object() {
        let body = serde_json::to_string(&BetaRequest::default()).unwrap();
        assert_eq!(body, "{}");
    }

    #[test]
    fn svm_analysis_requires_model_metrics() {
        let ok: Result<SvmAnalysis, _> = serde_json::from_str(
            r#"{"model_metrics": {"accuracy": 0.91}, "predictions": [
                {"stock_code": "FPT", "signal": "strong_buy", "confidence": 0.82}
            ]}"#,
        );
        let analysis = ok.unwrap();
        assert_eq!(analysis.predictions.len(), 1);
        assert!(analysis.model_metrics.confusion_matrix.is_empty());

        let missing: Result<SvmAnalysis, _> = serde_json::from_str(r#"{"predictions": []}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn analysis_filter_skips_empty_values() {
        let filter = AnalysisFilter {
            market_code: Some("HOSE".into()),
            ticker: Some(String::new()),
        };
        assert_eq!(filter.query(), vec![("market_code", "HOSE")]);
        assert!(AnalysisFilter::default().query().is_empty());
    }
}
