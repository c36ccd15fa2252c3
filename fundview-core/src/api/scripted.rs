//! Scripted in-memory backend.
//!
//! Serves deterministic demo data for `--demo` runs and for tests. Any endpoint
//! can be scripted to answer with a raw `(status, body)` pair, which goes through
//! the same status/shape classification as the HTTP backend, or with a ready-made
//! `FetchError` for transport failures. Every call is recorded so tests can
//! assert on request bodies and on "no request was made".

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::backend::{unique_tickers, Backend};
use super::http::{check_status, decode};
use super::types::{
    ActionReceipt, AnalysisFilter, BetaRequest, BetaResult, ComponentBeta, Department,
    ImportTarget,
    LatestAnalysis, ModelMetrics, PortfolioBeta, PortfolioBetaRequest, Prediction, Row,
    StockDataKind, StockRow, SvmAnalysis, SvmRequest,
};
use crate::error::FetchError;
use crate::view::BetaBand;

/// A request seen by the scripted backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub path: String,
    pub body: Value,
}

#[derive(Debug, Clone)]
enum Scripted {
    Raw { status: u16, body: String },
    Error(FetchError),
}

pub struct ScriptedBackend {
    markets: BTreeMap<String, Vec<String>>,
    scripted: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
    last_analysis: Mutex<HashMap<Department, LatestAnalysis>>,
}

/// Prefix of the research selection and analysis endpoints.
pub const RESEARCH_ANALYSIS_PREFIX: &str = "/data-analysis";

fn analysis_path(dept: Department, path: &str) -> String {
    match dept {
        Department::Fund => path.to_string(),
        Department::Research => format!("{RESEARCH_ANALYSIS_PREFIX}{path}"),
    }
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedBackend {
    /// Backend serving the given market → tickers table.
    pub fn new(markets: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            markets,
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            last_analysis: Mutex::new(HashMap::new()),
        }
    }

    /// The demo market table.
    pub fn demo() -> Self {
        let mut markets = BTreeMap::new();
        markets.insert(
            "HOSE".to_string(),
            vec!["VNM".into(), "FPT".into(), "VCB".into(), "HPG".into()],
        );
        markets.insert(
            "HNX".to_string(),
            vec!["SHS".into(), "PVS".into(), "CEO".into()],
        );
        markets.insert("UPCOM".to_string(), vec!["ACV".into(), "BSR".into()]);
        Self::new(markets)
    }

    /// Answer `path` with a raw status and body until cleared.
    pub fn respond(&self, path: &str, status: u16, body: &str) {
        locked(&self.scripted).insert(
            path.to_string(),
            Scripted::Raw {
                status,
                body: body.to_string(),
            },
        );
    }

    /// Fail `path` with `err` until cleared.
    pub fn fail(&self, path: &str, err: FetchError) {
        locked(&self.scripted).insert(path.to_string(), Scripted::Error(err));
    }

    pub fn clear(&self, path: &str) {
        locked(&self.scripted).remove(path);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        locked(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        locked(&self.calls).len()
    }

    fn record(&self, path: &str, body: Value) -> Option<Scripted> {
        locked(&self.calls).push(RecordedCall {
            path: path.to_string(),
            body,
        });
        locked(&self.scripted).get(path).cloned()
    }

    /// Resolve a call: scripted answer if any, otherwise the demo answer.
    fn reply<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        demo: impl FnOnce() -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        match self.record(path, body) {
            Some(Scripted::Error(e)) => Err(e),
            Some(Scripted::Raw { status, body }) => {
                check_status(status, &body)?;
                decode(path, &body)
            }
            None => demo(),
        }
    }

    fn all_tickers(&self) -> Vec<String> {
        unique_tickers(&self.rows(None))
    }

    fn market_of(&self, ticker: &str) -> Option<&str> {
        self.markets
            .iter()
            .find(|(_, tickers)| tickers.iter().any(|t| t == ticker))
            .map(|(m, _)| m.as_str())
    }

    fn rows(&self, market: Option<&str>) -> Vec<StockRow> {
        self.markets
            .iter()
            .filter(|(m, _)| market.map_or(true, |want| want == m.as_str()))
            .flat_map(|(m, tickers)| tickers.iter().map(move |t| demo_row(m, t)))
            .collect()
    }

    fn beta_result(&self, ticker: &str) -> Result<BetaResult, FetchError> {
        let market = self.market_of(ticker).ok_or_else(|| FetchError::ServerError {
            status: 404,
            message: format!("No data for ticker {ticker}"),
        })?;
        let beta = demo_beta(ticker);
        Ok(BetaResult {
            beta: Some(beta),
            interpretation: Some(BetaBand::classify(Some(beta)).description().to_string()),
            stock_code: None,
            market_code: Some(market.to_string()),
            ticker: Some(ticker.to_string()),
            error: None,
        })
    }
}

impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn market_codes(&self, dept: Department) -> Result<Vec<String>, FetchError> {
        self.reply(&analysis_path(dept, "/market-code"), Value::Null, || {
            Ok(self.markets.keys().cloned().collect())
        })
    }

    fn tickers(&self, dept: Department, market_code: Option<&str>) -> Result<Vec<String>, FetchError> {
        let path = analysis_path(dept, "/ticker");
        match (market_code, dept) {
            (Some(code), _) => self.reply(&path, json!({ "market_code": code }), || {
                Ok(self.markets.get(code).cloned().unwrap_or_default())
            }),
            (None, Department::Research) => self.reply(&path, Value::Null, || Ok(self.all_tickers())),
            (None, Department::Fund) => self.reply(StockDataKind::Plain.path(), Value::Null, || {
                Ok(self.all_tickers())
            }),
        }
    }

    fn stock_data(&self, kind: &StockDataKind) -> Result<Vec<StockRow>, FetchError> {
        let market = match kind {
            StockDataKind::Asset { market_code } => market_code.clone().filter(|m| !m.is_empty()),
            _ => None,
        };
        let with_beta = matches!(kind, StockDataKind::WithBeta);
        self.reply(kind.path(), json!({ "market_code": market }), || {
            let mut rows = self.rows(market.as_deref());
            if with_beta {
                for row in &mut rows {
                    row.beta = row.ticker.as_deref().map(demo_beta);
                }
            }
            Ok(rows)
        })
    }

    fn calculate_beta(&self, req: &BetaRequest) -> Result<Vec<BetaResult>, FetchError> {
        let body = serde_json::to_value(req).unwrap_or(Value::Null);
        self.reply("/calculate-beta", body, || {
            match req.ticker.as_deref().or(req.stock_code.as_deref()) {
                Some(t) => Ok(vec![self.beta_result(t)?]),
                None => self
                    .all_tickers()
                    .iter()
                    .map(|t| self.beta_result(t))
                    .collect(),
            }
        })
    }

    fn portfolio_beta(&self, req: &PortfolioBetaRequest) -> Result<PortfolioBeta, FetchError> {
        let body = serde_json::to_value(req).unwrap_or(Value::Null);
        self.reply("/calculate-portfolio-beta", body, || {
            let total: f64 = req.portfolio.values().sum();
            if req.portfolio.is_empty() || total <= 0.0 {
                return Err(FetchError::ServerError {
                    status: 400,
                    message: "Portfolio is empty".into(),
                });
            }
            let component_betas: Vec<ComponentBeta> = req
                .portfolio
                .iter()
                .map(|(code, &weight)| {
                    let beta = self.market_of(code).map(|_| demo_beta(code));
                    ComponentBeta {
                        stock_code: code.clone(),
                        beta,
                        weight,
                        weighted_beta: beta.map(|b| b * weight / total),
                    }
                })
                .collect();
            let portfolio_beta = component_betas.iter().filter_map(|c| c.weighted_beta).sum();
            Ok(PortfolioBeta {
                portfolio_beta,
                interpretation: BetaBand::classify(Some(portfolio_beta))
                    .description()
                    .to_string(),
                component_betas,
            })
        })
    }

    fn svm_analysis(&self, dept: Department, req: &SvmRequest) -> Result<SvmAnalysis, FetchError> {
        let body = serde_json::to_value(req).unwrap_or(Value::Null);
        let result = self.reply(&analysis_path(dept, "/svm-analysis"), body, || {
            let tickers: Vec<String> = if req.ticker.is_empty() {
                self.rows(Some(req.market_code.as_str()).filter(|m| !m.is_empty()))
                    .into_iter()
                    .filter_map(|r| r.ticker)
                    .collect()
            } else {
                vec![req.ticker.clone()]
            };
            if tickers.iter().any(|t| self.market_of(t).is_none()) || tickers.is_empty() {
                return Err(FetchError::ServerError {
                    status: 404,
                    message: "No data found for the selected stocks".into(),
                });
            }
            Ok(demo_analysis(&tickers, req))
        })?;

        let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let latest = LatestAnalysis::from_run(req, &result, date);
        locked(&self.last_analysis).insert(dept, latest);
        Ok(result)
    }

    fn latest_analysis(
        &self,
        dept: Department,
        filter: &AnalysisFilter,
    ) -> Result<Option<LatestAnalysis>, FetchError> {
        let path = analysis_path(dept, "/latest-svm-analysis");
        let body = json!({ "market_code": filter.market_code, "ticker": filter.ticker });
        match self.record(&path, body) {
            Some(Scripted::Error(e)) => Err(e),
            Some(Scripted::Raw { status: 404, .. }) => Ok(None),
            Some(Scripted::Raw { status, body }) => {
                check_status(status, &body)?;
                decode(&path, &body).map(Some)
            }
            None => {
                let stored = locked(&self.last_analysis).get(&dept).cloned();
                Ok(stored.filter(|a| {
                    let wants = |want: &Option<String>, have: &Option<String>| match want {
                        Some(w) if !w.is_empty() => have.as_deref() == Some(w.as_str()),
                        _ => true,
                    };
                    wants(&filter.market_code, &a.market_code) && wants(&filter.ticker, &a.ticker)
                }))
            }
        }
    }

    fn market_index(&self) -> Result<Vec<Row>, FetchError> {
        self.reply("/market-index-data", Value::Null, || {
            let rows = ["2024-06-03", "2024-06-04", "2024-06-05", "2024-06-06"]
                .iter()
                .enumerate()
                .map(|(i, date)| {
                    let close = 1250.0 + 4.5 * i as f64 - if i % 2 == 0 { 0.0 } else { 7.0 };
                    let mut row = Row::new();
                    row.insert("Date".into(), json!(date));
                    row.insert("IndexCode".into(), json!("VNINDEX"));
                    row.insert("Close".into(), json!(close));
                    row
                })
                .collect();
            Ok(rows)
        })
    }

    fn import_rows(&self, target: ImportTarget, rows: &[Row]) -> Result<ActionReceipt, FetchError> {
        self.reply(target.path(), json!({ "data": rows }), || {
            Ok(ActionReceipt {
                message: Some(format!("Imported {} rows into {}", rows.len(), target.label())),
            })
        })
    }

    fn recalculate(&self) -> Result<ActionReceipt, FetchError> {
        self.reply("/calculate", json!({}), || {
            Ok(ActionReceipt {
                message: Some("Recalculated betas and retrained model".into()),
            })
        })
    }

    fn research_analyze(&self) -> Result<ActionReceipt, FetchError> {
        self.reply("/research-analyze", json!({}), || {
            Ok(ActionReceipt {
                message: Some("Research analysis complete".into()),
            })
        })
    }
}

/// Stable per-ticker seed so demo numbers never change between runs.
fn seed(ticker: &str) -> u32 {
    ticker
        .bytes()
        .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
}

fn demo_beta(ticker: &str) -> f64 {
    0.3 + (seed(ticker) % 19) as f64 / 10.0
}

fn demo_row(market: &str, ticker: &str) -> StockRow {
    let s = seed(ticker);
    let open = 10.0 + (s % 900) as f64 / 10.0;
    let change_pct = ((s % 13) as f64 - 6.0) / 2.0;
    let current = (open * (1.0 + change_pct / 100.0) * 100.0).round() / 100.0;
    StockRow {
        market_code: Some(market.to_string()),
        ticker: Some(ticker.to_string()),
        open_price: Some(open),
        current_price: Some(current),
        close_price: Some(current),
        total_volume: Some(((s % 50) as f64 + 1.0) * 10_000.0),
        profit_loss: Some(((current - open) * 100.0).round() / 100.0),
        profit_loss_percent: Some(change_pct),
        weight: Some(1.0),
        ..StockRow::default()
    }
}

const SIGNALS: [(&str, &str); 5] = [
    ("strong_buy", "Strong Buy"),
    ("buy", "Buy"),
    ("hold", "Hold"),
    ("sell", "Sell"),
    ("strong_sell", "Strong Sell"),
];

fn demo_analysis(tickers: &[String], req: &SvmRequest) -> SvmAnalysis {
    let predictions = tickers
        .iter()
        .map(|t| {
            let s = seed(t).wrapping_add(req.days_to_predict);
            let (signal, label) = SIGNALS[(s % SIGNALS.len() as u32) as usize];
            let beta = req.use_beta.then(|| demo_beta(t));
            Prediction {
                stock_code: t.clone(),
                signal: signal.to_string(),
                prediction_label: Some(label.to_string()),
                confidence: Some(0.35 + (s % 60) as f64 / 100.0),
                beta,
                beta_interpretation: beta
                    .map(|b| BetaBand::classify(Some(b)).description().to_string()),
                price_trend: None,
            }
        })
        .collect();

    SvmAnalysis {
        model_metrics: ModelMetrics {
            accuracy: if req.use_beta { 0.74 } else { 0.68 },
            confusion_matrix: vec![vec![12.0, 3.0, 1.0], vec![2.0, 9.0, 2.0], vec![1.0, 2.0, 11.0]],
            report: json!({ "macro avg": { "precision": 0.72, "recall": 0.71 } }),
        },
        predictions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_tickers_are_scoped_by_market() {
        let backend = ScriptedBackend::demo();
        assert_eq!(
            backend.tickers(Department::Fund, Some("HNX")).unwrap(),
            vec!["SHS", "PVS", "CEO"]
        );
        assert!(backend.tickers(Department::Fund, Some("NYSE")).unwrap().is_empty());
        assert_eq!(backend.tickers(Department::Fund, None).unwrap().len(), 9);
    }

    #[test]
    fn raw_response_is_classified_like_http() {
        let backend = ScriptedBackend::demo();
        backend.respond("/svm-analysis", 500, r#"{"error":"model unavailable"}"#);
        let req = SvmRequest {
            days_to_predict: 5,
            use_beta: true,
            market_code: "HOSE".into(),
            ticker: "FPT".into(),
        };
        let err = backend.svm_analysis(Department::Fund, &req).unwrap_err();
        assert_eq!(err.user_message(), "model unavailable");

        backend.respond("/svm-analysis", 200, r#"{"predictions": []}"#);
        assert!(matches!(
            backend.svm_analysis(Department::Fund, &req),
            Err(FetchError::MalformedResponse(_))
        ));

        backend.clear("/svm-analysis");
        assert!(backend.svm_analysis(Department::Fund, &req).is_ok());
    }

    #[test]
    fn calls_are_recorded_with_bodies() {
        let backend = ScriptedBackend::demo();
        assert_eq!(backend.call_count(), 0);
        backend
            .calculate_beta(&BetaRequest {
                ticker: Some("VNM".into()),
                ..BetaRequest::default()
            })
            .unwrap();
        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, "/calculate-beta");
        assert_eq!(calls[0].body, json!({ "ticker": "VNM" }));
    }

    #[test]
    fn latest_analysis_follows_last_run() {
        let backend = ScriptedBackend::demo();
        assert_eq!(backend.latest_analysis(Department::Fund, &AnalysisFilter::default()).unwrap(), None);

        let req = SvmRequest {
            days_to_predict: 3,
            use_beta: false,
            market_code: "HOSE".into(),
            ticker: "VCB".into(),
        };
        backend.svm_analysis(Department::Fund, &req).unwrap();

        let latest = backend
            .latest_analysis(Department::Fund, &AnalysisFilter::default())
            .unwrap()
            .unwrap();
        assert_eq!(latest.days_to_predict, Some(3));
        assert_eq!(latest.ticker.as_deref(), Some("VCB"));

        let other = AnalysisFilter {
            market_code: Some("HNX".into()),
            ticker: None,
        };
        assert_eq!(backend.latest_analysis(Department::Fund, &other).unwrap(), None);
    }

    #[test]
    fn research_calls_use_the_analysis_prefix() {
        let backend = ScriptedBackend::demo();
        backend.market_codes(Department::Research).unwrap();
        backend.tickers(Department::Research, Some("HOSE")).unwrap();
        let req = SvmRequest {
            days_to_predict: 5,
            use_beta: true,
            market_code: "HOSE".into(),
            ticker: "FPT".into(),
        };
        backend.svm_analysis(Department::Research, &req).unwrap();
        let paths: Vec<String> = backend.calls().into_iter().map(|c| c.path).collect();
        assert_eq!(
            paths,
            vec![
                "/data-analysis/market-code",
                "/data-analysis/ticker",
                "/data-analysis/svm-analysis"
            ]
        );
        assert_eq!(
            backend.latest_analysis(Department::Fund, &AnalysisFilter::default()).unwrap(),
            None
        );
        assert!(backend
            .latest_analysis(Department::Research, &AnalysisFilter::default())
            .unwrap()
            .is_some());
    }

    #[test]
    fn latest_analysis_404_means_none() {
        let backend = ScriptedBackend::demo();
        backend.respond("/latest-svm-analysis", 404, r#"{"error":"No analysis found"}"#);
        assert_eq!(backend.latest_analysis(Department::Fund, &AnalysisFilter::default()).unwrap(), None);
    }

    #[test]
    fn portfolio_beta_is_weight_normalized() {
        let backend = ScriptedBackend::demo();
        let mut portfolio = BTreeMap::new();
        portfolio.insert("VNM".to_string(), 1.0);
        portfolio.insert("FPT".to_string(), 3.0);
        let result = backend
            .portfolio_beta(&PortfolioBetaRequest {
                portfolio,
                days_to_predict: None,
            })
            .unwrap();
        let expected = (demo_beta("VNM") * 1.0 + demo_beta("FPT") * 3.0) / 4.0;
        assert!((result.portfolio_beta - expected).abs() < 1e-9);
        assert_eq!(result.component_betas.len(), 2);
    }
}
