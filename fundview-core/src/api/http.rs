//! HTTP backend.
//!
//! Talks JSON to the fund and research servers with a blocking reqwest client.
//! Research selection and analysis calls live under an extra prefix on the
//! research server (`/api/data-analysis/...` by default). Every call
//! is classified the same way: transport errors become `NetworkFailure` or
//! `Timeout`, non-2xx statuses become `ServerError` carrying the body's `error`
//! field, and 2xx bodies that do not match the expected shape become
//! `MalformedResponse`. Nothing is retried here; retry is the caller's decision.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::backend::{unique_tickers, Backend};
use super::types::{
    ActionReceipt, AnalysisFilter, BetaRequest, BetaResponse, BetaResult, Department, ImportBody,
    ImportTarget, LatestAnalysis, PortfolioBeta, PortfolioBetaRequest, Row, StockDataKind,
    StockRow, SvmAnalysis, SvmRequest,
};
use crate::config::Settings;
use crate::error::FetchError;

pub struct HttpBackend {
    client: Client,
    fund_base: String,
    research_base: String,
    /// Research base plus the analysis prefix.
    research_analysis_base: String,
    timeout_secs: u64,
}

impl HttpBackend {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let timeout_secs = settings.request_timeout_secs;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::NetworkFailure(format!("build HTTP client: {e}")))?;

        let research_base = endpoint_base(&settings.research_base_url, &settings.api_prefix);
        Ok(Self {
            client,
            fund_base: endpoint_base(&settings.base_url, &settings.api_prefix),
            research_analysis_base: endpoint_base(&research_base, &settings.research_analysis_prefix),
            research_base,
            timeout_secs,
        })
    }

    /// Server root for plain department endpoints (imports, jobs).
    fn base(&self, dept: Department) -> &str {
        match dept {
            Department::Fund => &self.fund_base,
            Department::Research => &self.research_base,
        }
    }

    /// Root for the selection and analysis endpoints.
    fn analysis_base(&self, dept: Department) -> &str {
        match dept {
            Department::Fund => &self.fund_base,
            Department::Research => &self.research_analysis_base,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            FetchError::NetworkFailure(e.to_string())
        }
    }

    /// Send and read the whole body. Status checking is left to the caller.
    fn execute(&self, req: RequestBuilder, url: &str) -> Result<(u16, String), FetchError> {
        debug!(url, "sending request");
        let resp = req.send().map_err(|e| self.transport_error(e))?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| self.transport_error(e))?;
        if !(200..300).contains(&status) {
            warn!(url, status, "backend returned an error status");
        }
        Ok((status, body))
    }

    fn get<T: DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = format!("{base}{path}");
        let req = self.client.get(&url).query(query);
        let (status, body) = self.execute(req, &url)?;
        check_status(status, &body)?;
        decode(path, &body)
    }

    fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        let url = format!("{base}{path}");
        let req = self.client.post(&url).json(body);
        let (status, text) = self.execute(req, &url)?;
        check_status(status, &text)?;
        decode(path, &text)
    }
}

impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn market_codes(&self, dept: Department) -> Result<Vec<String>, FetchError> {
        self.get(self.analysis_base(dept), "/market-code", &[])
    }

    fn tickers(&self, dept: Department, market_code: Option<&str>) -> Result<Vec<String>, FetchError> {
        let base = self.analysis_base(dept);
        match (market_code, dept) {
            (Some(code), _) => self.get(base, "/ticker", &[("market_code", code)]),
            (None, Department::Research) => self.get(base, "/ticker", &[]),
            (None, Department::Fund) => {
                let rows: Vec<StockRow> = self.get(base, StockDataKind::Plain.path(), &[])?;
                Ok(unique_tickers(&rows))
            }
        }
    }

    fn stock_data(&self, kind: &StockDataKind) -> Result<Vec<StockRow>, FetchError> {
        let base = self.base(Department::Fund);
        match kind {
            StockDataKind::Asset {
                market_code: Some(code),
            } if !code.is_empty() => self.get(base, kind.path(), &[("market_code", code.as_str())]),
            _ => self.get(base, kind.path(), &[]),
        }
    }

    fn calculate_beta(&self, req: &BetaRequest) -> Result<Vec<BetaResult>, FetchError> {
        let path = "/calculate-beta";
        let url = format!("{}{path}", self.base(Department::Fund));
        let req_builder = self.client.post(&url).json(req);
        let (status, body) = self.execute(req_builder, &url)?;
        check_status(status, &body)?;
        match decode::<BetaResponse>(path, &body)? {
            BetaResponse::Many(results) => Ok(results),
            BetaResponse::One(result) => {
                if result.beta.is_none() {
                    return Err(FetchError::ServerError {
                        status,
                        message: result
                            .error
                            .unwrap_or_else(|| "beta could not be calculated".into()),
                    });
                }
                Ok(vec![result])
            }
        }
    }

    fn portfolio_beta(&self, req: &PortfolioBetaRequest) -> Result<PortfolioBeta, FetchError> {
        self.post(self.base(Department::Fund), "/calculate-portfolio-beta", req)
    }

    fn svm_analysis(&self, dept: Department, req: &SvmRequest) -> Result<SvmAnalysis, FetchError> {
        self.post(self.analysis_base(dept), "/svm-analysis", req)
    }

    fn latest_analysis(
        &self,
        dept: Department,
        filter: &AnalysisFilter,
    ) -> Result<Option<LatestAnalysis>, FetchError> {
        let path = "/latest-svm-analysis";
        let url = format!("{}{path}", self.analysis_base(dept));
        let req = self.client.get(&url).query(&filter.query());
        let (status, body) = self.execute(req, &url)?;
        if status == 404 {
            return Ok(None);
        }
        check_status(status, &body)?;
        decode(path, &body).map(Some)
    }

    fn market_index(&self) -> Result<Vec<Row>, FetchError> {
        self.get(self.base(Department::Fund), "/market-index-data", &[])
    }

    fn import_rows(&self, target: ImportTarget, rows: &[Row]) -> Result<ActionReceipt, FetchError> {
        self.post(self.base(target.department()), target.path(), &ImportBody { data: rows })
    }

    fn recalculate(&self) -> Result<ActionReceipt, FetchError> {
        self.post(self.base(Department::Fund), "/calculate", &serde_json::json!({}))
    }

    fn research_analyze(&self) -> Result<ActionReceipt, FetchError> {
        self.post(
            self.base(Department::Research),
            "/research-analyze",
            &serde_json::json!({}),
        )
    }
}

/// Join base URL and API prefix without doubling or dropping slashes.
pub(crate) fn endpoint_base(base_url: &str, api_prefix: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let prefix = api_prefix.trim_matches('/');
    if prefix.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{prefix}")
    }
}

/// Map a non-2xx status to `ServerError`, preferring the body's `error` field.
pub(crate) fn check_status(status: u16, body: &str) -> Result<(), FetchError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| format!("HTTP {status}"));
    Err(FetchError::ServerError { status, message })
}

pub(crate) fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("{path}: {e}")))
}
