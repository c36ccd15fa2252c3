//! Backend trait.
//!
//! The Backend trait abstracts over the dashboard server so the session can run
//! against HTTP in production and against canned data in tests and demo mode.
//! Implementations are blocking; the executor decides which thread they run on.
//!
//! The fund and research departments run separate servers. Selection and
//! analysis calls name the department they are for; imports and research jobs
//! already imply it.

use super::types::{
    ActionReceipt, AnalysisFilter, BetaRequest, BetaResult, Department, ImportTarget, LatestAnalysis,
    PortfolioBeta, PortfolioBetaRequest, Row, StockDataKind, StockRow, SvmAnalysis, SvmRequest,
};
use crate::error::FetchError;

pub trait Backend: Send + Sync {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// `GET /api/market-code`, or `/api/data-analysis/market-code` on research.
    fn market_codes(&self, dept: Department) -> Result<Vec<String>, FetchError>;

    /// Tickers scoped to a market code, or every known ticker when `None`.
    fn tickers(&self, dept: Department, market_code: Option<&str>)
        -> Result<Vec<String>, FetchError>;

    fn stock_data(&self, kind: &StockDataKind) -> Result<Vec<StockRow>, FetchError>;

    /// `POST /api/calculate-beta`. A single result with a null beta is a failure.
    fn calculate_beta(&self, req: &BetaRequest) -> Result<Vec<BetaResult>, FetchError>;

    fn portfolio_beta(&self, req: &PortfolioBetaRequest) -> Result<PortfolioBeta, FetchError>;

    fn svm_analysis(&self, dept: Department, req: &SvmRequest) -> Result<SvmAnalysis, FetchError>;

    /// Last stored analysis. `Ok(None)` when the server has none (HTTP 404).
    fn latest_analysis(
        &self,
        dept: Department,
        filter: &AnalysisFilter,
    ) -> Result<Option<LatestAnalysis>, FetchError>;

    fn market_index(&self) -> Result<Vec<Row>, FetchError>;

    fn import_rows(&self, target: ImportTarget, rows: &[Row]) -> Result<ActionReceipt, FetchError>;

    /// `POST /api/calculate`: recompute betas and retrain the model server-side.
    fn recalculate(&self) -> Result<ActionReceipt, FetchError>;

    /// `POST /api/research-analyze` on the research server.
    fn research_analyze(&self) -> Result<ActionReceipt, FetchError>;
}

/// Unique ticker values in first-seen order.
pub fn unique_tickers(rows: &[StockRow]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    rows.iter()
        .filter_map(|r| r.ticker.as_deref())
        .filter(|t| seen.insert(t.to_string()))
        .map(String::from)
        .collect()
}
