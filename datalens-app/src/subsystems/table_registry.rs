//! Table registry: known tables, the current selection, and per-table detail.
//!
//! The registry is the only owner of the selected table. Selecting a table
//! switches the router to the table-detail pane and fires the schema and
//! quality fetches concurrently; each fetch writes its own slice of the detail
//! when it resolves. Every fetch carries the [`SelectionTicket`] that was
//! current when it was issued, and its result is dropped if the selection has
//! moved on by the time it lands.
//!
//! The catalog (table list + total rows) and the dashboard metrics are
//! separate surfaces, so `refresh_tables` and `refresh_dashboard_metrics` can
//! run concurrently in any order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use datalens_core::models::{
    OutlierReasoningRequest, ProjectInfo, QualityReport, SchemaMap, TableAiSummary, TableSchema,
};
use datalens_core::{ApiClient, ApiError};
use regex::Regex;
use tokio::sync::watch;

use super::view_router::{Pane, View, ViewRouter};

const NO_ISSUES: &str = "No major issues detected.";
const DEFAULT_PROJECT_TITLE: &str = "Project Overview";
const DEFAULT_CLASSIFICATION: &str = "General";
const OUTLIER_REASON_FALLBACK: &str = "Unable to determine logical context.";
const OUTLIER_UNREACHABLE: &str = "Failed to connect to reasoning core.";

// ============================================================================
// Display model
// ============================================================================

/// State of an independently loaded slice of a pane.
#[derive(Debug, Clone, PartialEq)]
pub enum Load<T> {
    /// Placeholder shown until the fetch resolves ("-" in the detail pane).
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Load<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Load::Ready(value) => Some(value),
            Load::Pending | Load::Failed(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Load::Pending)
    }
}

/// A percentage that is undefined for empty tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percent {
    Value(f64),
    NotApplicable,
}

impl Percent {
    /// `count / total * 100`; `NotApplicable` when `total` is zero.
    pub fn of(count: u64, total: u64) -> Self {
        if total == 0 {
            return Percent::NotApplicable;
        }
        Percent::Value(count as f64 / total as f64 * 100.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percent::Value(v) => write!(f, "{:.2}%", v),
            Percent::NotApplicable => f.write_str("n/a"),
        }
    }
}

/// One row of the schema table in the detail pane.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRow {
    pub name: String,
    pub data_type: String,
    pub is_potential_key: bool,
    pub null_pct: Percent,
    pub unique_pct: Percent,
}

pub fn column_rows(schema: &TableSchema) -> Vec<ColumnRow> {
    schema
        .columns
        .iter()
        .map(|col| ColumnRow {
            name: col.name.clone(),
            data_type: col.data_type.clone(),
            is_potential_key: schema.potential_keys.contains(&col.name),
            null_pct: Percent::of(col.null_count, schema.row_count),
            unique_pct: Percent::of(col.unique_count, schema.row_count),
        })
        .collect()
}

/// Tri-level classification of a trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    Good,
    Warning,
    Critical,
}

impl TrustLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            TrustLevel::Good
        } else if score >= 70.0 {
            TrustLevel::Warning
        } else {
            TrustLevel::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrustLevel::Good => "good",
            TrustLevel::Warning => "warning",
            TrustLevel::Critical => "critical",
        }
    }
}

/// Column named by an outlier issue such as
/// `"High outlier rate in unit_price (12.0%)"`.
pub fn outlier_column(issue: &str) -> Option<String> {
    if !issue.to_lowercase().contains("outlier") {
        return None;
    }
    let re = Regex::new(r"in ([\w_]+)").ok()?;
    re.captures(issue)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssueLine {
    pub text: String,
    /// Set when the issue can be explained via outlier reasoning.
    pub outlier_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityView {
    pub report: QualityReport,
    pub trust_level: TrustLevel,
    pub issues: Vec<IssueLine>,
}

impl From<QualityReport> for QualityView {
    fn from(report: QualityReport) -> Self {
        let issues = report
            .issues
            .iter()
            .map(|text| IssueLine {
                text: text.clone(),
                outlier_column: outlier_column(text),
            })
            .collect();
        Self {
            trust_level: TrustLevel::from_score(report.trust_score),
            issues,
            report,
        }
    }
}

impl QualityView {
    /// Issue texts as displayed, with a placeholder for a clean table.
    pub fn issue_texts(&self) -> Vec<&str> {
        if self.issues.is_empty() {
            return vec![NO_ISSUES];
        }
        self.issues.iter().map(|i| i.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiSummary {
    pub classification: String,
    pub summary: String,
    pub impact: String,
    pub risks: String,
    pub important_columns: Vec<String>,
}

impl From<TableAiSummary> for AiSummary {
    fn from(s: TableAiSummary) -> Self {
        Self {
            classification: s
                .classification
                .unwrap_or_else(|| DEFAULT_CLASSIFICATION.to_string()),
            summary: s.summary.unwrap_or_default(),
            impact: s.impact.unwrap_or_default(),
            risks: s.risks.unwrap_or_default(),
            important_columns: s.important_columns,
        }
    }
}

/// Everything the table-detail pane shows for the selected table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDetail {
    pub table: String,
    pub schema: Load<Vec<ColumnRow>>,
    pub quality: Load<QualityView>,
    /// `None` until an AI summary is requested for this visit.
    pub summary: Option<Load<AiSummary>>,
}

impl TableDetail {
    fn placeholder(table: &str) -> Self {
        Self {
            table: table.to_string(),
            schema: Load::Pending,
            quality: Load::Pending,
            summary: None,
        }
    }
}

/// Outlier diagnostic surface, scoped to one issue.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub table: String,
    pub column: String,
    pub reason: Load<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCatalog {
    pub tables: SchemaMap,
    pub total_rows: u64,
}

impl TableCatalog {
    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectNarrative {
    pub title: String,
    pub description: String,
    pub dataset_context: String,
    pub business_value: Vec<String>,
    pub key_entities: Vec<String>,
}

impl From<ProjectInfo> for ProjectNarrative {
    fn from(info: ProjectInfo) -> Self {
        Self {
            title: info
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_PROJECT_TITLE.to_string()),
            description: info.description.unwrap_or_default(),
            dataset_context: info.context.or(info.dataset_context).unwrap_or_default(),
            business_value: info.value,
            key_entities: info.key_entities,
        }
    }
}

/// Aggregate figures on the dashboard pane. `None` renders as unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardMetrics {
    pub total_tables: Option<u64>,
    pub total_rows: Option<u64>,
    pub avg_trust_score: Option<f64>,
    pub project: Option<ProjectNarrative>,
}

/// Selection context a fetch was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    table: String,
    epoch: u64,
}

impl SelectionTicket {
    pub fn table(&self) -> &str {
        &self.table
    }

    /// A result may be applied only while its ticket is still the current one.
    pub fn is_current(&self, current: Option<&SelectionTicket>) -> bool {
        current == Some(self)
    }
}

// ============================================================================
// TableRegistry
// ============================================================================

pub struct TableRegistry {
    api: ApiClient,
    router: Arc<ViewRouter>,
    catalog: watch::Sender<TableCatalog>,
    dashboard: watch::Sender<DashboardMetrics>,
    selection: watch::Sender<Option<SelectionTicket>>,
    detail: watch::Sender<Option<TableDetail>>,
    diagnostic: watch::Sender<Option<Diagnostic>>,
    last_error: watch::Sender<Option<String>>,
    epoch: AtomicU64,
}

impl TableRegistry {
    pub fn new(api: ApiClient, router: Arc<ViewRouter>) -> Self {
        Self {
            api,
            router,
            catalog: watch::channel(TableCatalog::default()).0,
            dashboard: watch::channel(DashboardMetrics::default()).0,
            selection: watch::channel(None).0,
            detail: watch::channel(None).0,
            diagnostic: watch::channel(None).0,
            last_error: watch::channel(None).0,
            epoch: AtomicU64::new(0),
        }
    }

    // ------------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------------

    pub fn catalog(&self) -> TableCatalog {
        self.catalog.borrow().clone()
    }

    pub fn dashboard(&self) -> DashboardMetrics {
        self.dashboard.borrow().clone()
    }

    pub fn selected_table(&self) -> Option<String> {
        self.selection.borrow().as_ref().map(|t| t.table.clone())
    }

    pub fn detail(&self) -> Option<TableDetail> {
        self.detail.borrow().clone()
    }

    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.diagnostic.borrow().clone()
    }

    /// Most recent refresh failure, kept for the status surface.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn subscribe_catalog(&self) -> watch::Receiver<TableCatalog> {
        self.catalog.subscribe()
    }

    pub fn subscribe_dashboard(&self) -> watch::Receiver<DashboardMetrics> {
        self.dashboard.subscribe()
    }

    pub fn subscribe_detail(&self) -> watch::Receiver<Option<TableDetail>> {
        self.detail.subscribe()
    }

    pub fn is_current(&self, ticket: &SelectionTicket) -> bool {
        ticket.is_current(self.selection.borrow().as_ref())
    }

    // ------------------------------------------------------------------------
    // Catalog + dashboard
    // ------------------------------------------------------------------------

    fn apply_catalog(&self, tables: SchemaMap) {
        let total_rows = tables.values().map(|t| t.row_count).sum();
        self.catalog
            .send_replace(TableCatalog { tables, total_rows });
    }

    fn report(&self, message: String) {
        tracing::warn!(message = %message, "Table registry refresh failed");
        self.last_error.send_replace(Some(message));
    }

    /// Reload the full schema map, replacing the catalog wholesale.
    /// Failures are reported, never returned.
    pub async fn refresh_tables(&self) {
        match self.api.schema().await {
            Ok(tables) => {
                tracing::info!(tables = tables.len(), "Table catalog refreshed");
                self.apply_catalog(tables);
            }
            Err(e) => self.report(format!("Failed to load tables: {}", e)),
        }
    }

    /// Reload aggregate metrics and the project narrative.
    pub async fn refresh_dashboard_metrics(&self) {
        match self.api.dashboard().await {
            Ok(summary) => {
                self.dashboard.send_modify(|metrics| {
                    metrics.total_tables = Some(summary.total_tables);
                    metrics.total_rows = Some(summary.total_rows);
                    metrics.avg_trust_score = Some(summary.avg_trust_score);
                    if let Some(info) = summary.project_info {
                        metrics.project = Some(info.into());
                    }
                });
            }
            Err(e) => self.report(format!("Failed to update dashboard: {}", e)),
        }
    }

    /// Both refreshes, concurrently.
    pub async fn refresh_all(&self) {
        tokio::join!(self.refresh_tables(), self.refresh_dashboard_metrics());
    }

    /// Publish a table count learned elsewhere (session check, upload).
    pub fn publish_total_tables(&self, total: u64) {
        self.dashboard
            .send_modify(|metrics| metrics.total_tables = Some(total));
    }

    /// Drop every client-held table state (session reset).
    pub fn reset(&self) {
        self.clear_selection();
        self.catalog.send_replace(TableCatalog::default());
        self.dashboard.send_replace(DashboardMetrics {
            total_tables: Some(0),
            ..DashboardMetrics::default()
        });
        self.last_error.send_replace(None);
    }

    // ------------------------------------------------------------------------
    // Navigation + selection
    // ------------------------------------------------------------------------

    /// Route to `view`, keeping the selection in step with the pane: anything
    /// but table-detail clears it, and table-detail needs one.
    pub fn navigate(&self, view: View) -> bool {
        if view == View::Application(Pane::TableDetail) {
            if self.selection.borrow().is_none() {
                tracing::warn!("Ignoring navigation to table detail without a selected table");
                return false;
            }
            return self.router.show(view);
        }
        self.clear_selection();
        self.router.show(view)
    }

    pub fn clear_selection(&self) {
        self.selection.send_if_modified(|s| s.take().is_some());
        self.detail.send_if_modified(|d| d.take().is_some());
        self.diagnostic.send_if_modified(|d| d.take().is_some());
    }

    /// Synchronous half of a selection: the ticket, placeholders and pane
    /// switch all happen before any request is issued.
    fn begin_selection(&self, name: &str) -> SelectionTicket {
        let ticket = SelectionTicket {
            table: name.to_string(),
            epoch: self.epoch.fetch_add(1, Ordering::SeqCst) + 1,
        };
        self.selection.send_replace(Some(ticket.clone()));
        self.detail.send_replace(Some(TableDetail::placeholder(name)));
        self.diagnostic.send_if_modified(|d| d.take().is_some());
        self.router.show(View::Application(Pane::TableDetail));
        ticket
    }

    /// Apply `update` to the detail pane if `ticket` is still current.
    fn apply_detail(
        &self,
        ticket: &SelectionTicket,
        slice: &str,
        update: impl FnOnce(&mut TableDetail),
    ) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(table = %ticket.table, slice, "Discarding stale response");
            return false;
        }
        self.detail.send_modify(|detail| {
            if let Some(detail) = detail.as_mut().filter(|d| d.table == ticket.table) {
                update(detail);
            }
        });
        true
    }

    /// Select `name`, show its detail pane and load schema and quality
    /// concurrently. Either slice may land first.
    pub async fn select_table(&self, name: &str) {
        let ticket = self.begin_selection(name);
        tracing::info!(table = %name, "Table selected");
        tokio::join!(self.load_schema(&ticket), self.load_quality(&ticket));
    }

    async fn load_schema(&self, ticket: &SelectionTicket) {
        let slice = match self.api.schema().await {
            Ok(tables) => {
                let slice = match tables.get(&ticket.table) {
                    Some(schema) => Load::Ready(column_rows(schema)),
                    None => Load::Failed(format!("Table {} not found in schema.", ticket.table)),
                };
                if self.is_current(ticket) {
                    self.apply_catalog(tables);
                }
                slice
            }
            Err(e) => {
                tracing::warn!(table = %ticket.table, error = %e, "Schema fetch failed");
                Load::Failed(failure_text(&e, "Failed to load schema."))
            }
        };
        self.apply_detail(ticket, "schema", |detail| detail.schema = slice);
    }

    async fn load_quality(&self, ticket: &SelectionTicket) {
        let slice = match self.api.quality(&ticket.table).await {
            Ok(report) => Load::Ready(QualityView::from(report)),
            Err(e) => {
                tracing::warn!(table = %ticket.table, error = %e, "Quality fetch failed");
                Load::Failed(failure_text(&e, "Failed to load quality metrics."))
            }
        };
        self.apply_detail(ticket, "quality", |detail| detail.quality = slice);
    }

    /// Request the AI summary for the selected table. No-op without one.
    pub async fn generate_summary(&self) -> bool {
        let Some(ticket) = self.selection.borrow().clone() else {
            return false;
        };
        self.apply_detail(&ticket, "summary", |detail| {
            detail.summary = Some(Load::Pending)
        });

        let slice = match self.api.table_summary(&ticket.table).await {
            Ok(summary) => Load::Ready(AiSummary::from(summary)),
            Err(e) => {
                tracing::error!(table = %ticket.table, error = %e, "AI analysis failed");
                Load::Failed(format!("Connectivity issue: {}", e))
            }
        };
        self.apply_detail(&ticket, "summary", |detail| detail.summary = Some(slice))
    }

    /// Ask the backend why `column` of `table` has outliers. Only the
    /// diagnostic surface is touched, whatever the outcome.
    pub async fn explain_outlier(&self, table: &str, column: &str) -> Load<String> {
        self.diagnostic.send_replace(Some(Diagnostic {
            table: table.to_string(),
            column: column.to_string(),
            reason: Load::Pending,
        }));

        let request = OutlierReasoningRequest {
            table_name: table.to_string(),
            column_name: column.to_string(),
            row_index: 0,
        };
        let reason = match self.api.outlier_reasoning(&request).await {
            Ok(r) => Load::Ready(
                r.reason
                    .unwrap_or_else(|| OUTLIER_REASON_FALLBACK.to_string()),
            ),
            Err(e) if e.is_transport() => {
                tracing::warn!(table = %table, column = %column, error = %e, "Outlier reasoning unreachable");
                Load::Failed(OUTLIER_UNREACHABLE.to_string())
            }
            Err(e) => {
                tracing::warn!(table = %table, column = %column, error = %e, "Outlier reasoning failed");
                Load::Failed(failure_text(&e, OUTLIER_REASON_FALLBACK))
            }
        };

        self.diagnostic.send_modify(|diag| {
            if let Some(diag) = diag
                .as_mut()
                .filter(|d| d.table == table && d.column == column)
            {
                diag.reason = reason.clone();
            }
        });
        reason
    }

    /// Explain an issue line, if it names an outlier column.
    pub async fn explain_outlier_issue(&self, table: &str, issue: &str) -> Option<Load<String>> {
        let column = outlier_column(issue)?;
        Some(self.explain_outlier(table, &column).await)
    }
}

fn failure_text(err: &ApiError, fallback: &str) -> String {
    err.backend_message()
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn schema_body() -> serde_json::Value {
        json!({
            "orders": {
                "row_count": 200,
                "columns": [
                    { "name": "order_id", "type": "int64", "null_count": 0, "unique_count": 200 },
                    { "name": "amount", "type": "float64", "null_count": 10, "unique_count": 150 }
                ],
                "potential_keys": ["order_id"]
            },
            "customers": {
                "row_count": 50,
                "columns": [
                    { "name": "customer_id", "type": "int64", "null_count": 0, "unique_count": 50 }
                ],
                "potential_keys": ["customer_id"]
            }
        })
    }

    fn quality_body(trust_score: f64) -> serde_json::Value {
        json!({
            "completeness": 97.5,
            "freshness": 80,
            "trust_score": trust_score,
            "sub_scores": { "identifier_health": 100, "fk_integrity": 90, "numeric_sanity": 85 },
            "issues": ["High outlier rate in amount (6.0%)", "Stale timestamps"]
        })
    }

    fn registry_for(server: &MockServer) -> (TableRegistry, Arc<ViewRouter>) {
        let router = Arc::new(ViewRouter::new());
        let api = ApiClient::with_base_url(server.uri()).unwrap();
        (TableRegistry::new(api, router.clone()), router)
    }

    // ========================================================================
    // Pure display helpers
    // ========================================================================

    #[test]
    fn test_percent_zero_row_count_is_not_applicable() {
        assert_eq!(Percent::of(5, 0), Percent::NotApplicable);
        assert_eq!(Percent::of(0, 0).to_string(), "n/a");
        assert_eq!(Percent::of(10, 200).to_string(), "5.00%");
    }

    #[test]
    fn test_column_rows_for_empty_table() {
        let schema: TableSchema = serde_json::from_value(json!({
            "row_count": 0,
            "columns": [{ "name": "id", "type": "int64", "null_count": 0, "unique_count": 0 }],
            "potential_keys": ["id"]
        }))
        .unwrap();

        let rows = column_rows(&schema);

        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_potential_key);
        assert_eq!(rows[0].null_pct, Percent::NotApplicable);
        assert_eq!(rows[0].unique_pct, Percent::NotApplicable);
    }

    #[test]
    fn test_trust_level_thresholds() {
        assert_eq!(TrustLevel::from_score(95.0), TrustLevel::Good);
        assert_eq!(TrustLevel::from_score(90.0), TrustLevel::Good);
        assert_eq!(TrustLevel::from_score(80.0), TrustLevel::Warning);
        assert_eq!(TrustLevel::from_score(70.0), TrustLevel::Warning);
        assert_eq!(TrustLevel::from_score(40.0), TrustLevel::Critical);
        assert_eq!(TrustLevel::from_score(40.0).as_str(), "critical");
    }

    #[test]
    fn test_outlier_column_extraction() {
        assert_eq!(
            outlier_column("High outlier rate in unit_price (12.0%)").as_deref(),
            Some("unit_price")
        );
        assert_eq!(outlier_column("Duplicate keys in order_id"), None);
        assert_eq!(outlier_column("Outliers detected"), None);
    }

    #[test]
    fn test_empty_issue_list_shows_placeholder() {
        let view = QualityView::from(QualityReport::default());
        assert_eq!(view.issue_texts(), vec![NO_ISSUES]);
    }

    #[test]
    fn test_ticket_guard() {
        let a = SelectionTicket { table: "a".into(), epoch: 1 };
        let b = SelectionTicket { table: "b".into(), epoch: 2 };
        let a_again = SelectionTicket { table: "a".into(), epoch: 3 };

        assert!(a.is_current(Some(&a)));
        assert!(!a.is_current(Some(&b)));
        assert!(!a.is_current(Some(&a_again)), "reselecting a table starts a new context");
        assert!(!a.is_current(None));
    }

    // ========================================================================
    // Catalog + dashboard
    // ========================================================================

    #[tokio::test]
    async fn test_refresh_tables_replaces_catalog_and_sums_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schema"))
            .respond_with(ResponseTemplate::new(200).set_body_json(schema_body()))
            .mount(&server)
            .await;
        let (registry, _) = registry_for(&server);

        registry.refresh_tables().await;

        let catalog = registry.catalog();
        assert_eq!(catalog.names(), vec!["customers", "orders"]);
        assert_eq!(catalog.total_rows, 250);
        assert!(registry.last_error().is_none());
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schema"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({ "error": "System not initialized. Call /api/init first." })),
            )
            .mount(&server)
            .await;
        let (registry, _) = registry_for(&server);

        registry.refresh_tables().await;

        assert!(registry.catalog().tables.is_empty());
        let report = registry.last_error().expect("failure should be reported");
        assert!(report.contains("System not initialized"));
    }

    #[tokio::test]
    async fn test_refresh_all_tolerates_one_side_failing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schema"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(schema_body())
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dashboard"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let (registry, _) = registry_for(&server);

        registry.refresh_all().await;

        assert_eq!(registry.catalog().tables.len(), 2);
        assert_eq!(registry.dashboard().avg_trust_score, None);
        assert!(registry.last_error().is_some());
    }

    #[tokio::test]
    async fn test_dashboard_metrics_include_project_narrative() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_tables": 2,
                "total_rows": 250,
                "avg_trust_score": 88.5,
                "project_info": {
                    "title": "",
                    "dataset_context": "Retail orders",
                    "value": ["Revenue tracking"],
                    "key_entities": ["Order", "Customer"]
                }
            })))
            .mount(&server)
            .await;
        let (registry, _) = registry_for(&server);

        registry.refresh_dashboard_metrics().await;

        let metrics = registry.dashboard();
        assert_eq!(metrics.total_tables, Some(2));
        assert_eq!(metrics.avg_trust_score, Some(88.5));
        let project = metrics.project.unwrap();
        assert_eq!(project.title, DEFAULT_PROJECT_TITLE);
        assert_eq!(project.dataset_context, "Retail orders");
        assert_eq!(project.key_entities, vec!["Order", "Customer"]);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    #[tokio::test]
    async fn test_select_table_populates_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schema"))
            .respond_with(ResponseTemplate::new(200).set_body_json(schema_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quality/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quality_body(95.0)))
            .mount(&server)
            .await;
        let (registry, router) = registry_for(&server);

        registry.select_table("orders").await;

        assert_eq!(router.current(), Some(View::Application(Pane::TableDetail)));
        assert_eq!(registry.selected_table().as_deref(), Some("orders"));

        let detail = registry.detail().unwrap();
        let rows = detail.schema.ready().unwrap();
        assert_eq!(rows[1].name, "amount");
        assert_eq!(rows[1].null_pct.to_string(), "5.00%");
        assert!(rows[0].is_potential_key);

        let quality = detail.quality.ready().unwrap();
        assert_eq!(quality.trust_level, TrustLevel::Good);
        assert_eq!(quality.issues[0].outlier_column.as_deref(), Some("amount"));
        assert_eq!(quality.issues[1].outlier_column, None);
    }

    #[tokio::test]
    async fn test_quality_failure_does_not_block_schema() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schema"))
            .respond_with(ResponseTemplate::new(200).set_body_json(schema_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quality/orders"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "error": "Table not found." })),
            )
            .mount(&server)
            .await;
        let (registry, _) = registry_for(&server);

        registry.select_table("orders").await;

        let detail = registry.detail().unwrap();
        assert!(detail.schema.ready().is_some());
        assert_eq!(detail.quality, Load::Failed("Table not found.".to_string()));
    }

    async fn mount_race(server: &MockServer, a_delay: u64, b_delay: u64) {
        Mock::given(method("GET"))
            .and(path("/schema"))
            .respond_with(ResponseTemplate::new(200).set_body_json(schema_body()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quality/orders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(quality_body(40.0))
                    .set_delay(Duration::from_millis(a_delay)),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quality/customers"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(quality_body(95.0))
                    .set_delay(Duration::from_millis(b_delay)),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_late_response_for_abandoned_table_is_discarded() {
        let server = MockServer::start().await;
        mount_race(&server, 300, 10).await;
        let (registry, _) = registry_for(&server);

        tokio::join!(
            registry.select_table("orders"),
            registry.select_table("customers")
        );

        let detail = registry.detail().unwrap();
        assert_eq!(detail.table, "customers");
        assert_eq!(registry.selected_table().as_deref(), Some("customers"));
        let quality = detail.quality.ready().unwrap();
        assert_eq!(quality.trust_level, TrustLevel::Good);
        assert_eq!(detail.schema.ready().unwrap()[0].name, "customer_id");
    }

    #[tokio::test]
    async fn test_early_response_for_abandoned_table_is_discarded() {
        let server = MockServer::start().await;
        mount_race(&server, 0, 300).await;
        let (registry, _) = registry_for(&server);

        tokio::join!(
            registry.select_table("orders"),
            registry.select_table("customers")
        );

        let detail = registry.detail().unwrap();
        assert_eq!(detail.table, "customers");
        assert_eq!(detail.quality.ready().unwrap().report.trust_score, 95.0);
    }

    #[tokio::test]
    async fn test_abandoned_schema_fetch_leaves_catalog_alone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schema"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "orders": { "row_count": 1, "columns": [], "potential_keys": [] }
                    }))
                    .set_delay(Duration::from_millis(300)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/schema"))
            .respond_with(ResponseTemplate::new(200).set_body_json(schema_body()))
            .mount(&server)
            .await;
        let (registry, _) = registry_for(&server);

        tokio::join!(registry.select_table("orders"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            registry.select_table("customers").await;
        });

        let catalog = registry.catalog();
        assert_eq!(catalog.names(), vec!["customers", "orders"]);
        assert_eq!(catalog.total_rows, 250);
    }

    #[tokio::test]
    async fn test_navigate_to_dashboard_clears_selection() {
        let server = MockServer::start().await;
        mount_race(&server, 0, 0).await;
        let (registry, router) = registry_for(&server);

        registry.select_table("orders").await;
        assert!(registry.navigate(View::Application(Pane::Dashboard)));

        assert_eq!(router.active_pane(), Some(Pane::Dashboard));
        assert!(registry.selected_table().is_none());
        assert!(registry.detail().is_none(), "metrics are not cached across visits");
    }

    #[tokio::test]
    async fn test_table_detail_needs_a_selection() {
        let server = MockServer::start().await;
        let (registry, router) = registry_for(&server);

        assert!(!registry.navigate(View::Application(Pane::TableDetail)));
        assert_eq!(router.current(), None);
    }

    // ========================================================================
    // AI summary + outlier diagnostics
    // ========================================================================

    #[tokio::test]
    async fn test_generate_summary_without_selection_is_noop() {
        let server = MockServer::start().await;
        let (registry, _) = registry_for(&server);

        assert!(!registry.generate_summary().await);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_summary_defaults_classification() {
        let server = MockServer::start().await;
        mount_race(&server, 0, 0).await;
        Mock::given(method("GET"))
            .and(path("/summary/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "summary": "Order ledger",
                "important_columns": ["order_id", "amount"]
            })))
            .mount(&server)
            .await;
        let (registry, _) = registry_for(&server);

        registry.select_table("orders").await;
        assert!(registry.generate_summary().await);

        let detail = registry.detail().unwrap();
        let summary = detail.summary.unwrap();
        let summary = summary.ready().unwrap();
        assert_eq!(summary.classification, "General");
        assert_eq!(summary.important_columns.len(), 2);
    }

    #[tokio::test]
    async fn test_outlier_failure_only_touches_diagnostic() {
        let server = MockServer::start().await;
        mount_race(&server, 0, 0).await;
        Mock::given(method("POST"))
            .and(path("/outlier-reasoning"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": "model offline" })),
            )
            .mount(&server)
            .await;
        let (registry, router) = registry_for(&server);

        registry.select_table("orders").await;
        let before = registry.detail();

        let reason = registry
            .explain_outlier_issue("orders", "High outlier rate in amount (6.0%)")
            .await
            .expect("issue names a column");

        assert_eq!(reason, Load::Failed("model offline".to_string()));
        assert_eq!(registry.detail(), before);
        assert_eq!(router.active_pane(), Some(Pane::TableDetail));
        let diag = registry.diagnostic().unwrap();
        assert_eq!(diag.column, "amount");
    }

    #[tokio::test]
    async fn test_outlier_missing_reason_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/outlier-reasoning"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        let (registry, _) = registry_for(&server);

        let reason = registry.explain_outlier("orders", "amount").await;

        assert_eq!(reason, Load::Ready(OUTLIER_REASON_FALLBACK.to_string()));
    }
}
