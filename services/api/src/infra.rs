use chrono::NaiveDate;
use goods_receipt::inventory::StoreGateway;
use goods_receipt::store::memory::MemoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) unit_options: Arc<Vec<String>>,
}

/// Gateway over a fresh process-local store.
pub(crate) fn memory_gateway() -> Arc<StoreGateway<MemoryStore>> {
    Arc::new(StoreGateway::new(Arc::new(MemoryStore::new())))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_trims_and_reports_bad_input() {
        assert_eq!(
            parse_date(" 2024-03-14 "),
            Ok(NaiveDate::from_ymd_opt(2024, 3, 14).expect("valid date"))
        );
        let err = parse_date("14/03/2024").expect_err("wrong format");
        assert!(err.contains("YYYY-MM-DD"));
    }
}
