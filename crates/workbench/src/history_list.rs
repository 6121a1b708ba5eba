// Recent invocations shown in the history panel.

use rpcdesk_common::types::HistoryRecord;

#[derive(Debug, Default)]
pub struct HistoryList {
    records: Vec<HistoryRecord>,
    loading: bool,
}

impl HistoryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    pub fn finish_load(&mut self, records: Vec<HistoryRecord>) {
        self.records = records;
        self.loading = false;
    }

    /// Keep the previous records when a reload fails.
    pub fn fail_load(&mut self) {
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn get(&self, id: i64) -> Option<&HistoryRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Case-insensitive match on service, method, or `service method`.
    /// An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&HistoryRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.records.iter().collect();
        }
        self.records
            .iter()
            .filter(|record| {
                let service = record.service.to_lowercase();
                let method = record.method.to_lowercase();
                service.contains(&needle)
                    || method.contains(&needle)
                    || format!("{service} {method}").contains(&needle)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn rec(id: i64, service: &str, method: &str) -> HistoryRecord {
        HistoryRecord {
            id,
            server_id: 1,
            service: service.into(),
            method: method.into(),
            request: "{}".into(),
            response: String::new(),
            request_headers: String::new(),
            context_values: String::new(),
            status_code: 0,
            execution_time_ms: 0,
            error: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn search_matches_service_method_and_both() {
        let mut list = HistoryList::new();
        list.begin_load();
        assert!(list.is_loading());
        list.finish_load(vec![rec(1, "pkg.Greeter", "SayHello"), rec(2, "pkg.Store", "ListItems")]);
        assert!(!list.is_loading());

        let ids = |query: &str| list.search(query).iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids("greeter"), vec![1]);
        assert_eq!(ids("LISTITEMS"), vec![2]);
        assert_eq!(ids("greeter sayhello"), vec![1]);
        assert_eq!(ids(""), vec![1, 2]);
        assert!(ids("nothing").is_empty());
    }

    #[test]
    fn failed_reload_keeps_records() {
        let mut list = HistoryList::new();
        list.finish_load(vec![rec(1, "S", "M")]);
        list.begin_load();
        list.fail_load();
        assert_eq!(list.records().len(), 1);
        assert!(list.get(1).is_some());
    }
}
