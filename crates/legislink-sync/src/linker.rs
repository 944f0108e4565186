//! Cross-registry linking of government drafts to parliamentary processes.
//!
//! Tiers, cheapest first: no key means no lookup at all; a key already
//! verified this run is served from the [`IdentityCache`]; otherwise
//! candidates found by title are fetched and their embedded key compared,
//! newest term first. If nothing verifies, the first title hit is accepted
//! as [`LinkMethod::TitleFuzzy`].

use std::collections::HashMap;
use std::sync::Arc;

use legislink_core::{
    LinkMethod, LinkResult, PipelineConfig, ProcessRecord, SourceRecord, extract_cross_reference,
    query::search_query,
};
use tracing::{debug, info, warn};

use crate::ParliamentRegistry;

#[derive(Debug, Clone)]
struct CachedMatch {
    process: ProcessRecord,
    term: u32,
}

/// Verified key → process matches, scoped to one sync run.
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: HashMap<String, CachedMatch>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn get(&self, key: &str) -> Option<&CachedMatch> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: String, process: ProcessRecord, term: u32) {
        self.entries.insert(key, CachedMatch { process, term });
    }
}

pub struct Linker {
    registry: Arc<dyn ParliamentRegistry>,
    cache: IdentityCache,
    terms: Vec<u32>,
    candidate_limit: usize,
    query_words: usize,
    title_prefixes: Vec<String>,
}

impl Linker {
    pub fn new(registry: Arc<dyn ParliamentRegistry>, config: &PipelineConfig) -> Self {
        Self::with_cache(registry, config, IdentityCache::new())
    }

    pub fn with_cache(
        registry: Arc<dyn ParliamentRegistry>,
        config: &PipelineConfig,
        cache: IdentityCache,
    ) -> Self {
        Self {
            registry,
            cache,
            terms: config.terms.clone(),
            candidate_limit: config.candidate_limit,
            query_words: config.query_words,
            title_prefixes: config.title_prefixes.clone(),
        }
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Forget matches from a previous run.
    pub fn begin_run(&mut self) {
        if !self.cache.is_empty() {
            debug!(entries = self.cache.len(), "clearing identity cache");
        }
        self.cache.clear();
    }

    /// Link one government record. Registry failures are logged and
    /// skipped; this never fails.
    pub async fn link(&mut self, record: SourceRecord) -> LinkResult {
        let Some(key) = record
            .parliament_url
            .as_deref()
            .and_then(extract_cross_reference)
        else {
            debug!(id = %record.id, "no cross-reference key, government stage only");
            return LinkResult::unlinked(None, record);
        };

        if let Some(hit) = self.cache.get(&key).cloned() {
            debug!(id = %record.id, key = %key, print = %hit.process.number, "identity cache hit");
            return LinkResult::matched(key, record, hit.process, hit.term, LinkMethod::ExactVerified);
        }

        let Some(query) = search_query(&record.title, &self.title_prefixes, self.query_words)
        else {
            debug!(id = %record.id, key = %key, "title yields no search query");
            return LinkResult::not_found(key, record);
        };

        if let Some((process, term)) = self.search(&query, Some(&key)).await {
            info!(id = %record.id, key = %key, print = %process.number, term, "linked by verified key");
            self.cache.insert(key.clone(), process.clone(), term);
            return LinkResult::matched(key, record, process, term, LinkMethod::ExactVerified);
        }

        if let Some((process, term)) = self.search(&query, None).await {
            warn!(
                id = %record.id,
                key = %key,
                print = %process.number,
                term,
                "no verified match, linked by title only"
            );
            return LinkResult::matched(key, record, process, term, LinkMethod::TitleFuzzy);
        }

        info!(id = %record.id, key = %key, query = %query, "no parliamentary process found");
        LinkResult::not_found(key, record)
    }

    /// Link records in input order.
    pub async fn link_all(&mut self, records: Vec<SourceRecord>) -> Vec<LinkResult> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            results.push(self.link(record).await);
        }
        results
    }

    /// Walk terms newest first. With an expected key, return the first
    /// candidate whose detail carries it; without one, the first candidate
    /// whose detail could be fetched.
    async fn search(&self, query: &str, expected: Option<&str>) -> Option<(ProcessRecord, u32)> {
        for &term in &self.terms {
            let candidates = match self
                .registry
                .search_candidates(query, term, self.candidate_limit)
                .await
            {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(term, query, error = %e, "candidate search failed");
                    continue;
                }
            };
            for candidate in candidates.into_iter().take(self.candidate_limit) {
                let detail = match self
                    .registry
                    .fetch_process_detail(&candidate.number, term)
                    .await
                {
                    Ok(detail) => detail,
                    Err(e) => {
                        warn!(term, print = %candidate.number, error = %e, "process detail fetch failed");
                        continue;
                    }
                };
                match expected {
                    None => return Some((detail, term)),
                    Some(key) if detail.rcl_num.as_deref() == Some(key) => {
                        return Some((detail, term));
                    }
                    Some(key) => debug!(
                        term,
                        print = %candidate.number,
                        expected = key,
                        found = ?detail.rcl_num,
                        "candidate key mismatch"
                    ),
                }
            }
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use legislink_core::ProcessSummary;

    use super::*;
    use crate::FetchError;

    /// Scripted parliamentary registry that records every call.
    #[derive(Default)]
    pub(crate) struct FakeRegistry {
        pub candidates: HashMap<u32, Vec<&'static str>>,
        pub details: HashMap<(u32, &'static str), ProcessRecord>,
        pub failing: Vec<&'static str>,
        pub failing_terms: Vec<u32>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeRegistry {
        pub fn with_process(mut self, term: u32, print: &'static str, key: Option<&str>) -> Self {
            self.candidates.entry(term).or_default().push(print);
            self.details.insert(
                (term, print),
                ProcessRecord {
                    number: print.into(),
                    term: Some(term),
                    title: format!("druk {print}"),
                    rcl_num: key.map(str::to_string),
                    ..Default::default()
                },
            );
            self
        }

        pub fn failing_detail(mut self, term: u32, print: &'static str) -> Self {
            self.candidates.entry(term).or_default().push(print);
            self.failing.push(print);
            self
        }

        pub fn failing_search(mut self, term: u32) -> Self {
            self.failing_terms.push(term);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ParliamentRegistry for FakeRegistry {
        async fn search_candidates(
            &self,
            query: &str,
            term: u32,
            limit: usize,
        ) -> Result<Vec<ProcessSummary>, FetchError> {
            self.record(format!("search:{term}:{query}"));
            if self.failing_terms.contains(&term) {
                return Err(FetchError::Server {
                    status: 500,
                    body: "search unavailable".into(),
                });
            }
            Ok(self
                .candidates
                .get(&term)
                .into_iter()
                .flatten()
                .take(limit)
                .map(|print| ProcessSummary {
                    number: print.to_string(),
                    term: Some(term),
                    ..Default::default()
                })
                .collect())
        }

        async fn fetch_process_detail(
            &self,
            print_key: &str,
            term: u32,
        ) -> Result<ProcessRecord, FetchError> {
            self.record(format!("detail:{term}:{print_key}"));
            if self.failing.iter().any(|p| *p == print_key) {
                return Err(FetchError::Server {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.details
                .iter()
                .find(|((t, p), _)| *t == term && *p == print_key)
                .map(|(_, d)| d.clone())
                .ok_or(FetchError::Server {
                    status: 404,
                    body: "no such process".into(),
                })
        }
    }

    pub(crate) fn record(id: &str, url: Option<&str>, title: &str) -> SourceRecord {
        SourceRecord {
            id: id.into(),
            title: title.into(),
            parliament_url: url.map(str::to_string),
            ..Default::default()
        }
    }

    const KEY: &str = "RM-0610-136-25";
    const URL: &str = "https://legislacja.gov.pl/projekt/12345?Id=RM-0610-136-25";
    const TITLE: &str = "Projekt ustawy o zmianie ustawy o podatku dochodowym od osób fizycznych";

    fn linker(registry: &Arc<FakeRegistry>) -> Linker {
        Linker::new(registry.clone(), &PipelineConfig::default())
    }

    #[tokio::test]
    async fn no_key_means_no_network() {
        let registry = Arc::new(FakeRegistry::default().with_process(10, "1", Some(KEY)));
        let mut linker = linker(&registry);
        for url in [None, Some(""), Some("https://legislacja.gov.pl/projekt/12345")] {
            let result = linker.link(record("12345", url, TITLE)).await;
            assert_eq!(result.method, LinkMethod::None);
            assert!(result.process.is_none());
        }
        assert!(registry.calls().is_empty());
    }

    #[tokio::test]
    async fn failing_candidate_is_skipped() {
        let registry = Arc::new(
            FakeRegistry::default()
                .failing_detail(10, "1600")
                .with_process(10, "1604", Some(KEY)),
        );
        let mut linker = linker(&registry);
        let result = linker.link(record("12345", Some(URL), TITLE)).await;
        assert_eq!(result.method, LinkMethod::ExactVerified);
        assert_eq!(result.print_key.as_deref(), Some("1604"));
        assert_eq!(result.term, Some(10));
        assert_eq!(
            result.process.as_ref().and_then(|p| p.rcl_num.as_deref()),
            Some(KEY)
        );
        assert_eq!(
            registry.calls(),
            vec![
                "search:10:o podatku dochodowym",
                "detail:10:1600",
                "detail:10:1604"
            ]
        );
    }

    #[tokio::test]
    async fn older_term_searched_after_mismatch() {
        let registry = Arc::new(
            FakeRegistry::default()
                .with_process(10, "200", Some("RM-0000-1-25"))
                .with_process(9, "3900", Some(KEY)),
        );
        let mut linker = linker(&registry);
        let result = linker.link(record("12345", Some(URL), TITLE)).await;
        assert_eq!(result.method, LinkMethod::ExactVerified);
        assert_eq!(result.term, Some(9));
        assert_eq!(result.print_key.as_deref(), Some("3900"));
    }

    #[tokio::test]
    async fn failed_term_search_falls_through_to_older_term() {
        let registry = Arc::new(
            FakeRegistry::default()
                .with_process(10, "1604", Some(KEY))
                .failing_search(10)
                .with_process(9, "3900", Some(KEY)),
        );
        let mut linker = linker(&registry);
        let result = linker.link(record("12345", Some(URL), TITLE)).await;
        assert_eq!(result.method, LinkMethod::ExactVerified);
        assert_eq!(result.term, Some(9));
        assert_eq!(result.print_key.as_deref(), Some("3900"));
        assert_eq!(
            registry.calls(),
            vec![
                "search:10:o podatku dochodowym",
                "search:9:o podatku dochodowym",
                "detail:9:3900"
            ]
        );
    }

    #[tokio::test]
    async fn failed_searches_everywhere_is_not_found() {
        let registry = Arc::new(
            FakeRegistry::default()
                .failing_search(10)
                .failing_search(9)
                .failing_search(8),
        );
        let mut linker = linker(&registry);
        let result = linker.link(record("12345", Some(URL), TITLE)).await;
        assert_eq!(result.method, LinkMethod::NotFound);
        assert_eq!(result.cross_reference, KEY);
    }

    #[tokio::test]
    async fn verified_match_served_from_cache() {
        let registry = Arc::new(FakeRegistry::default().with_process(10, "1604", Some(KEY)));
        let mut linker = linker(&registry);
        let first = linker.link(record("12345", Some(URL), TITLE)).await;
        let calls_after_first = registry.calls().len();
        let second = linker
            .link(record("12346", Some(URL), "Zupełnie inny tytuł projektu"))
            .await;
        assert_eq!(second.method, LinkMethod::ExactVerified);
        assert_eq!(second.process, first.process);
        assert_eq!(registry.calls().len(), calls_after_first);
        assert!(linker.cache().contains(KEY));

        linker.begin_run();
        assert!(linker.cache().is_empty());
    }

    #[tokio::test]
    async fn independent_caches_per_linker() {
        let registry = Arc::new(FakeRegistry::default().with_process(10, "1604", Some(KEY)));
        let mut a = linker(&registry);
        let b = linker(&registry);
        a.link(record("12345", Some(URL), TITLE)).await;
        assert_eq!(a.cache().len(), 1);
        assert!(b.cache().is_empty());
    }

    #[tokio::test]
    async fn unverified_title_hit_is_fuzzy() {
        let registry = Arc::new(
            FakeRegistry::default()
                .failing_detail(10, "1")
                .with_process(10, "2", None)
                .with_process(10, "3", Some("RM-9999-9-99")),
        );
        let mut linker = linker(&registry);
        let result = linker.link(record("12345", Some(URL), TITLE)).await;
        assert_eq!(result.method, LinkMethod::TitleFuzzy);
        assert_eq!(result.print_key.as_deref(), Some("2"));
        assert_eq!(result.cross_reference, KEY);
        assert!(!linker.cache().contains(KEY));
    }

    #[tokio::test]
    async fn nothing_found_keeps_key() {
        let registry = Arc::new(FakeRegistry::default());
        let mut linker = linker(&registry);
        let result = linker.link(record("12345", Some(URL), TITLE)).await;
        assert_eq!(result.method, LinkMethod::NotFound);
        assert_eq!(result.cross_reference, KEY);
        assert!(result.process.is_none());
        // Verified pass plus fuzzy pass, both terms each.
        assert_eq!(registry.calls().len(), 4);
    }

    #[tokio::test]
    async fn verified_links_carry_matching_key() {
        let registry = Arc::new(
            FakeRegistry::default()
                .with_process(10, "10", Some("RM-0000-1-25"))
                .with_process(10, "11", Some(KEY))
                .with_process(9, "12", Some("RM-0610-2-24")),
        );
        let mut linker = linker(&registry);
        let records = vec![
            record("1", Some(URL), TITLE),
            record("2", Some("?Id=RM-0610-2-24"), TITLE),
            record("3", None, TITLE),
            record("4", Some("?Id=RM-0000-1-25"), TITLE),
        ];
        let results = linker.link_all(records).await;
        assert_eq!(
            results.iter().map(|r| r.record.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "2", "3", "4"]
        );
        for result in results
            .iter()
            .filter(|r| r.method == LinkMethod::ExactVerified)
        {
            let process = result.process.as_ref().unwrap();
            assert_eq!(process.rcl_num.as_deref(), Some(result.cross_reference.as_str()));
        }
        assert_eq!(results[2].method, LinkMethod::None);
    }
}
