// src/resolution/orchestrator.rs
//! Drives every source record through the geographic tiers and the matching
//! steps, persisting snapshots as it goes.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::time::Instant;

use super::cascade::{GeoKey, GeoTier, MatchStep};
use super::records::{render_snapshot, restore_previous, RestoreStatus};
use super::trace::{RecordTrace, TierTrace};
use crate::matching::fuzzy::FuzzyScorer;
use crate::matching::geo_index::GeographicIndex;
use crate::matching::text::detect_establishment_type;
use crate::matching::token::{matched_text, required_tokens, TokenMatcher, TokenPass};
use crate::models::{
    distinct_identifiers, Candidate, CandidateSet, EstablishmentType, ResolutionOutcome,
    ResolutionStage, RunSummary, SourceRecord,
};
use crate::oracle::{OracleAdapter, OracleVerdict};
use crate::storage::checkpoint::CheckpointStore;
use crate::storage::table::Table;
use crate::utils::columns::OutputColumns;
use crate::utils::constants::{
    SINGLE_CANDIDATE_CONFIDENCE, TOKEN_ALL_CONFIDENCE, TOKEN_ANY_CONFIDENCE,
};
use crate::utils::engine_config::{EngineConfig, ResumeMode};
use crate::utils::progress_bars::logging::{PipelineComponent, ResolutionLogger};

/// Per-record inputs shared by every tier.
struct Query {
    name: String,
    tokens: Vec<String>,
    type_hint: EstablishmentType,
}

enum StepFlow {
    Decided(ResolutionOutcome),
    Continue,
}

pub struct Resolver<'a> {
    config: &'a EngineConfig,
    index: &'a GeographicIndex,
    token_matcher: TokenMatcher,
    fuzzy: FuzzyScorer,
    oracle: Option<OracleAdapter>,
    logger: ResolutionLogger,
    progress: Option<ProgressBar>,
    show_stage_counts: bool,
    traces: Vec<RecordTrace>,
}

impl<'a> Resolver<'a> {
    /// Without an oracle, contested candidates end up ambiguous.
    pub fn new(config: &'a EngineConfig, index: &'a GeographicIndex, oracle: Option<OracleAdapter>) -> Self {
        Self {
            config,
            index,
            token_matcher: TokenMatcher::new(config.disambiguate_all_pass),
            fuzzy: FuzzyScorer::new(config.strictness),
            oracle,
            logger: ResolutionLogger::new(PipelineComponent::Resolver),
            progress: None,
            show_stage_counts: false,
            traces: Vec::new(),
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressBar>, show_stage_counts: bool) -> Self {
        self.progress = progress;
        self.show_stage_counts = show_stage_counts;
        self
    }

    pub fn oracle_calls(&self) -> usize {
        self.oracle.as_ref().map(OracleAdapter::calls).unwrap_or(0)
    }

    /// Decision traces collected so far; empty unless tracing is enabled.
    pub fn take_traces(&mut self) -> Vec<RecordTrace> {
        std::mem::take(&mut self.traces)
    }

    /// Resolves one record, widening the geographic scope until a tier
    /// reaches a definitive outcome. Returns the outcome and the tier that
    /// produced it.
    pub async fn resolve_record(&mut self, record: &SourceRecord) -> (ResolutionOutcome, Option<GeoTier>) {
        let key = GeoKey::for_record(record);
        let query = Query {
            name: record.name.trim().to_string(),
            tokens: required_tokens(&record.name),
            type_hint: self.config.type_hint_for(&record.name),
        };
        let mut trace = RecordTrace {
            row: record.row_index,
            name: record.name.clone(),
            locality: key.locality.clone(),
            division: key.division.clone(),
            required_tokens: query.tokens.clone(),
            type_hint: query.type_hint,
            tiers: Vec::new(),
            outcome: None,
        };

        let (outcome, decided_by) = if query.name.is_empty() {
            (ResolutionOutcome::Unresolved, None)
        } else {
            self.run_cascade(&query, &key, &mut trace).await
        };

        if self.config.trace_enabled {
            trace.outcome = Some(outcome.clone());
            self.traces.push(trace);
        }
        (outcome, decided_by)
    }

    async fn run_cascade(
        &mut self,
        query: &Query,
        key: &GeoKey,
        trace: &mut RecordTrace,
    ) -> (ResolutionOutcome, Option<GeoTier>) {
        let mut previous_scope: Option<Vec<String>> = None;
        for tier in GeoTier::CASCADE {
            let Some(candidates) = tier.candidates(self.index, key) else {
                continue;
            };
            if candidates.is_empty() {
                continue;
            }
            let scope: Vec<String> = candidates.iter().map(|c| c.identifier.clone()).collect();
            if previous_scope.as_ref() == Some(&scope) {
                self.logger.log_debug(&format!(
                    "'{}': tier {} holds the same candidates as the previous one, skipped",
                    query.name,
                    tier.label()
                ));
                continue;
            }
            previous_scope = Some(scope);

            let mut tier_trace = TierTrace::new(tier, candidates.len());
            let outcome = self.resolve_in_tier(query, candidates, &mut tier_trace).await;
            trace.tiers.push(tier_trace);
            if outcome.is_definitive() {
                return (outcome, Some(tier));
            }
        }
        (ResolutionOutcome::Unresolved, None)
    }

    /// Runs the matching steps over one tier's candidates.
    async fn resolve_in_tier(
        &mut self,
        query: &Query,
        candidates: CandidateSet,
        trace: &mut TierTrace,
    ) -> ResolutionOutcome {
        let mut pool = self.narrow_to_type(query.type_hint, candidates, trace);
        let mut contested: Option<Vec<String>> = None;

        for step in MatchStep::PIPELINE {
            let flow = match step {
                MatchStep::SingleCandidate => single_candidate_step(&pool),
                MatchStep::Tokens => self.token_step(query, &mut pool, &mut contested, trace),
                MatchStep::Fuzzy => self.fuzzy_step(query, &pool, trace),
                MatchStep::Oracle => self.oracle_step(query, &pool, contested.is_some(), trace).await,
            };
            if let StepFlow::Decided(outcome) = flow {
                trace.outcome = outcome.stage_label();
                return outcome;
            }
        }

        let outcome = match contested {
            Some(candidates) => ResolutionOutcome::Ambiguous { candidates },
            None => ResolutionOutcome::Unresolved,
        };
        trace.outcome = outcome.stage_label();
        outcome
    }

    /// Keeps only candidates of the hinted type, unless none would remain.
    fn narrow_to_type(
        &self,
        type_hint: EstablishmentType,
        candidates: CandidateSet,
        trace: &mut TierTrace,
    ) -> CandidateSet {
        if !self.config.differentiate_types || type_hint == EstablishmentType::Unknown {
            return candidates;
        }
        let same_type: CandidateSet = candidates
            .iter()
            .filter(|c| detect_establishment_type(&c.name) == type_hint)
            .cloned()
            .collect();
        if same_type.is_empty() || same_type.len() == candidates.len() {
            return candidates;
        }
        trace.narrowed_to_type = Some(same_type.len());
        same_type
    }

    fn token_step(
        &self,
        query: &Query,
        pool: &mut CandidateSet,
        contested: &mut Option<Vec<String>>,
        trace: &mut TierTrace,
    ) -> StepFlow {
        let Some(found) = self.token_matcher.match_candidates(pool, &query.tokens) else {
            return StepFlow::Continue;
        };
        trace.tokens = Some(found.clone());

        if found.is_unique() {
            let candidate = &pool[found.indices[0]];
            let (confidence, stage) = match found.pass {
                TokenPass::All => (TOKEN_ALL_CONFIDENCE, ResolutionStage::TokenAll),
                TokenPass::Any => (TOKEN_ANY_CONFIDENCE, ResolutionStage::TokenAny),
            };
            return StepFlow::Decided(ResolutionOutcome::resolved(
                &candidate.identifier,
                matched_text(candidate, found.field),
                confidence,
                stage,
            ));
        }

        // Several establishments share the tokens: later steps only look at them.
        let survivors: CandidateSet = found.indices.iter().map(|&i| pool[i].clone()).collect();
        *pool = survivors;
        *contested = Some(found.identifiers);
        StepFlow::Continue
    }

    fn fuzzy_step(&self, query: &Query, pool: &[Candidate], trace: &mut TierTrace) -> StepFlow {
        let Some(best) = self.fuzzy.best_match(&query.name, pool) else {
            return StepFlow::Continue;
        };
        trace.fuzzy = Some(best);
        if !self.fuzzy.accepts(best.score) {
            return StepFlow::Continue;
        }
        let candidate = &pool[best.index];
        StepFlow::Decided(ResolutionOutcome::resolved(
            &candidate.identifier,
            &candidate.name,
            best.score,
            ResolutionStage::Fuzzy,
        ))
    }

    async fn oracle_step(
        &mut self,
        query: &Query,
        pool: &[Candidate],
        contested: bool,
        trace: &mut TierTrace,
    ) -> StepFlow {
        let Some(oracle) = self.oracle.as_mut() else {
            return StepFlow::Continue;
        };
        let options = unique_by_identifier(pool);
        let verdict = oracle
            .choose_candidate(&query.name, &options, query.type_hint)
            .await;
        trace.oracle = Some(verdict.clone());

        match verdict {
            OracleVerdict::Accepted { index, confidence }
            | OracleVerdict::Degraded {
                index, confidence, ..
            } => {
                let candidate = &options[index];
                StepFlow::Decided(ResolutionOutcome::resolved(
                    &candidate.identifier,
                    &candidate.name,
                    confidence,
                    ResolutionStage::Ai,
                ))
            }
            OracleVerdict::Rejected => {
                if contested {
                    self.logger.log_debug(&format!(
                        "'{}': oracle rejected all {} contested candidates",
                        query.name,
                        options.len()
                    ));
                }
                StepFlow::Decided(ResolutionOutcome::Unresolved)
            }
        }
    }

    /// Resolves every pending record, checkpointing every
    /// `checkpoint_interval` processed records and once more at the end.
    ///
    /// Records restored from a previous snapshot are left untouched. A
    /// failed intermediate checkpoint is only a warning; a failed final
    /// write is an error.
    pub async fn run(
        &mut self,
        run_id: &str,
        source: &Table,
        records: &mut [SourceRecord],
        output: &OutputColumns,
        store: &mut dyn CheckpointStore,
    ) -> Result<RunSummary> {
        let started = Instant::now();
        let checkpoint_logger = ResolutionLogger::new(PipelineComponent::Checkpoint);
        let mut summary = RunSummary::new(run_id, records.len());

        match self.config.resume_mode {
            ResumeMode::Restart => {
                records.iter_mut().for_each(SourceRecord::clear_outcome);
                checkpoint_logger.log_phase("Restart", Some("previous results are ignored"));
            }
            ResumeMode::Resume => match store.load() {
                Ok(Some(previous)) => match restore_previous(records, &previous, source, output) {
                    RestoreStatus::Restored(count) => {
                        checkpoint_logger.log_debug(&format!("{} rows restored", count));
                    }
                    RestoreStatus::Incompatible(reason) => {
                        checkpoint_logger.log_warning(&format!(
                            "Previous results do not match this roster ({}); starting fresh",
                            reason
                        ));
                        records.iter_mut().for_each(SourceRecord::clear_outcome);
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    checkpoint_logger.log_warning(&format!(
                        "Could not read previous results ({:#}); starting fresh",
                        e
                    ));
                }
            },
        }

        let pending: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.is_resolved())
            .map(|(position, _)| position)
            .collect();
        summary.skipped_existing = records.len() - pending.len();
        checkpoint_logger.log_resume(summary.skipped_existing, records.len());
        self.logger.log_start(run_id, pending.len(), self.oracle.is_some());
        if let Some(pb) = &self.progress {
            pb.set_length(pending.len() as u64);
        }

        for (done, &position) in pending.iter().enumerate() {
            let (outcome, tier) = self.resolve_record(&records[position]).await;
            let record = &mut records[position];
            self.logger
                .log_record_outcome(record.row_index, &record.name, &outcome, tier.map(|t| t.label()));
            summary.record_outcome(&outcome, tier.map(|t| t.label()));
            record.outcome = Some(outcome);

            let processed = done + 1;
            if let Some(pb) = &self.progress {
                pb.inc(1);
                if self.show_stage_counts {
                    pb.set_message(format!(
                        "✅ {} 🤷 {} ❔ {}",
                        summary.resolved, summary.ambiguous, summary.unresolved
                    ));
                }
            }
            self.logger.log_progress_update(processed, pending.len(), None);

            if processed % self.config.checkpoint_interval == 0 {
                let snapshot = render_snapshot(source, records, output);
                match store.save(&snapshot) {
                    Ok(()) => {
                        summary.checkpoints_written += 1;
                        checkpoint_logger.log_checkpoint(processed);
                    }
                    Err(e) => {
                        summary.checkpoint_failures += 1;
                        checkpoint_logger
                            .log_warning(&format!("Checkpoint failed, continuing: {:#}", e));
                    }
                }
            }
        }

        let snapshot = render_snapshot(source, records, output);
        store
            .save(&snapshot)
            .context("Failed to write the final results")?;
        summary.checkpoints_written += 1;

        summary.oracle_calls = self.oracle_calls();
        summary.elapsed_secs = started.elapsed().as_secs_f64();
        if let Some(pb) = &self.progress {
            pb.finish_with_message(format!("{} resolved", summary.resolved));
        }
        self.logger.log_summary(&summary);
        Ok(summary)
    }
}

fn single_candidate_step(pool: &[Candidate]) -> StepFlow {
    match pool.first() {
        Some(first) if distinct_identifiers(pool).len() == 1 => StepFlow::Decided(ResolutionOutcome::resolved(
            &first.identifier,
            &first.name,
            SINGLE_CANDIDATE_CONFIDENCE,
            ResolutionStage::SingleCandidate,
        )),
        _ => StepFlow::Continue,
    }
}

/// First candidate of each identifier, in order.
fn unique_by_identifier(pool: &[Candidate]) -> CandidateSet {
    let mut seen = Vec::new();
    pool.iter()
        .filter(|c| {
            if seen.contains(&c.identifier) {
                false
            } else {
                seen.push(c.identifier.clone());
                true
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceRecord;
    use crate::oracle::adapter::tests::ScriptedOracle;
    use crate::oracle::RateLimiter;
    use anyhow::bail;
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryStore {
        previous: Option<Table>,
        saved: Vec<Table>,
        failing_saves: usize,
    }

    impl CheckpointStore for MemoryStore {
        fn load(&self) -> Result<Option<Table>> {
            Ok(self.previous.clone())
        }

        fn save(&mut self, snapshot: &Table) -> Result<()> {
            if self.failing_saves > 0 {
                self.failing_saves -= 1;
                bail!("disk full");
            }
            self.saved.push(snapshot.clone());
            Ok(())
        }
    }

    fn reference(name: &str, secondary: Option<&str>, locality: &str, id: &str) -> ReferenceRecord {
        ReferenceRecord {
            name: name.to_string(),
            secondary_name: secondary.map(str::to_string),
            locality: locality.to_string(),
            division: None,
            identifier: id.to_string(),
        }
    }

    fn registry() -> GeographicIndex {
        let refs = vec![
            reference("CH SAINT LOUIS", None, "75010 PARIS CEDEX", "750000001"),
            reference("CLINIQUE MONCEAU", None, "75008 PARIS", "750000002"),
            reference("CLINIQUE DU PARC", None, "33000 BORDEAUX", "330000001"),
            reference("POLYCLINIQUE BORDEAUX NORD", None, "33300 BORDEAUX", "330000002"),
            reference("CH DE DAX", None, "40100 DAX", "400000001"),
        ];
        GeographicIndex::build(&refs)
    }

    fn oracle(replies: Vec<Result<&str, &str>>) -> (ScriptedOracle, OracleAdapter) {
        let scripted = ScriptedOracle::new(replies);
        let adapter = OracleAdapter::new(
            Box::new(scripted.clone()),
            RateLimiter::new(50, Duration::from_secs(60)),
            false,
        );
        (scripted, adapter)
    }

    fn record(row: usize, name: &str, locality: &str, division: Option<&str>) -> SourceRecord {
        SourceRecord::new(row, name, locality, division.map(str::to_string))
    }

    fn roster(records: &[SourceRecord]) -> Table {
        let mut table = Table::new(vec!["Nom".to_string(), "Ville".to_string()]);
        for r in records {
            table.push_row(vec![r.name.clone(), r.locality.clone()]);
        }
        table
    }

    #[tokio::test]
    async fn test_token_all_picks_the_named_hospital() {
        let config = EngineConfig::default();
        let index = registry();
        let mut resolver = Resolver::new(&config, &index, None);

        let (outcome, tier) = resolver
            .resolve_record(&record(0, "Centre Hospitalier St Louis", "Paris", Some("75")))
            .await;
        assert_eq!(
            outcome,
            ResolutionOutcome::resolved("750000001", "CH SAINT LOUIS", 90, ResolutionStage::TokenAll)
        );
        assert_eq!(tier, Some(GeoTier::DivisionAndLocality));
    }

    #[tokio::test]
    async fn test_single_candidate_in_the_tightest_tier() {
        let config = EngineConfig::default();
        let index = registry();
        let mut resolver = Resolver::new(&config, &index, None);

        let (outcome, tier) = resolver
            .resolve_record(&record(0, "Hôpital de Dax", "Dax", Some("40")))
            .await;
        assert_eq!(
            outcome,
            ResolutionOutcome::resolved("400000001", "CH DE DAX", 95, ResolutionStage::SingleCandidate)
        );
        assert_eq!(tier, Some(GeoTier::DivisionAndLocality));
    }

    #[tokio::test]
    async fn test_secondary_name_separates_clinics() {
        let refs = vec![
            reference("CLINIQUE BORDEAUX NORD", Some("LES CEDRES"), "33300 BORDEAUX", "330000010"),
            reference("CLINIQUE SAINT AUGUSTIN", Some("POLE SANTE"), "33000 BORDEAUX", "330000011"),
        ];
        let index = GeographicIndex::build(&refs);
        let config = EngineConfig::default();
        let mut resolver = Resolver::new(&config, &index, None);

        let (outcome, _) = resolver
            .resolve_record(&record(0, "Clinique des Cèdres", "Bordeaux", Some("33")))
            .await;
        assert_eq!(
            outcome,
            ResolutionOutcome::resolved("330000010", "LES CEDRES", 75, ResolutionStage::TokenAny)
        );
    }

    #[tokio::test]
    async fn test_contested_candidates_go_to_the_oracle() {
        let config = EngineConfig::default();
        let index = registry();
        let (scripted, adapter) = oracle(vec![Ok("1;80")]);
        let mut resolver = Resolver::new(&config, &index, Some(adapter));

        let (outcome, tier) = resolver
            .resolve_record(&record(0, "Polyclinique du Parc", "Bordeaux", Some("33")))
            .await;
        assert_eq!(
            outcome,
            ResolutionOutcome::resolved("330000001", "CLINIQUE DU PARC", 80, ResolutionStage::Ai)
        );
        assert_eq!(tier, Some(GeoTier::DivisionAndLocality));
        assert_eq!(scripted.prompt_count(), 1);
        assert!(scripted.prompts.lock().unwrap()[0].contains("POLYCLINIQUE BORDEAUX NORD"));
    }

    #[tokio::test]
    async fn test_contested_candidates_without_oracle_are_ambiguous() {
        let config = EngineConfig::default();
        let index = registry();
        let mut resolver = Resolver::new(&config, &index, None);

        let (outcome, _) = resolver
            .resolve_record(&record(0, "Polyclinique du Parc", "Bordeaux", Some("33")))
            .await;
        assert_eq!(
            outcome,
            ResolutionOutcome::Ambiguous {
                candidates: vec!["330000001".to_string(), "330000002".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_rejection_widens_to_the_next_tier() {
        let refs = vec![
            reference("CLINIQUE DU PARC", None, "33000 BORDEAUX", "330000001"),
            reference("POLYCLINIQUE BORDEAUX NORD", None, "33300 BORDEAUX", "330000002"),
            reference("POLYCLINIQUE DU PARC", None, "33700 MERIGNAC", "330000003"),
        ];
        let index = GeographicIndex::build(&refs);
        let config = EngineConfig::default();
        let (scripted, adapter) = oracle(vec![Ok("0")]);
        let mut resolver = Resolver::new(&config, &index, Some(adapter));

        let (outcome, tier) = resolver
            .resolve_record(&record(0, "Polyclinique du Parc", "Bordeaux", Some("33")))
            .await;
        assert_eq!(
            outcome,
            ResolutionOutcome::resolved("330000003", "POLYCLINIQUE DU PARC", 90, ResolutionStage::TokenAll)
        );
        assert_eq!(tier, Some(GeoTier::Division));
        assert_eq!(scripted.prompt_count(), 1);
    }

    #[tokio::test]
    async fn test_identical_tiers_are_not_asked_twice() {
        let config = EngineConfig::default();
        let index = registry();
        let (scripted, adapter) = oracle(vec![Ok("0"), Ok("0"), Ok("0")]);
        let mut resolver = Resolver::new(&config, &index, Some(adapter));

        let (outcome, tier) = resolver
            .resolve_record(&record(0, "Polyclinique du Parc", "Bordeaux", Some("33")))
            .await;
        assert_eq!(outcome, ResolutionOutcome::Unresolved);
        assert_eq!(tier, None);
        assert_eq!(scripted.prompt_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_geography_is_unresolved_without_oracle_calls() {
        let config = EngineConfig::default();
        let index = registry();
        let (scripted, adapter) = oracle(vec![Ok("1;90")]);
        let mut resolver = Resolver::new(&config, &index, Some(adapter));

        let (outcome, _) = resolver
            .resolve_record(&record(0, "Hôpital Nord", "Marseille", Some("13")))
            .await;
        assert_eq!(outcome, ResolutionOutcome::Unresolved);

        let (outcome, _) = resolver.resolve_record(&record(1, "  ", "Paris", Some("75"))).await;
        assert_eq!(outcome, ResolutionOutcome::Unresolved);
        assert_eq!(scripted.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_type_hint_narrows_the_pool() {
        let refs = vec![
            reference("CH DE NANTES", None, "44000 NANTES", "440000001"),
            reference("CLINIQUE JULES VERNE", None, "44300 NANTES", "440000002"),
        ];
        let index = GeographicIndex::build(&refs);
        let config = EngineConfig {
            differentiate_types: true,
            trace_enabled: true,
            ..EngineConfig::default()
        };
        let mut resolver = Resolver::new(&config, &index, None);

        let (outcome, _) = resolver
            .resolve_record(&record(4, "Hôpital", "Nantes", Some("44")))
            .await;
        assert_eq!(outcome.identifier(), Some("440000001"));
        assert_eq!(outcome.stage_label(), "single-candidate");

        let traces = resolver.take_traces();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].row, 4);
        assert_eq!(traces[0].tiers[0].narrowed_to_type, Some(1));
        assert!(resolver.take_traces().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oracle_calls_respect_the_window() {
        let index = registry();
        let config = EngineConfig::default();
        let scripted = ScriptedOracle::new(vec![Ok("2;70"); 11]);
        let adapter = OracleAdapter::new(
            Box::new(scripted.clone()),
            RateLimiter::new(10, Duration::from_secs(60)),
            false,
        );
        let mut resolver = Resolver::new(&config, &index, Some(adapter));

        let start = tokio::time::Instant::now();
        for row in 0..11 {
            let (outcome, _) = resolver
                .resolve_record(&record(row, "Polyclinique du Parc", "Bordeaux", Some("33")))
                .await;
            assert_eq!(outcome.identifier(), Some("330000002"));
        }
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(resolver.oracle_calls(), 11);
    }

    #[tokio::test]
    async fn test_run_checkpoints_and_writes_final_snapshot() {
        let index = registry();
        let config = EngineConfig {
            checkpoint_interval: 2,
            ..EngineConfig::default()
        };
        let mut records = vec![
            record(0, "Centre Hospitalier St Louis", "Paris", Some("75")),
            record(1, "Polyclinique du Parc", "Bordeaux", Some("33")),
            record(2, "Hôpital de Dax", "Dax", Some("40")),
            record(3, "", "Lyon", Some("69")),
            record(4, "Clinique Monceau", "Paris", Some("75")),
        ];
        let source = roster(&records);
        let output = OutputColumns::default();
        let mut store = MemoryStore::default();
        let mut resolver = Resolver::new(&config, &index, None);

        let summary = resolver
            .run("run-1", &source, &mut records, &output, &mut store)
            .await
            .unwrap();
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.resolved, 3);
        assert_eq!(summary.ambiguous, 1);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.checkpoints_written, 3);
        assert_eq!(store.saved.len(), 3);

        let last = store.saved.last().unwrap();
        assert_eq!(last.value(0, "FINESS"), Some("750000001"));
        assert_eq!(last.value(1, "Source_Match"), Some("ambiguous"));
        assert_eq!(last.value(1, "Candidats_Match"), Some("330000001|330000002"));
        assert_eq!(last.value(3, "Source_Match"), Some("none"));
        // The first checkpoint only carries the first two records.
        assert_eq!(store.saved[0].value(2, "FINESS"), None);
        assert!(records.iter().all(|r| r.outcome.is_some()));
    }

    #[tokio::test]
    async fn test_resume_skips_identified_rows() {
        let index = registry();
        let config = EngineConfig::default();
        let output = OutputColumns::default();
        let mut records: Vec<SourceRecord> = (0..25)
            .map(|row| record(row, "Hôpital de Dax", "Dax", Some("40")))
            .collect();
        let source = roster(&records);

        // Snapshot of an interrupted run: twenty rows identified.
        let mut interrupted = records.clone();
        for r in interrupted.iter_mut().take(20) {
            r.outcome = Some(ResolutionOutcome::resolved("999999999", "EARLIER MATCH", 88, ResolutionStage::Fuzzy));
        }
        let mut store = MemoryStore {
            previous: Some(render_snapshot(&source, &interrupted, &output)),
            ..MemoryStore::default()
        };
        let mut resolver = Resolver::new(&config, &index, None);

        let summary = resolver
            .run("run-2", &source, &mut records, &output, &mut store)
            .await
            .unwrap();
        assert_eq!(summary.skipped_existing, 20);
        assert_eq!(summary.processed, 5);
        let last = store.saved.last().unwrap();
        assert_eq!(last.value(0, "FINESS"), Some("999999999"));
        assert_eq!(last.value(19, "Source_Match"), Some("fuzzy"));
        assert_eq!(last.value(24, "FINESS"), Some("400000001"));
    }

    #[tokio::test]
    async fn test_resume_never_asks_the_oracle_about_restored_rows() {
        let index = registry();
        let config = EngineConfig::default();
        let output = OutputColumns::default();
        let contested = |row| record(row, "Polyclinique du Parc", "Bordeaux", Some("33"));
        let mut records: Vec<SourceRecord> = (0..4).map(contested).collect();
        let source = roster(&records);
        let mut finished = records.clone();
        for r in finished.iter_mut() {
            r.outcome = Some(ResolutionOutcome::resolved("330000001", "CLINIQUE DU PARC", 80, ResolutionStage::Ai));
        }

        let (scripted, adapter) = oracle(vec![]);
        let mut store = MemoryStore {
            previous: Some(render_snapshot(&source, &finished, &output)),
            ..MemoryStore::default()
        };
        let mut resolver = Resolver::new(&config, &index, Some(adapter));
        let summary = resolver
            .run("run-6", &source, &mut records, &output, &mut store)
            .await
            .unwrap();
        assert_eq!(summary.skipped_existing, 4);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.oracle_calls, 0);
        assert_eq!(scripted.prompt_count(), 0);

        // One row left open by the earlier run: exactly one question.
        finished[2].outcome = None;
        let mut records: Vec<SourceRecord> = (0..4).map(contested).collect();
        let (scripted, adapter) = oracle(vec![Ok("2;70")]);
        let mut store = MemoryStore {
            previous: Some(render_snapshot(&source, &finished, &output)),
            ..MemoryStore::default()
        };
        let mut resolver = Resolver::new(&config, &index, Some(adapter));
        let summary = resolver
            .run("run-7", &source, &mut records, &output, &mut store)
            .await
            .unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(scripted.prompt_count(), 1);
        assert_eq!(records[2].identifier(), Some("330000002"));
        for row in [0, 1, 3] {
            assert_eq!(records[row].identifier(), Some("330000001"));
        }
        let last = store.saved.last().unwrap();
        assert_eq!(last.value(0, "Confiance_Match"), Some("80"));
        assert_eq!(last.value(2, "Confiance_Match"), Some("70"));
    }

    #[tokio::test]
    async fn test_resume_ignores_output_of_another_roster() {
        let index = registry();
        let config = EngineConfig::default();
        let output = OutputColumns::default();
        let mut earlier = vec![
            record(0, "Clinique Monceau", "Paris", Some("75")),
            record(1, "Centre Hospitalier St Louis", "Paris", Some("75")),
        ];
        earlier[0].outcome = Some(ResolutionOutcome::resolved("750000002", "CLINIQUE MONCEAU", 90, ResolutionStage::TokenAll));
        earlier[1].outcome = Some(ResolutionOutcome::resolved("750000001", "CH SAINT LOUIS", 90, ResolutionStage::TokenAll));
        let mut store = MemoryStore {
            previous: Some(render_snapshot(&roster(&earlier), &earlier, &output)),
            ..MemoryStore::default()
        };

        let mut records = vec![
            record(0, "Hôpital de Dax", "Dax", Some("40")),
            record(1, "Clinique Monceau", "Paris", Some("75")),
        ];
        let source = roster(&records);
        let mut resolver = Resolver::new(&config, &index, None);
        let summary = resolver
            .run("run-8", &source, &mut records, &output, &mut store)
            .await
            .unwrap();
        assert_eq!(summary.skipped_existing, 0);
        assert_eq!(records[0].identifier(), Some("400000001"));
        assert_eq!(records[1].identifier(), Some("750000002"));
    }

    #[tokio::test]
    async fn test_restart_ignores_previous_results() {
        let index = registry();
        let config = EngineConfig {
            resume_mode: ResumeMode::Restart,
            ..EngineConfig::default()
        };
        let output = OutputColumns::default();
        let mut records = vec![record(0, "Hôpital de Dax", "Dax", Some("40"))];
        records[0].outcome = Some(ResolutionOutcome::resolved("999999999", "OLD", 88, ResolutionStage::Fuzzy));
        let source = roster(&records);
        let mut store = MemoryStore::default();
        let mut resolver = Resolver::new(&config, &index, None);

        let summary = resolver
            .run("run-3", &source, &mut records, &output, &mut store)
            .await
            .unwrap();
        assert_eq!(summary.skipped_existing, 0);
        assert_eq!(records[0].identifier(), Some("400000001"));
    }

    #[tokio::test]
    async fn test_failed_checkpoint_is_not_fatal_but_final_write_is() {
        let index = registry();
        let config = EngineConfig {
            checkpoint_interval: 1,
            ..EngineConfig::default()
        };
        let output = OutputColumns::default();
        let mut records = vec![
            record(0, "Hôpital de Dax", "Dax", Some("40")),
            record(1, "Clinique Monceau", "Paris", Some("75")),
        ];
        let source = roster(&records);

        let mut store = MemoryStore {
            failing_saves: 1,
            ..MemoryStore::default()
        };
        let mut resolver = Resolver::new(&config, &index, None);
        let summary = resolver
            .run("run-4", &source, &mut records, &output, &mut store)
            .await
            .unwrap();
        assert_eq!(summary.checkpoint_failures, 1);
        assert_eq!(summary.checkpoints_written, 2);

        let mut records = vec![record(0, "Hôpital de Dax", "Dax", Some("40"))];
        let mut broken = MemoryStore {
            failing_saves: usize::MAX,
            ..MemoryStore::default()
        };
        let config = EngineConfig {
            checkpoint_interval: 5,
            resume_mode: ResumeMode::Restart,
            ..EngineConfig::default()
        };
        let mut resolver = Resolver::new(&config, &index, None);
        assert!(resolver
            .run("run-5", &source, &mut records[..], &output, &mut broken)
            .await
            .is_err());
    }
}
