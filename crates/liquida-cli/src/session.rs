//! Session state and batch processing of the upload queue.

use std::path::PathBuf;

use liquida_ai::{ExtractError, ExtractionRequest, Extractor, ModelVariant};
use liquida_core::{
    CalculationSource, CandidateFile, HistoryEntry, Selection, SettlementResult, UploadQueue,
};
use liquida_store::{HistoryStore, StoreError};
use tracing::{info, warn};

/// User inputs that apply to every file of a batch.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub instructions: String,
    pub employer_percent: f64,
    pub model: ModelVariant,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Ids of the history entries written, in processing order.
    pub recorded: Vec<String>,
    pub succeeded: usize,
    pub failed: usize,
    /// Set when the batch stopped early on an exhausted quota.
    pub halted: Option<String>,
}

/// Fill defaults the model may omit and apply the user's employer
/// percentage.
pub fn finalize(mut result: SettlementResult, options: &ProcessOptions) -> SettlementResult {
    let has_observation = result
        .observation
        .as_deref()
        .is_some_and(|o| !o.trim().is_empty());
    if !has_observation && !options.instructions.trim().is_empty() {
        result.observation = Some(options.instructions.clone());
    }
    if result.calculation_source == CalculationSource::Unspecified && result.calculation_possible
    {
        result.calculation_source = CalculationSource::AiCalculated;
    }
    if options.employer_percent > 0.0 {
        result.employer_percent = options.employer_percent;
    }
    result
}

/// Describe files on disk for the upload queue. Paths that cannot be read
/// are reported by message instead of failing the whole selection.
pub fn describe_files(paths: &[PathBuf]) -> (Vec<CandidateFile>, Vec<String>) {
    let mut files = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in paths {
        match CandidateFile::from_path(path) {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read file");
                unreadable.push(format!("cannot read {}: {e}", path.display()));
            }
        }
    }
    (files, unreadable)
}

/// Upload queue, history and the entry currently on display.
pub struct Session {
    queue: UploadQueue,
    store: HistoryStore,
    current: Option<String>,
}

impl Session {
    pub fn new(store: HistoryStore) -> Self {
        Self {
            queue: UploadQueue::default(),
            store,
            current: None,
        }
    }

    pub fn queue(&self) -> &UploadQueue {
        &self.queue
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut HistoryStore {
        &mut self.store
    }

    pub fn select(&mut self, files: impl IntoIterator<Item = CandidateFile>) -> Selection {
        self.queue.select(files)
    }

    /// Find an entry by full id or unique id prefix.
    pub fn resolve(&self, id: &str) -> Option<&HistoryEntry> {
        if let Some(entry) = self.store.get(id) {
            return Some(entry);
        }
        let mut matches = self.store.entries().iter().filter(|e| e.id.starts_with(id));
        match (matches.next(), matches.next()) {
            (Some(entry), None) if !id.is_empty() => Some(entry),
            _ => None,
        }
    }

    /// Make the entry matching `id` current. Returns its full id.
    pub fn open(&mut self, id: &str) -> Option<String> {
        let full = self.resolve(id)?.id.clone();
        self.current = Some(full.clone());
        Some(full)
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.current.as_deref().and_then(|id| self.store.get(id))
    }

    /// Persist an edited result over the current entry.
    pub fn save_current(&mut self, result: SettlementResult) -> Result<(), StoreError> {
        let id = self
            .current
            .clone()
            .ok_or_else(|| StoreError::NotFound("no current entry".to_string()))?;
        self.store.replace_result(&id, result)
    }

    /// Process queued files one at a time, in queue order.
    ///
    /// Every processed file produces a history entry: the model's result on
    /// success, an error placeholder otherwise. An exhausted quota stops
    /// the batch without recording the file; it and the files after it
    /// stay queued.
    pub async fn process_queue(
        &mut self,
        extractor: &dyn Extractor,
        options: &ProcessOptions,
    ) -> Result<BatchOutcome, StoreError> {
        let files: Vec<CandidateFile> = self.queue.files().to_vec();
        let total = files.len();
        let mut outcome = BatchOutcome::default();
        let mut processed = Vec::new();

        for (i, file) in files.iter().enumerate() {
            info!(file = %file.name, n = i + 1, total, "processing document");
            let attempt = match ExtractionRequest::from_file(
                file,
                &options.instructions,
                options.employer_percent,
                options.model,
            )
            .await
            {
                Ok(request) => extractor.extract(&request).await,
                Err(e) => Err(e),
            };

            let entry = match attempt {
                Ok(result) => {
                    let result = finalize(result, options);
                    if result.calculation_possible {
                        outcome.succeeded += 1;
                    } else {
                        warn!(file = %file.name, reason = %result.error_reason, "calculation not possible");
                        outcome.failed += 1;
                    }
                    HistoryEntry::new(&file.name, result)
                }
                Err(e) if e.is_quota() => {
                    let message = match e {
                        ExtractError::QuotaExceeded { message, .. } => message,
                        other => other.to_string(),
                    };
                    warn!(file = %file.name, %message, "quota exhausted, halting batch");
                    outcome.halted = Some(message);
                    break;
                }
                Err(e) => {
                    warn!(file = %file.name, error = %e, "processing failed");
                    outcome.failed += 1;
                    let result = SettlementResult::failed(e.to_string(), options.employer_percent);
                    HistoryEntry::new(&file.name, result).with_observation(&options.instructions)
                }
            };

            outcome.recorded.push(entry.id.clone());
            self.store.prepend(entry)?;
            processed.push(file.clone());
        }

        self.queue.remove_processed(&processed);
        if let Some(id) = outcome.recorded.last() {
            self.current = Some(id.clone());
        }
        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            halted = outcome.halted.is_some(),
            remaining = self.queue.len(),
            "batch finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    struct Scripted {
        replies: Mutex<VecDeque<Result<SettlementResult, ExtractError>>>,
        seen: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<SettlementResult, ExtractError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Extractor for Scripted {
        async fn extract(
            &self,
            request: &ExtractionRequest,
        ) -> Result<SettlementResult, ExtractError> {
            self.seen.lock().unwrap().push(request.file_name.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ExtractError::EmptyResponse))
        }
    }

    fn options() -> ProcessOptions {
        ProcessOptions {
            instructions: "usar SELIC".into(),
            employer_percent: 20.0,
            model: ModelVariant::Flash,
        }
    }

    fn ok(claimant: &str) -> Result<SettlementResult, ExtractError> {
        Ok(SettlementResult {
            claimant: claimant.into(),
            calculation_possible: true,
            employer_percent: 23.0,
            ..SettlementResult::default()
        })
    }

    fn write_pdfs(dir: &Path, names: &[&str]) -> Vec<CandidateFile> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, format!("%PDF {name}")).unwrap();
                CandidateFile::from_path(&path).unwrap()
            })
            .collect()
    }

    #[test]
    fn finalize_fills_defaults() {
        let r = finalize(ok("A").unwrap(), &options());
        assert_eq!(r.observation.as_deref(), Some("usar SELIC"));
        assert_eq!(r.calculation_source, CalculationSource::AiCalculated);
        assert_eq!(r.employer_percent, 20.0);

        let mut own = ok("B").unwrap();
        own.observation = Some("do modelo".into());
        own.calculation_source = CalculationSource::ClaimantProvidedBasis;
        let r = finalize(own, &ProcessOptions { employer_percent: 0.0, ..options() });
        assert_eq!(r.observation.as_deref(), Some("do modelo"));
        assert_eq!(r.calculation_source, CalculationSource::ClaimantProvidedBasis);
        assert_eq!(r.employer_percent, 23.0);

        let impossible = SettlementResult::default();
        let r = finalize(impossible, &options());
        assert_eq!(r.calculation_source, CalculationSource::Unspecified);
    }

    #[test]
    fn unreadable_path_does_not_drop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_pdfs(dir.path(), &["a.pdf"]);
        let paths = vec![dir.path().join("missing.pdf"), good[0].path.clone()];

        let (files, unreadable) = describe_files(&paths);
        assert_eq!(files, good);
        assert_eq!(unreadable.len(), 1);
        assert!(unreadable[0].contains("missing.pdf"));
    }

    #[tokio::test]
    async fn batch_records_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(HistoryStore::in_memory());
        session.select(write_pdfs(dir.path(), &["a.pdf", "b.pdf", "c.pdf"]));

        let extractor = Scripted::new(vec![
            ok("A"),
            Err(ExtractError::Api {
                status: 500,
                message: "backend down".into(),
            }),
            Ok(SettlementResult {
                error_reason: "ilegível".into(),
                ..SettlementResult::default()
            }),
        ]);
        let outcome = session.process_queue(&extractor, &options()).await.unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, 2);
        assert!(outcome.halted.is_none());
        assert!(session.queue().is_empty());

        let entries = session.store().entries();
        let files: Vec<&str> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(files, vec!["c.pdf", "b.pdf", "a.pdf"]);

        let failed = &entries[1];
        assert_eq!(failed.result.claimant, "Erro");
        assert!(!failed.result.calculation_possible);
        assert!(failed.result.error_reason.contains("backend down"));
        assert_eq!(failed.result.employer_percent, 20.0);
        assert_eq!(failed.observation.as_deref(), Some("usar SELIC"));

        assert_eq!(session.current().unwrap().file_name, "c.pdf");
    }

    #[tokio::test]
    async fn quota_halts_batch_and_keeps_rest_queued() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(HistoryStore::in_memory());
        session.select(write_pdfs(dir.path(), &["a.pdf", "b.pdf", "c.pdf"]));

        let extractor = Scripted::new(vec![
            ok("A"),
            Err(ExtractError::QuotaExceeded {
                attempts: 6,
                message: "RESOURCE_EXHAUSTED".into(),
            }),
            ok("C"),
        ]);
        let outcome = session.process_queue(&extractor, &options()).await.unwrap();

        assert_eq!(outcome.halted.as_deref(), Some("RESOURCE_EXHAUSTED"));
        assert_eq!(outcome.recorded.len(), 1);
        assert_eq!(session.store().len(), 1);
        assert_eq!(*extractor.seen.lock().unwrap(), vec!["a.pdf", "b.pdf"]);

        let queued: Vec<&str> = session.queue().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(queued, vec!["b.pdf", "c.pdf"]);
    }

    #[tokio::test]
    async fn quota_halt_keeps_same_named_file_of_other_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = Vec::new();
        for (sub, body) in [("one", "%PDF short"), ("two", "%PDF a longer body")] {
            let folder = dir.path().join(sub);
            std::fs::create_dir(&folder).unwrap();
            let path = folder.join("a.pdf");
            std::fs::write(&path, body).unwrap();
            files.push(CandidateFile::from_path(&path).unwrap());
        }
        let mut session = Session::new(HistoryStore::in_memory());
        session.select(files.clone());
        assert_eq!(session.queue().len(), 2);

        let extractor = Scripted::new(vec![
            ok("A"),
            Err(ExtractError::QuotaExceeded {
                attempts: 6,
                message: "q".into(),
            }),
        ]);
        let outcome = session.process_queue(&extractor, &options()).await.unwrap();

        assert_eq!(outcome.halted.as_deref(), Some("q"));
        assert_eq!(outcome.recorded.len(), 1);
        assert_eq!(session.queue().files(), &files[1..]);
    }

    #[tokio::test]
    async fn unreadable_file_becomes_failed_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(HistoryStore::in_memory());
        let files = write_pdfs(dir.path(), &["gone.pdf"]);
        std::fs::remove_file(&files[0].path).unwrap();
        session.select(files);

        let extractor = Scripted::new(vec![]);
        let outcome = session.process_queue(&extractor, &options()).await.unwrap();
        assert_eq!(outcome.failed, 1);
        assert!(extractor.seen.lock().unwrap().is_empty());
        assert!(session.store().entries()[0]
            .result
            .error_reason
            .starts_with("failed to read document"));
    }

    #[tokio::test]
    async fn resolve_by_prefix_and_save_current() {
        let mut store = HistoryStore::in_memory();
        let entry = HistoryEntry::new("a.pdf", ok("A").unwrap());
        let id = entry.id.clone();
        store.prepend(entry).unwrap();
        let mut session = Session::new(store);

        assert!(session.resolve("").is_none());
        assert_eq!(session.open(&id[..6]).as_deref(), Some(id.as_str()));

        let mut edited = session.current().unwrap().result.clone();
        edited.claimant = "A2".into();
        session.save_current(edited).unwrap();
        assert_eq!(session.store().get(&id).unwrap().result.claimant, "A2");
    }
}
