//! Chunked, cancellable import of container tables into an entity sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rayon::prelude::*;

use super::{resolve_references, EntitySink, ImportProgress, ProgressCell, ResolvedReferences, Stage, TableSet};
use crate::entity::{Entity, EntityKind, Row};
use crate::table::{Table, TableReader};
use crate::util::{ImportError, TableError};

/// Rows per sink transaction.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Upper bound on the default number of table-reading threads.
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// Import tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    /// Rows per sink transaction (at least 1)
    pub chunk_size: usize,
    /// Threads used to read tables (at least 1)
    pub max_workers: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_workers: default_workers(),
        }
    }
}

/// Available cores, capped at [`MAX_DEFAULT_WORKERS`].
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_WORKERS)
}

/// Notifications sent while an import runs.
#[derive(Clone, Debug, PartialEq)]
pub enum ImportEvent {
    /// The pipeline entered a stage
    Stage(Stage),
    /// A table is about to be written
    Table { kind: EntityKind, rows: usize },
    /// Progress after a committed chunk
    Progress(ImportProgress),
}

/// What a finished import wrote.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportSummary {
    /// Rows written per imported table, in import order
    pub tables: Vec<(EntityKind, usize)>,
    /// Committed sink transactions
    pub chunks: usize,
    pub progress: ImportProgress,
}

/// Reads a container's entity tables and writes them to a sink.
///
/// Tables are read concurrently; references are resolved table by table;
/// rows are written sequentially, one sink transaction per chunk.
pub struct ImportPipeline {
    options: ImportOptions,
    stage: Stage,
    progress: ProgressCell,
    events: Option<Sender<ImportEvent>>,
}

impl ImportPipeline {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            stage: Stage::Pending,
            progress: ProgressCell::new(),
            events: None,
        }
    }

    /// Send stage and progress events to `tx`.
    pub fn with_events(mut self, tx: Sender<ImportEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Publish progress into an existing cell.
    pub fn with_progress(mut self, progress: ProgressCell) -> Self {
        self.progress = progress;
        self
    }

    /// Shared progress of this pipeline.
    #[inline]
    pub fn progress(&self) -> &ProgressCell {
        &self.progress
    }

    /// Current stage.
    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[inline]
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Run the import on the calling thread.
    ///
    /// `cancel` is checked at every table boundary and before every chunk;
    /// rows committed before cancellation or a sink failure stay in the sink.
    #[tracing::instrument(skip_all)]
    pub fn run(
        &mut self,
        reader: &TableReader,
        sink: &mut dyn EntitySink,
        cancel: &AtomicBool,
    ) -> Result<ImportSummary, ImportError> {
        if self.stage != Stage::Pending {
            tracing::warn!(stage = ?self.stage, "import pipeline reused");
            return Err(ImportError::AlreadyRun { stage: format!("{:?}", self.stage) });
        }
        let result = self.run_stages(reader, sink, cancel);
        match &result {
            Ok(summary) => {
                self.enter(Stage::Finished);
                tracing::info!(chunks = summary.chunks, rows = summary.progress.completed_units, "import finished");
            }
            Err(err) => {
                self.enter(Stage::Failed);
                tracing::warn!(error = %err, "import failed");
            }
        }
        result
    }

    /// Run the import on a background thread.
    pub fn spawn<S>(self, reader: TableReader, sink: S) -> Result<ImportHandle<S>, ImportError>
    where
        S: EntitySink + 'static,
    {
        let (tx, rx) = channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let progress = self.progress.clone();
        let mut pipeline = self.with_events(tx);

        let flag = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name("vimkit-import".into())
            .spawn(move || {
                let mut sink = sink;
                let result = pipeline.run(&reader, &mut sink, &flag);
                ImportOutcome { sink, result }
            })
            .map_err(|e| ImportError::Worker(e.to_string()))?;

        Ok(ImportHandle {
            cancel,
            progress,
            events: rx,
            handle: Some(handle),
        })
    }

    fn run_stages(
        &mut self,
        reader: &TableReader,
        sink: &mut dyn EntitySink,
        cancel: &AtomicBool,
    ) -> Result<ImportSummary, ImportError> {
        self.enter(Stage::ReadingTables);
        let tables = self.read_tables(reader)?;

        let total: u64 = tables.iter().flatten().map(|t| t.row_count() as u64).sum();
        let progress = self.progress.start(total);
        self.emit(ImportEvent::Progress(progress));
        tracing::debug!(total_units = total, "tables read");

        self.enter(Stage::ResolvingReferences);
        let mut references: Vec<ResolvedReferences> = vec![Vec::new(); EntityKind::IMPORT_ORDER.len()];
        for kind in EntityKind::IMPORT_ORDER {
            let Some(table) = &tables[kind.ordinal()] else {
                continue;
            };
            self.check_cancel(cancel, sink)?;
            references[kind.ordinal()] = resolve_references(kind, table, &tables)?;
        }

        self.enter(Stage::WritingEntities);
        let mut summary = ImportSummary {
            tables: Vec::new(),
            chunks: 0,
            progress,
        };
        for kind in EntityKind::IMPORT_ORDER {
            let Some(table) = &tables[kind.ordinal()] else {
                continue;
            };
            self.check_cancel(cancel, sink)?;
            self.emit(ImportEvent::Table { kind, rows: table.row_count() });
            summary.chunks += self.write_table(kind, table, &references[kind.ordinal()], sink, cancel)?;
            summary.tables.push((kind, table.row_count()));
        }

        summary.progress = self.progress.get();
        Ok(summary)
    }

    /// Read every schema table present in the container on a bounded pool.
    fn read_tables(&self, reader: &TableReader) -> Result<TableSet, ImportError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.max_workers.max(1))
            .thread_name(|i| format!("vimkit-table-{i}"))
            .build()
            .map_err(|e| ImportError::Worker(e.to_string()))?;

        let read: Vec<Result<Option<Table>, TableError>> = pool.install(|| {
            EntityKind::IMPORT_ORDER
                .par_iter()
                .map(|kind| {
                    let name = kind.table_name();
                    if reader.has_table(name) {
                        reader.read_table(name).map(Some)
                    } else {
                        tracing::debug!(table = name, "table absent, skipping");
                        Ok(None)
                    }
                })
                .collect()
        });

        let mut tables: TableSet = Default::default();
        for (slot, table) in tables.iter_mut().zip(read) {
            *slot = table?;
        }
        Ok(tables)
    }

    /// Write one table chunk by chunk; returns the number of chunks committed.
    fn write_table(
        &self,
        kind: EntityKind,
        table: &Table,
        references: &ResolvedReferences,
        sink: &mut dyn EntitySink,
        cancel: &AtomicBool,
    ) -> Result<usize, ImportError> {
        let chunk_size = self.options.chunk_size.max(1);
        let rows = table.row_count();
        let mut chunks = 0;

        for start in (0..rows).step_by(chunk_size) {
            self.check_cancel(cancel, sink)?;
            let end = (start + chunk_size).min(rows);

            let written = (|| {
                sink.begin(kind, end - start)?;
                for row in start..end {
                    sink.append(Entity::from_row(kind, &Row::new(table, row, references)))?;
                }
                sink.commit()
            })();
            if let Err(source) = written {
                sink.discard();
                return Err(ImportError::StoreWriteFailed {
                    table: kind.table_name().to_string(),
                    committed_units: self.progress.get().completed_units,
                    source,
                });
            }

            chunks += 1;
            let progress = self.progress.advance((end - start) as u64);
            tracing::trace!(table = %kind, rows = end - start, completed = progress.completed_units, "chunk committed");
            self.emit(ImportEvent::Progress(progress));
        }
        Ok(chunks)
    }

    fn check_cancel(&self, cancel: &AtomicBool, sink: &mut dyn EntitySink) -> Result<(), ImportError> {
        if cancel.load(Ordering::Acquire) {
            sink.discard();
            let committed_units = self.progress.get().completed_units;
            tracing::info!(committed_units, "import cancelled");
            return Err(ImportError::Cancelled { committed_units });
        }
        Ok(())
    }

    fn enter(&mut self, stage: Stage) {
        if self.stage.advance(stage) {
            tracing::debug!(?stage, "import stage");
            self.emit(ImportEvent::Stage(stage));
        }
    }

    fn emit(&self, event: ImportEvent) {
        if let Some(tx) = &self.events {
            // Observer may have gone away.
            let _ = tx.send(event);
        }
    }
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::new(ImportOptions::default())
    }
}

/// Sink and result of a background import.
pub struct ImportOutcome<S> {
    /// The sink, holding every committed row
    pub sink: S,
    pub result: Result<ImportSummary, ImportError>,
}

/// Handle to an import running on its own thread.
///
/// Dropping the handle cancels the import and waits for the thread.
pub struct ImportHandle<S> {
    cancel: Arc<AtomicBool>,
    progress: ProgressCell,
    events: Receiver<ImportEvent>,
    handle: Option<JoinHandle<ImportOutcome<S>>>,
}

impl<S> ImportHandle<S> {
    /// Ask the import to stop at the next chunk or table boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Latest progress.
    pub fn progress(&self) -> ImportProgress {
        self.progress.get()
    }

    /// Event stream; disconnects when the import ends.
    pub fn events(&self) -> &Receiver<ImportEvent> {
        &self.events
    }

    /// Next event without blocking.
    pub fn try_recv(&self) -> Option<ImportEvent> {
        self.events.try_recv().ok()
    }

    /// True once the worker thread has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the import to end.
    pub fn join(mut self) -> Result<ImportOutcome<S>, ImportError> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| ImportError::Worker("import already joined".into()))?;
        handle
            .join()
            .map_err(|_| ImportError::Worker("import thread panicked".into()))
    }
}

impl<S> Drop for ImportHandle<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cancel();
            let _ = handle.join();
        }
    }
}
