//! End-to-end import scenarios against real files.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use dstore_core::{ImportEngine, ImportOptions, TickClock, create_engine};
use dstore_ingest::ParserKind;
use dstore_model::{Checkpoint, ImportStatus, Resource, Schema, SerializedRecord};
use dstore_storage::{MemoryStorage, RecordId, StorageAdapter, StorageError, StorageKind};
use tempfile::{NamedTempFile, TempDir, tempdir};

const FIRST_BIKE_LANE: &str = r#"["2049","75000403","R","1","DESIGNATED","0.076","0.364","463.2487"]"#;

fn temp_file(suffix: &str, content: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content).unwrap();
    file
}

fn csv_resource(path: &Path) -> Resource {
    Resource::new("1", path, "text/csv")
}

fn memory_engine(path: &Path, options: ImportOptions) -> ImportEngine {
    ImportEngine::new(
        csv_resource(path),
        ParserKind::Csv.build(),
        Box::new(MemoryStorage::new()),
        options,
    )
}

/// 2970 lines: a header and 2969 lane segments.
fn bike_lane_csv() -> String {
    let mut csv = String::from(
        "OBJECTID,SEGMENT ID,Facility Type,Lanes,Status,From Mile,To Mile,Shape.Length\n",
    );
    let facilities = ["R", "S", "\"Protected, two-way\""];
    for i in 0..2969u32 {
        let status = if i % 5 == 4 { "PROPOSED" } else { "DESIGNATED" };
        csv.push_str(&format!(
            "{},{},{},{},{},0.{:03},0.{:03},{}.2487\n",
            2049 + i,
            75_000_403 + i * 7,
            facilities[(i % 3) as usize],
            1 + i % 2,
            status,
            76 + i % 900,
            364 + i % 600,
            463 + i,
        ));
    }
    csv
}

fn run_to_completion(engine: &mut ImportEngine, budget: Duration) -> usize {
    let mut passes = 0;
    loop {
        passes += 1;
        let result = engine.run(budget);
        if result.is_terminal() {
            return passes;
        }
        assert!(passes < 1000, "import did not converge");
    }
}

#[test]
fn small_csv_imports_in_one_run() {
    let file = temp_file(
        ".csv",
        b"Country,Population (2013)\nAruba,102911\nAfghanistan,30551674\nAngola,21471618\n",
    );
    let mut engine = memory_engine(file.path(), ImportOptions::default());

    let result = engine.run(Duration::from_secs(30));

    assert_eq!(result.status(), ImportStatus::Done);
    assert_eq!(result.error(), None);
    assert_eq!(engine.storage().count().unwrap(), 3);
    assert_eq!(
        engine.storage().schema().unwrap().names(),
        vec!["country", "population_2013"]
    );
    assert_eq!(
        engine.storage().retrieve(1).unwrap().as_deref(),
        Some(r#"["Aruba","102911"]"#)
    );
    assert_eq!(engine.checkpoint(), Checkpoint::new(1, 4));
}

#[test]
fn large_file_takes_several_passes() {
    let file = temp_file(".csv", bike_lane_csv().as_bytes());
    let mut engine = memory_engine(file.path(), ImportOptions::default())
        .with_clock(TickClock::new(Duration::from_secs(1)));

    let passes = run_to_completion(&mut engine, Duration::from_secs(4));

    assert!(passes > 1, "expected several passes, got {passes}");
    assert_eq!(engine.result().status(), ImportStatus::Done);
    assert_eq!(engine.storage().count().unwrap(), 2969);
    assert_eq!(
        engine.storage().retrieve(1).unwrap().as_deref(),
        Some(FIRST_BIKE_LANE)
    );
    assert_eq!(
        engine.storage().retrieve(3).unwrap().as_deref(),
        Some(r#"["2051","75000417","Protected, two-way","1","DESIGNATED","0.078","0.366","465.2487"]"#)
    );
    assert_eq!(engine.checkpoint().record_number, 2970);
}

#[test]
fn resumed_import_matches_single_run() {
    let file = temp_file(".csv", bike_lane_csv().as_bytes());

    let mut single = memory_engine(file.path(), ImportOptions::default().with_chunk_size(1000));
    assert_eq!(single.run(Duration::MAX).status(), ImportStatus::Done);

    let mut sliced = memory_engine(file.path(), ImportOptions::default().with_chunk_size(1000))
        .with_clock(TickClock::new(Duration::from_secs(1)));
    run_to_completion(&mut sliced, Duration::from_secs(2));

    assert_eq!(
        sliced.storage().retrieve_all().unwrap(),
        single.storage().retrieve_all().unwrap()
    );
    assert_eq!(sliced.storage().schema(), single.storage().schema());
    assert_eq!(sliced.checkpoint(), single.checkpoint());
}

#[test]
fn missing_file_fails_without_progress() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.csv");
    let mut engine = memory_engine(&path, ImportOptions::default());

    let result = engine.run(Duration::from_secs(30));

    assert_eq!(result.status(), ImportStatus::Error);
    assert!(result.error().unwrap().starts_with("file unavailable"));
    assert!(engine.checkpoint().is_unstarted());
    assert_eq!(engine.storage().count().unwrap(), 0);
}

#[test]
fn non_text_resource_is_rejected_before_reading() {
    let file = temp_file(".png", b"\x89PNG\r\n\x1a\n");
    let mut engine = ImportEngine::new(
        Resource::new("img", file.path(), "image/png"),
        ParserKind::Csv.build(),
        Box::new(MemoryStorage::new()),
        ImportOptions::default(),
    );

    let result = engine.run(Duration::from_secs(30));

    assert_eq!(result.status(), ImportStatus::Error);
    assert!(result.error().unwrap().contains("invalid mime type 'image/png'"));
    assert!(engine.checkpoint().is_unstarted());
    assert!(engine.storage().schema().is_none());
    assert_eq!(engine.parser().snapshot(), ParserKind::Csv.build().snapshot());
}

#[test]
fn finished_import_is_not_run_again() {
    let file = temp_file(".csv", b"id,name\n1,one\n");
    let mut engine = memory_engine(file.path(), ImportOptions::default());
    let done = engine.run(Duration::MAX);
    assert_eq!(done.status(), ImportStatus::Done);
    let checkpoint = engine.checkpoint();

    fs::write(file.path(), "id,name\n1,one\n2,two\n").unwrap();
    assert_eq!(engine.run(Duration::MAX), done);
    assert_eq!(engine.checkpoint(), checkpoint);
    assert_eq!(engine.storage().count().unwrap(), 1);
}

#[test]
fn failed_import_is_not_run_again() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("late.csv");
    let mut engine = memory_engine(&path, ImportOptions::default());
    let failed = engine.run(Duration::MAX);
    assert_eq!(failed.status(), ImportStatus::Error);

    fs::write(&path, "id\n1\n").unwrap();
    assert_eq!(engine.run(Duration::MAX), failed);
    assert_eq!(engine.storage().count().unwrap(), 0);

    assert!(engine.retry());
    assert_eq!(engine.run(Duration::MAX).status(), ImportStatus::Done);
    assert_eq!(engine.storage().count().unwrap(), 1);
}

#[test]
fn duplicate_headers_fail_the_import() {
    let file = temp_file(".csv", b"id,name,id\n1,a,2\n");
    let mut engine = memory_engine(file.path(), ImportOptions::default());

    let result = engine.run(Duration::MAX);

    assert_eq!(result.status(), ImportStatus::Error);
    assert_eq!(result.error(), Some("duplicate header(s): id"));
    assert!(engine.storage().schema().is_none());
    assert!(engine.checkpoint().is_unstarted());
}

#[test]
fn invalid_utf8_reports_the_chunk() {
    let file = temp_file(".csv", b"id,name\n1,ok\n2,\xff\xfe\n");
    let mut engine = memory_engine(file.path(), ImportOptions::default().with_chunk_size(8));

    let result = engine.run(Duration::MAX);

    assert_eq!(result.status(), ImportStatus::Error);
    assert!(
        result.error().unwrap().starts_with("failed to parse chunk 3"),
        "{:?}",
        result.error()
    );
    assert_eq!(engine.checkpoint(), Checkpoint::new(2, 2));
}

#[test]
fn empty_file_is_done_with_nothing_stored() {
    let file = temp_file(".csv", b"");
    let mut engine = memory_engine(file.path(), ImportOptions::default());
    assert_eq!(engine.run(Duration::MAX).status(), ImportStatus::Done);
    assert_eq!(engine.storage().count().unwrap(), 0);
    assert!(engine.storage().schema().is_none());
}

#[test]
fn file_of_exact_chunk_multiple_finishes() {
    // 12 bytes, read as three 4-byte chunks.
    let file = temp_file(".csv", b"a,b\n1,2\n3,4\n");
    let mut engine = memory_engine(file.path(), ImportOptions::default().with_chunk_size(4))
        .with_clock(TickClock::new(Duration::from_secs(1)));

    // Budget for exactly three chunks: everything is read but EOF is not seen.
    assert_eq!(
        engine.run(Duration::from_secs(4)).status(),
        ImportStatus::Stopped
    );
    assert_eq!(engine.checkpoint(), Checkpoint::new(3, 3));

    assert_eq!(
        engine.run(Duration::from_secs(4)).status(),
        ImportStatus::Done
    );
    assert_eq!(engine.checkpoint(), Checkpoint::new(3, 3));
    assert_eq!(engine.storage().count().unwrap(), 2);
}

#[test]
fn drop_data_allows_a_fresh_import() {
    let file = temp_file(".csv", b"id,name\n1,one\n2,two\n");
    let mut engine = memory_engine(file.path(), ImportOptions::default().with_chunk_size(5));
    engine.run(Duration::MAX);
    assert_eq!(engine.storage().count().unwrap(), 2);

    engine.drop_data().unwrap();
    assert_eq!(engine.storage().count().unwrap(), 0);
    assert!(engine.storage().schema().is_none());
    assert_eq!(engine.checkpoint(), Checkpoint::default());
    assert_eq!(engine.result().status(), ImportStatus::Stopped);

    fs::write(file.path(), "code,label\nx,ex\n").unwrap();
    assert_eq!(engine.run(Duration::MAX).status(), ImportStatus::Done);
    assert_eq!(engine.storage().count().unwrap(), 1);
    assert_eq!(engine.storage().schema().unwrap().names(), vec!["code", "label"]);
}

/// Memory storage that rejects one batch write.
struct FlakyStorage {
    inner: MemoryStorage,
    calls: usize,
    fail_on: usize,
}

impl FlakyStorage {
    fn new(fail_on: usize) -> Self {
        Self {
            inner: MemoryStorage::new(),
            calls: 0,
            fail_on,
        }
    }
}

impl StorageAdapter for FlakyStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    fn set_schema(&mut self, schema: Schema) -> dstore_storage::Result<()> {
        self.inner.set_schema(schema)
    }

    fn schema(&self) -> Option<&Schema> {
        self.inner.schema()
    }

    fn store_multiple(
        &mut self,
        records: &[SerializedRecord],
    ) -> dstore_storage::Result<Vec<RecordId>> {
        self.calls += 1;
        if self.calls == self.fail_on {
            // Half the batch lands before the failure.
            self.inner.store_multiple(&records[..records.len() / 2])?;
            return Err(StorageError::Io {
                operation: "write",
                path: "flaky".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.store_multiple(records)
    }

    fn retrieve(&self, id: RecordId) -> dstore_storage::Result<Option<String>> {
        self.inner.retrieve(id)
    }

    fn retrieve_all(&self) -> dstore_storage::Result<BTreeMap<RecordId, String>> {
        self.inner.retrieve_all()
    }

    fn remove(&mut self, id: RecordId) -> dstore_storage::Result<bool> {
        self.inner.remove(id)
    }

    fn count(&self) -> dstore_storage::Result<usize> {
        self.inner.count()
    }

    fn destroy(&mut self) -> dstore_storage::Result<()> {
        self.inner.destroy()
    }
}

#[test]
fn storage_failure_rolls_back_and_retry_resumes() {
    let file = temp_file(".csv", bike_lane_csv().as_bytes());
    let mut engine = ImportEngine::new(
        csv_resource(file.path()),
        ParserKind::Csv.build(),
        Box::new(FlakyStorage::new(3)),
        ImportOptions::default().with_chunk_size(500),
    );

    let failed = engine.run(Duration::MAX);
    assert_eq!(failed.status(), ImportStatus::Error);
    assert!(failed.error().unwrap().contains("disk full"));
    assert_eq!(engine.checkpoint().chunks_processed, 2);

    assert!(engine.retry());
    assert_eq!(engine.run(Duration::MAX).status(), ImportStatus::Done);
    assert_eq!(engine.storage().count().unwrap(), 2969);
    assert_eq!(
        engine.storage().retrieve(1).unwrap().as_deref(),
        Some(FIRST_BIKE_LANE)
    );

    let mut reference = memory_engine(file.path(), ImportOptions::default());
    reference.run(Duration::MAX);
    assert_eq!(
        engine.storage().retrieve_all().unwrap(),
        reference.storage().retrieve_all().unwrap()
    );
}

fn log_engine(path: &Path, dir: &TempDir, options: ImportOptions) -> ImportEngine {
    create_engine(csv_resource(path), "log", Some(dir.path()), options).unwrap()
}

#[test]
fn serialized_state_resumes_in_a_new_engine() {
    let file = temp_file(".csv", bike_lane_csv().as_bytes());
    let storage_dir = tempdir().unwrap();
    let options = ImportOptions::default().with_chunk_size(777);

    let mut engine = log_engine(file.path(), &storage_dir, options)
        .with_clock(TickClock::new(Duration::from_secs(1)));
    let mut passes = 0;
    loop {
        passes += 1;
        let result = engine.run(Duration::from_secs(3));
        let json = engine.serialize().unwrap();
        let checkpoint = engine.checkpoint();
        drop(engine);

        engine = ImportEngine::restore(&json, Some(storage_dir.path()))
            .unwrap()
            .with_clock(TickClock::new(Duration::from_secs(1)));
        assert_eq!(engine.checkpoint(), checkpoint);
        assert_eq!(engine.result(), &result);
        assert_eq!(engine.options().chunk_size, 777);
        if result.is_terminal() {
            break;
        }
        assert!(passes < 1000);
    }

    assert!(passes > 1);
    assert_eq!(engine.result().status(), ImportStatus::Done);
    assert_eq!(engine.storage().kind(), StorageKind::Log);
    assert_eq!(engine.storage().count().unwrap(), 2969);
    assert_eq!(
        engine.storage().retrieve(1).unwrap().as_deref(),
        Some(FIRST_BIKE_LANE)
    );
}

#[test]
fn long_and_spaced_headers_are_sanitized() {
    let header = "Extra Long Column Name With Tons Of Characters That Will Need To Be Truncated In Order To Work,Column Name With Spaces In It\n";
    let file = temp_file(".csv", format!("{header}a,b\n").as_bytes());
    let mut engine = memory_engine(file.path(), ImportOptions::default());
    engine.run(Duration::MAX);

    let schema = engine.storage().schema().unwrap();
    let names = schema.names();
    assert_eq!(names[1], "column_name_with_spaces_in_it");
    assert!(names[0].len() <= 64);
    assert!(names[0].starts_with("extra_long_column_name_with_tons_of_characters_that_will_ne_"));
    assert_eq!(
        schema.fields()[1].description.as_deref(),
        Some("Column Name With Spaces In It")
    );
}
