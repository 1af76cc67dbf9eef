//! Importing in budgeted slices stores exactly what a single run stores.

use std::io::Write;
use std::time::Duration;

use proptest::prelude::*;

use dstore_core::{ImportEngine, ImportOptions, TickClock};
use dstore_ingest::ParserKind;
use dstore_model::{ImportStatus, Resource};
use dstore_storage::MemoryStorage;

fn cell() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9 ]{0,10}",
        "[a-z,\n ]{1,10}".prop_map(|s| format!("\"{s}\"")),
    ]
}

fn csv_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::collection::vec(cell(), 3), 0..40).prop_map(|rows| {
        let mut text = String::from("Id,Value,Free Text\n");
        for row in rows {
            text.push_str(&row.join(","));
            text.push('\n');
        }
        text
    })
}

fn engine(resource: &Resource, chunk_size: usize) -> ImportEngine {
    ImportEngine::new(
        resource.clone(),
        ParserKind::Csv.build(),
        Box::new(MemoryStorage::new()),
        ImportOptions::default().with_chunk_size(chunk_size),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn sliced_import_matches_single_run(
        text in csv_text(),
        chunk_size in 1usize..64,
        ticks in 2u64..6,
    ) {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        let resource = Resource::new("prop", file.path(), "text/csv");

        let mut single = engine(&resource, chunk_size);
        prop_assert_eq!(single.run(Duration::MAX).status(), ImportStatus::Done);

        let mut sliced = engine(&resource, chunk_size)
            .with_clock(TickClock::new(Duration::from_millis(1)));
        let budget = Duration::from_millis(ticks);
        let mut passes = 0;
        while !sliced.run(budget).is_terminal() {
            passes += 1;
            prop_assert!(passes <= text.len() + 1);
        }

        prop_assert_eq!(sliced.result(), single.result());
        prop_assert_eq!(sliced.checkpoint(), single.checkpoint());
        prop_assert_eq!(sliced.storage().schema(), single.storage().schema());
        prop_assert_eq!(
            sliced.storage().retrieve_all().unwrap(),
            single.storage().retrieve_all().unwrap()
        );
    }
}
