//! Integration tests for ABOP CLI, exercising the command layer end to end
//! against a throwaway `SQLite` database.

#[cfg(test)]
mod integration_tests {
    use crate::commands::{blocked_hash, book, factory_reset, scan, wanted};
    use crate::output::{CliOutput, OutputData};
    use tempfile::TempDir;

    fn temp_db() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("library.db");
        (dir, path)
    }

    #[test]
    fn scan_rejects_a_nonexistent_root() {
        let result = scan::run(vec![std::path::PathBuf::from("/nonexistent/path")], None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn scan_rejects_a_root_that_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("not_a_directory.txt");
        std::fs::write(&file_path, "x").unwrap();
        let result = scan::run(vec![file_path], None);
        assert!(result.is_err());
    }

    #[test]
    fn scan_queues_an_operation_over_a_real_directory() {
        let (_dir, db_path) = temp_db();
        let library = TempDir::new().unwrap();
        let output = scan::run(vec![library.path().to_path_buf()], Some(db_path)).unwrap();
        match output {
            CliOutput::Success { data: OutputData::OperationStarted { operation_id } } => {
                assert!(!operation_id.is_empty());
            }
            other => panic!("expected an operation-started result, got {other:?}"),
        }
    }

    #[test]
    fn wanted_book_round_trips_through_get() {
        let (_dir, db_path) = temp_db();
        let output = wanted::book("Neural Wraith".to_string(), None, Some(db_path.clone())).unwrap();
        let CliOutput::Success { data: OutputData::Wanted { ids } } = output else {
            panic!("expected a wanted result");
        };
        assert_eq!(ids.len(), 1);

        let output = book::get(ids[0].clone(), Some(db_path)).unwrap();
        match output {
            CliOutput::Success { data: OutputData::Book(info) } => {
                assert_eq!(info.title, "Neural Wraith");
                assert_eq!(info.library_state, "wanted");
            }
            other => panic!("expected a book result, got {other:?}"),
        }
    }

    #[test]
    fn book_list_finds_the_book_just_created() {
        let (_dir, db_path) = temp_db();
        wanted::book("Dune".to_string(), Some("Frank Herbert".to_string()), Some(db_path.clone())).unwrap();

        let output = book::list(None, None, None, Some("dune".to_string()), 10, 0, Some(db_path)).unwrap();
        match output {
            CliOutput::Success { data: OutputData::BookList(page) } => {
                assert_eq!(page.total, 1);
                assert_eq!(page.items[0].title, "Dune");
            }
            other => panic!("expected a book list result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_applies_a_stored_field_edit() {
        let (_dir, db_path) = temp_db();
        let output = wanted::book("Neural Wraith".to_string(), None, Some(db_path.clone())).unwrap();
        let CliOutput::Success { data: OutputData::Wanted { ids } } = output else {
            panic!("expected a wanted result");
        };

        let edits = vec![crate::commands::book::FieldEdit::Set(
            abop_core::models::provenance::FieldName::Narrator,
            "Jane Doe".to_string(),
        )];
        let output = book::update(ids[0].clone(), edits, None, Some(db_path)).await.unwrap();
        match output {
            CliOutput::Success { data: OutputData::Book(info) } => {
                assert_eq!(info.fields.get("narrator").unwrap().value.as_deref(), Some("Jane Doe"));
            }
            other => panic!("expected a book result, got {other:?}"),
        }
    }

    #[test]
    fn blocked_hash_add_then_list_round_trips() {
        let (_dir, db_path) = temp_db();
        let hash = "a".repeat(64);
        blocked_hash::add(hash.clone(), "known bad rip".to_string(), Some(db_path.clone())).unwrap();

        let output = blocked_hash::list(10, 0, Some(db_path)).unwrap();
        match output {
            CliOutput::Success { data: OutputData::BlockedHashList(page) } => {
                assert_eq!(page.total, 1);
                assert_eq!(page.items[0].hash, hash);
            }
            other => panic!("expected a blocked-hash list result, got {other:?}"),
        }
    }

    #[test]
    fn blocked_hash_add_rejects_a_malformed_hash() {
        let (_dir, db_path) = temp_db();
        let result = blocked_hash::add("not-a-hash".to_string(), "reason".to_string(), Some(db_path));
        assert!(result.is_err());
    }

    #[test]
    fn factory_reset_refuses_without_confirmation() {
        let (_dir, db_path) = temp_db();
        let result = factory_reset::run(false, Some(db_path));
        assert!(result.is_err());
    }

    #[test]
    fn factory_reset_wipes_the_store_once_confirmed() {
        let (_dir, db_path) = temp_db();
        wanted::book("Neural Wraith".to_string(), None, Some(db_path.clone())).unwrap();
        factory_reset::run(true, Some(db_path.clone())).unwrap();

        let output = book::list(None, None, None, None, 10, 0, Some(db_path)).unwrap();
        match output {
            CliOutput::Success { data: OutputData::BookList(page) } => assert_eq!(page.total, 0),
            other => panic!("expected a book list result, got {other:?}"),
        }
    }
}
