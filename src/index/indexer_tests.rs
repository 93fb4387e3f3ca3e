    use super::*;
    use crate::core::errors::{ErrorCategory, QualgateError};
    use crate::index::active_rules::{ActiveRuleChange, ActiveRuleConverter, ActiveRuleDoc, ActiveRuleRow};
    use crate::index::search_index::InMemorySearchIndex;
    use crate::index::source::VecRowSource;
    use crate::index::source_lines::{FileSourceRow, SourceLineConverter, SourceLineDoc};

    type RuleFixture = (
        Arc<VecRowSource<ActiveRuleRow>>,
        Arc<InMemorySearchIndex<ActiveRuleDoc>>,
        Indexer<ActiveRuleConverter>,
    );

    fn rule(id: i64, profile: &str, updated_at: i64) -> ActiveRuleRow {
        ActiveRuleRow {
            id,
            profile_key: profile.to_string(),
            rule_id: id,
            rule_repository: "java".to_string(),
            rule_key: format!("S{id}"),
            rule_name: format!("Rule {id}"),
            language: "java".to_string(),
            severity: None,
            inheritance: None,
            created_at: 0,
            updated_at,
        }
    }

    fn rule_indexer(rows: Vec<ActiveRuleRow>, config: IndexingConfig) -> RuleFixture {
        let source = Arc::new(VecRowSource::new(rows));
        let index = Arc::new(InMemorySearchIndex::new("active_rules"));
        let indexer = Indexer::new(ActiveRuleConverter, source.clone(), index.clone(), config);
        (source, index, indexer)
    }

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_startup_indexes_every_row_and_sets_watermark() {
        let (_, index, indexer) = rule_indexer(
            vec![rule(1, "p1", 100), rule(2, "p1", 300), rule(3, "p2", 200)],
            IndexingConfig::default(),
        );

        let report = indexer.index_on_startup(&[]).unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(report.upserted, 3);
        assert!(!report.skipped);
        assert_eq!(index.count().unwrap(), 3);
        assert_eq!(index.watermark().unwrap(), Some(300));
    }

    #[test]
    fn test_startup_on_populated_index_is_noop() {
        let (source, index, indexer) = rule_indexer(vec![rule(1, "p1", 100)], IndexingConfig::default());
        indexer.index_on_startup(&[]).unwrap();
        source.upsert(rule(2, "p1", 200));

        let report = indexer.index_on_startup(&[]).unwrap();

        assert!(report.skipped);
        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn test_forced_startup_reindexes_populated_index() {
        let config = IndexingConfig {
            force_startup_indexing: true,
            ..IndexingConfig::default()
        };
        let (source, index, indexer) = rule_indexer(vec![rule(1, "p1", 100)], config);
        indexer.index_on_startup(&[]).unwrap();
        source.upsert(rule(2, "p1", 200));

        let report = indexer.index_on_startup(&[]).unwrap();

        assert!(!report.skipped);
        assert_eq!(index.count().unwrap(), 2);
    }

    #[test]
    fn test_startup_skips_excluded_scopes() {
        let (_, index, indexer) = rule_indexer(
            vec![rule(1, "p1", 100), rule(2, "p2", 100)],
            IndexingConfig::default(),
        );

        indexer.index_on_startup(&keys(&["p2"])).unwrap();

        assert!(index.get_by_id("1").unwrap().is_some());
        assert!(index.get_by_id("2").unwrap().is_none());
    }

    #[test]
    fn test_startup_without_rows_succeeds() {
        let (_, index, indexer) = rule_indexer(Vec::new(), IndexingConfig::default());

        let report = indexer.index_on_startup(&[]).unwrap();

        assert_eq!(report, IndexingReport::default());
        assert_eq!(index.watermark().unwrap(), None);
    }

    #[test]
    fn test_small_batches_index_everything() {
        let config = IndexingConfig {
            bulk_size: 2,
            ..IndexingConfig::default()
        };
        let rows = (1..=7).map(|id| rule(id, "p1", id * 10)).collect();
        let (_, index, indexer) = rule_indexer(rows, config);

        let report = indexer.index_on_startup(&[]).unwrap();

        assert_eq!(report.rows, 7);
        assert_eq!(index.count().unwrap(), 7);
        assert_eq!(index.watermark().unwrap(), Some(70));
    }

    #[test]
    fn test_indexing_same_row_twice_keeps_one_document() {
        let (_, index, indexer) = rule_indexer(Vec::new(), IndexingConfig::default());

        indexer.index_changes(vec![ActiveRuleChange::Activated(rule(1, "p1", 100))]).unwrap();
        indexer.index_changes(vec![ActiveRuleChange::Activated(rule(1, "p1", 100))]).unwrap();

        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn test_deactivated_rule_is_no_longer_found() {
        let (_, index, indexer) = rule_indexer(Vec::new(), IndexingConfig::default());
        indexer.index_changes(vec![ActiveRuleChange::Activated(rule(1, "p1", 100))]).unwrap();
        assert!(index.get_by_id("1").unwrap().is_some());

        let report = indexer
            .index_changes(vec![ActiveRuleChange::Deactivated { active_rule_id: 1 }])
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert!(index.get_by_id("1").unwrap().is_none());
    }

    #[test]
    fn test_last_change_of_a_row_wins() {
        let (_, index, indexer) = rule_indexer(Vec::new(), IndexingConfig::default());

        indexer
            .index_changes(vec![
                ActiveRuleChange::Activated(rule(1, "p1", 100)),
                ActiveRuleChange::Deactivated { active_rule_id: 1 },
                ActiveRuleChange::Deactivated { active_rule_id: 2 },
                ActiveRuleChange::Activated(rule(2, "p1", 100)),
            ])
            .unwrap();

        assert!(index.get_by_id("1").unwrap().is_none());
        assert!(index.get_by_id("2").unwrap().is_some());
    }

    #[test]
    fn test_changes_leave_watermark_alone() {
        let (_, index, indexer) = rule_indexer(Vec::new(), IndexingConfig::default());

        indexer.index_changes(vec![ActiveRuleChange::Updated(rule(1, "p1", 900))]).unwrap();

        assert_eq!(index.watermark().unwrap(), None);
    }

    #[test]
    fn test_delete_without_matches_succeeds() {
        let (_, index, indexer) = rule_indexer(vec![rule(1, "p1", 100)], IndexingConfig::default());
        indexer.index_on_startup(&[]).unwrap();

        assert_eq!(indexer.delete_by_keys(&keys(&["404", "405"])).unwrap(), 0);
        assert_eq!(indexer.delete_by_parent_keys(&keys(&["missing"])).unwrap(), 0);
        assert_eq!(indexer.delete_by_keys(&[]).unwrap(), 0);
        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn test_delete_by_parent_keys_in_chunks() {
        let config = IndexingConfig {
            delete_chunk_size: 1,
            ..IndexingConfig::default()
        };
        let (_, index, indexer) = rule_indexer(
            vec![rule(1, "p1", 1), rule(2, "p2", 1), rule(3, "p3", 1), rule(4, "p3", 1)],
            config,
        );
        indexer.index_on_startup(&[]).unwrap();

        let removed = indexer.delete_by_parent_keys(&keys(&["p1", "p3"])).unwrap();

        assert_eq!(removed, 3);
        assert_eq!(index.count().unwrap(), 1);
        assert!(index.get_by_id("2").unwrap().is_some());
    }

    #[test]
    fn test_incremental_reads_rows_since_watermark() {
        let (source, index, indexer) = rule_indexer(
            vec![rule(1, "p1", 100), rule(2, "p1", 200)],
            IndexingConfig::default(),
        );
        indexer.index_on_startup(&[]).unwrap();

        let mut renamed = rule(3, "p2", 300);
        renamed.rule_name = "Fresh".to_string();
        source.upsert(renamed);

        let report = indexer.index_incremental().unwrap();

        // Rows updated exactly at the watermark are read again.
        assert_eq!(report.rows, 2);
        assert_eq!(report.watermark, Some(300));
        assert_eq!(index.watermark().unwrap(), Some(300));
        assert_eq!(index.get_by_id("3").unwrap().map(|d| d.rule_name), Some("Fresh".to_string()));
    }

    #[test]
    fn test_incremental_without_watermark_reads_everything() {
        let (_, index, indexer) = rule_indexer(
            vec![rule(1, "p1", 100), rule(2, "p1", 200)],
            IndexingConfig::default(),
        );

        let report = indexer.index_incremental().unwrap();

        assert_eq!(report.rows, 2);
        assert_eq!(index.watermark().unwrap(), Some(200));
    }

    #[test]
    fn test_watermark_never_moves_back() {
        let (_, index, indexer) = rule_indexer(vec![rule(1, "p1", 100)], IndexingConfig::default());
        index.store_watermark(50).unwrap();
        indexer.index_incremental().unwrap();
        assert_eq!(index.watermark().unwrap(), Some(100));

        index.store_watermark(500).unwrap();
        let report = indexer.index_incremental().unwrap();

        assert_eq!(report.rows, 0);
        assert_eq!(index.watermark().unwrap(), Some(500));
    }

    #[test]
    fn test_malformed_row_aborts_pass_without_moving_watermark() {
        let mut broken = rule(2, "p1", 200);
        broken.severity = Some("SEVERE".to_string());
        let (_, index, indexer) = rule_indexer(vec![rule(1, "p1", 100), broken], IndexingConfig::default());

        let err = indexer.index_incremental().unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Data);
        assert!(matches!(err, QualgateError::Data { ref row_key, .. } if row_key == "2"));
        assert_eq!(index.watermark().unwrap(), None);
    }

    #[test]
    fn test_unavailable_index_error_propagates() {
        let (_, index, indexer) = rule_indexer(vec![rule(1, "p1", 100)], IndexingConfig::default());
        index.set_available(false);

        let err = indexer
            .index_changes(vec![ActiveRuleChange::Activated(rule(1, "p1", 100))])
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Resource);
    }

    #[test]
    fn test_index_scopes_prunes_removed_rows() {
        let (source, index, indexer) = rule_indexer(
            vec![rule(1, "p1", 100), rule(2, "p1", 100), rule(3, "p2", 100)],
            IndexingConfig::default(),
        );
        indexer.index_on_startup(&[]).unwrap();
        source.remove("2");
        source.remove("3");

        let report = indexer.index_scopes(&keys(&["p1"])).unwrap();

        assert_eq!(report.rows, 1);
        assert_eq!(report.deleted, 1);
        assert!(index.get_by_id("2").unwrap().is_none());
        // Other scopes are left untouched.
        assert!(index.get_by_id("3").unwrap().is_some());
    }

    fn source_file(file: &str, lines: usize, updated_at: i64) -> FileSourceRow {
        FileSourceRow {
            project_uuid: "PROJECT".to_string(),
            file_uuid: file.to_string(),
            updated_at,
            line_data: (0..lines).map(|i| format!(",,,,,,,,,,,,,,,line {i}\n")).collect(),
        }
    }

    #[test]
    fn test_shrunk_file_prunes_trailing_lines() {
        let source = Arc::new(VecRowSource::new(vec![source_file("F1", 3, 100)]));
        let index: Arc<InMemorySearchIndex<SourceLineDoc>> = Arc::new(InMemorySearchIndex::new("source_lines"));
        let indexer = Indexer::new(SourceLineConverter, source.clone(), index.clone(), IndexingConfig::default());
        indexer.index_on_startup(&[]).unwrap();
        assert_eq!(index.count().unwrap(), 3);

        let report = indexer
            .index_changes(vec![RowChange::Upsert(source_file("F1", 1, 200))])
            .unwrap();

        assert_eq!(report.deleted, 2);
        assert_eq!(index.count().unwrap(), 1);
        assert!(index.get_by_id("F1_1").unwrap().is_some());
        assert!(index.get_by_id("F1_3").unwrap().is_none());
    }

    #[test]
    fn test_deleted_file_removes_all_lines() {
        let source = Arc::new(VecRowSource::new(vec![
            source_file("F1", 2, 100),
            source_file("F2", 2, 100),
        ]));
        let index: Arc<InMemorySearchIndex<SourceLineDoc>> = Arc::new(InMemorySearchIndex::new("source_lines"));
        let indexer = Indexer::new(SourceLineConverter, source, index.clone(), IndexingConfig::default());
        indexer.index_on_startup(&[]).unwrap();

        let report = indexer
            .index_changes(vec![RowChange::<FileSourceRow>::Delete { key: "F1".to_string() }])
            .unwrap();

        assert_eq!(report.deleted, 2);
        assert_eq!(index.count().unwrap(), 2);
        assert!(index.get_by_id("F2_2").unwrap().is_some());
    }

    #[test]
    fn test_blank_source_line_aborts_pass() {
        let mut gapped = source_file("F2", 0, 200);
        gapped.line_data = ",,,,,,,,,,,,,,,first\n\n,,,,,,,,,,,,,,,third\n".to_string();
        let source = Arc::new(VecRowSource::new(vec![source_file("F1", 2, 100), gapped]));
        let index: Arc<InMemorySearchIndex<SourceLineDoc>> = Arc::new(InMemorySearchIndex::new("source_lines"));
        let indexer = Indexer::new(SourceLineConverter, source, index.clone(), IndexingConfig::default());

        let err = indexer.index_incremental().unwrap_err();

        assert!(matches!(err, QualgateError::Data { ref row_key, line: Some(2), .. } if row_key == "F2"));
        assert!(index.get_by_id("F2_2").unwrap().is_none());
        assert_eq!(index.watermark().unwrap(), None);
    }
