//! Source line index: one document per line of an analyzed file.
//!
//! The primary store keeps the lines of a file as a single CSV blob, one
//! record per line in line order, each record carrying 16 fields:
//!
//! ```text
//! scm_revision, scm_author, scm_date,
//! ut_line_hits, ut_conditions, ut_covered_conditions,
//! it_line_hits, it_conditions, it_covered_conditions,
//! overall_line_hits, overall_conditions, overall_covered_conditions,
//! highlighting, symbols, duplications, source
//! ```
//!
//! Empty fields mean "not computed". A record that does not parse fails the
//! whole file rather than leaving a hole in the index.

use chrono::DateTime;
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};

use crate::core::errors::{QualgateError, Result};
use crate::index::document::{DocumentConverter, IndexDocument, SourceRow};
use crate::index::indexer::Indexer;

/// Name of the source line index.
pub const SOURCE_LINES_INDEX: &str = "source_lines";

/// Number of CSV fields of one line record.
pub const LINE_FIELD_COUNT: usize = 16;

const SCM_DATE_WITH_OFFSET: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Stored source of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSourceRow {
    /// Owning project
    pub project_uuid: String,
    /// File id
    pub file_uuid: String,
    /// Last update, in epoch milliseconds
    pub updated_at: i64,
    /// CSV-encoded lines
    pub line_data: String,
}

impl SourceRow for FileSourceRow {
    fn row_key(&self) -> String {
        self.file_uuid.clone()
    }

    fn scope_key(&self) -> &str {
        &self.project_uuid
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}

/// Indexed source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLineDoc {
    /// `<file_uuid>_<line>`
    pub id: String,
    /// Owning project
    pub project_uuid: String,
    /// File id
    pub file_uuid: String,
    /// 1-based line number
    pub line: usize,
    /// SCM revision of the last change
    pub scm_revision: Option<String>,
    /// SCM author of the last change
    pub scm_author: Option<String>,
    /// Epoch milliseconds
    pub scm_date: Option<i64>,
    /// Unit test line hits
    pub ut_line_hits: Option<i32>,
    /// Unit test conditions
    pub ut_conditions: Option<i32>,
    /// Unit test covered conditions
    pub ut_covered_conditions: Option<i32>,
    /// Integration test line hits
    pub it_line_hits: Option<i32>,
    /// Integration test conditions
    pub it_conditions: Option<i32>,
    /// Integration test covered conditions
    pub it_covered_conditions: Option<i32>,
    /// Overall line hits
    pub overall_line_hits: Option<i32>,
    /// Overall conditions
    pub overall_conditions: Option<i32>,
    /// Overall covered conditions
    pub overall_covered_conditions: Option<i32>,
    /// Syntax highlighting data
    pub highlighting: Option<String>,
    /// Symbol reference data
    pub symbols: Option<String>,
    /// Duplication block indexes covering this line
    pub duplications: Vec<i32>,
    /// Line text
    pub source: String,
    /// Last update of the file, in epoch milliseconds
    pub updated_at: i64,
}

impl SourceLineDoc {
    /// Document id of `line` in `file_uuid`.
    pub fn doc_id(file_uuid: &str, line: usize) -> String {
        format!("{file_uuid}_{line}")
    }
}

impl IndexDocument for SourceLineDoc {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_key(&self) -> &str {
        &self.file_uuid
    }

    fn scope_key(&self) -> &str {
        &self.project_uuid
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}

/// Converts file sources to one [`SourceLineDoc`] per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceLineConverter;

impl DocumentConverter for SourceLineConverter {
    type Row = FileSourceRow;
    type Doc = SourceLineDoc;

    fn index_name(&self) -> &str {
        SOURCE_LINES_INDEX
    }

    /// Line numbers are physical: line `n` is the `n`-th `\n`-terminated
    /// record of the blob. A blank record fails the file.
    fn convert(&self, row: &FileSourceRow) -> Result<Vec<SourceLineDoc>> {
        let data = row.line_data.strip_suffix('\n').unwrap_or(&row.line_data);
        if data.is_empty() {
            return Ok(Vec::new());
        }

        data.split('\n')
            .enumerate()
            .map(|(index, raw)| {
                let line = index + 1;
                let record = read_line_record(raw)
                    .map_err(|message| QualgateError::data_at_line(&row.file_uuid, line, message))?;
                LineParser { row, line, record: &record }.parse()
            })
            .collect()
    }

    fn owns_parent(&self) -> bool {
        true
    }
}

/// Parse one physical line as a single CSV record.
fn read_line_record(raw: &str) -> std::result::Result<StringRecord, String> {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    if raw.is_empty() {
        return Err("empty line record".to_string());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());
    let mut record = StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Ok(record),
        Ok(false) => Err("empty line record".to_string()),
        Err(e) => Err(format!("unreadable line record: {e}")),
    }
}

struct LineParser<'a> {
    row: &'a FileSourceRow,
    line: usize,
    record: &'a StringRecord,
}

impl LineParser<'_> {
    fn parse(&self) -> Result<SourceLineDoc> {
        if self.record.len() != LINE_FIELD_COUNT {
            return Err(self.error(format!(
                "expected {LINE_FIELD_COUNT} fields, got {}",
                self.record.len()
            )));
        }

        Ok(SourceLineDoc {
            id: SourceLineDoc::doc_id(&self.row.file_uuid, self.line),
            project_uuid: self.row.project_uuid.clone(),
            file_uuid: self.row.file_uuid.clone(),
            line: self.line,
            scm_revision: self.text(0),
            scm_author: self.text(1),
            scm_date: self.scm_date(2)?,
            ut_line_hits: self.int(3, "ut_line_hits")?,
            ut_conditions: self.int(4, "ut_conditions")?,
            ut_covered_conditions: self.int(5, "ut_covered_conditions")?,
            it_line_hits: self.int(6, "it_line_hits")?,
            it_conditions: self.int(7, "it_conditions")?,
            it_covered_conditions: self.int(8, "it_covered_conditions")?,
            overall_line_hits: self.int(9, "overall_line_hits")?,
            overall_conditions: self.int(10, "overall_conditions")?,
            overall_covered_conditions: self.int(11, "overall_covered_conditions")?,
            highlighting: self.text(12),
            symbols: self.text(13),
            duplications: self.duplications(14)?,
            source: self.field(15).to_string(),
            updated_at: self.row.updated_at,
        })
    }

    fn field(&self, position: usize) -> &str {
        self.record.get(position).unwrap_or_default()
    }

    fn text(&self, position: usize) -> Option<String> {
        Some(self.field(position)).filter(|v| !v.is_empty()).map(str::to_string)
    }

    fn int(&self, position: usize, name: &str) -> Result<Option<i32>> {
        let raw = self.field(position).trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<i32>()
            .map(Some)
            .map_err(|_| self.error(format!("invalid {name} '{raw}'")))
    }

    fn duplications(&self, position: usize) -> Result<Vec<i32>> {
        let raw = self.field(position).trim();
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        raw.split(',')
            .map(|block| {
                block
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| self.error(format!("invalid duplication block '{block}'")))
            })
            .collect()
    }

    /// RFC 3339, ISO 8601 with a compact offset, or epoch milliseconds.
    fn scm_date(&self, position: usize) -> Result<Option<i64>> {
        let raw = self.field(position).trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Some(date.timestamp_millis()));
        }
        if let Ok(date) = DateTime::parse_from_str(raw, SCM_DATE_WITH_OFFSET) {
            return Ok(Some(date.timestamp_millis()));
        }
        raw.parse::<i64>()
            .map(Some)
            .map_err(|_| self.error(format!("invalid scm_date '{raw}'")))
    }

    fn error(&self, message: String) -> QualgateError {
        QualgateError::data_at_line(&self.row.file_uuid, self.line, message)
    }
}

/// Indexer of source lines.
pub type SourceLineIndexer = Indexer<SourceLineConverter>;

#[cfg(test)]
mod tests {
    use super::*;

    fn file(line_data: &str) -> FileSourceRow {
        FileSourceRow {
            project_uuid: "PROJECT_1".to_string(),
            file_uuid: "FILE_1".to_string(),
            updated_at: 1_500_000_000_000,
            line_data: line_data.to_string(),
        }
    }

    #[test]
    fn test_one_document_per_line() {
        let data = concat!(
            "rev1,alice,2017-07-14T10:00:00+0200,1,2,1,,,,1,2,1,hl,sym,\"1,3\",\"int a = 1;\"\n",
            ",,,,,,,,,,,,,,,}\n",
        );

        let docs = SourceLineConverter.convert(&file(data)).unwrap();

        assert_eq!(docs.len(), 2);
        let first = &docs[0];
        assert_eq!(first.id, "FILE_1_1");
        assert_eq!(first.scm_author.as_deref(), Some("alice"));
        assert_eq!(first.scm_date, Some(1_500_019_200_000));
        assert_eq!(first.ut_line_hits, Some(1));
        assert_eq!(first.it_line_hits, None);
        assert_eq!(first.duplications, vec![1, 3]);
        assert_eq!(first.source, "int a = 1;");

        let second = &docs[1];
        assert_eq!(second.id, "FILE_1_2");
        assert_eq!(second.line, 2);
        assert_eq!(second.scm_revision, None);
        assert_eq!(second.overall_conditions, None);
        assert!(second.duplications.is_empty());
        assert_eq!(second.source, "}");
    }

    #[test]
    fn test_scm_date_formats() {
        let rfc = file("r,a,2017-07-14T08:00:00Z,,,,,,,,,,,,,x\n");
        let millis = file("r,a,1500019200000,,,,,,,,,,,,,x\n");

        assert_eq!(SourceLineConverter.convert(&rfc).unwrap()[0].scm_date, Some(1_500_019_200_000));
        assert_eq!(SourceLineConverter.convert(&millis).unwrap()[0].scm_date, Some(1_500_019_200_000));
    }

    #[test]
    fn test_empty_file_has_no_lines() {
        assert!(SourceLineConverter.convert(&file("")).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_field_count_names_file_and_line() {
        let data = ",,,,,,,,,,,,,,,a\nonly,three,fields\n";

        let err = SourceLineConverter.convert(&file(data)).unwrap_err();

        match err {
            QualgateError::Data { row_key, line, message } => {
                assert_eq!(row_key, "FILE_1");
                assert_eq!(line, Some(2));
                assert!(message.contains("expected 16 fields, got 3"));
            }
            other => panic!("Expected Data error, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_line_fails_instead_of_shifting_line_numbers() {
        let data = ",,,,,,,,,,,,,,,first\n\n,,,,,,,,,,,,,,,third\n";

        let err = SourceLineConverter.convert(&file(data)).unwrap_err();

        match err {
            QualgateError::Data { row_key, line, message } => {
                assert_eq!(row_key, "FILE_1");
                assert_eq!(line, Some(2));
                assert!(message.contains("empty line record"));
            }
            other => panic!("Expected Data error, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_blank_record_is_rejected() {
        let err = SourceLineConverter
            .convert(&file(",,,,,,,,,,,,,,,a\n\n"))
            .unwrap_err();

        assert!(matches!(err, QualgateError::Data { line: Some(2), .. }));
    }

    #[test]
    fn test_final_newline_keeps_line_numbers() {
        let with_newline = SourceLineConverter
            .convert(&file(",,,,,,,,,,,,,,,a\n,,,,,,,,,,,,,,,b\n"))
            .unwrap();
        let without_newline = SourceLineConverter
            .convert(&file(",,,,,,,,,,,,,,,a\n,,,,,,,,,,,,,,,b"))
            .unwrap();

        assert_eq!(with_newline, without_newline);
        let lines: Vec<_> = with_newline.iter().map(|d| (d.line, d.source.as_str())).collect();
        assert_eq!(lines, vec![(1, "a"), (2, "b")]);
        assert_eq!(with_newline[1].id, "FILE_1_2");
    }

    #[test]
    fn test_unparsable_number_is_data_error() {
        let err = SourceLineConverter
            .convert(&file(",,,many,,,,,,,,,,,,x\n"))
            .unwrap_err();

        assert!(err.to_string().contains("invalid ut_line_hits 'many'"));
    }

    #[test]
    fn test_documents_belong_to_file_and_project() {
        let doc = SourceLineConverter
            .convert(&file(",,,,,,,,,,,,,,,x\n"))
            .unwrap()
            .remove(0);

        assert_eq!(doc.parent_key(), "FILE_1");
        assert_eq!(doc.scope_key(), "PROJECT_1");
        assert!(SourceLineConverter.owns_parent());
    }
}
