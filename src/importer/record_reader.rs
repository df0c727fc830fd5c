// ==========================================
// 批量导入系统 - 记录读取器
// ==========================================
// 职责: 字符流 → 惰性、有限、不可重启的原始行序列
// 规则:
// - 第一行无论内容一律视为表头并丢弃
// - 列数不足的行标记为 malformed，序列继续
// - 引号内的分隔符不作为列分隔（由 csv 引号状态机处理）
// - 底层流读取失败为致命错误，之后序列终止
// ==========================================

use crate::importer::error::{ImportError, ImporterResult};
use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::io::{BufRead, BufReader, Read};
use tracing::debug;

pub const MALFORMED_ROW: &str = "malformed row";

// ==========================================
// ReaderOptions - 分隔/引号配置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
        }
    }
}

// ==========================================
// RawRow - 原始行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRow {
    /// 列数满足要求的行（字段未 TRIM）
    Fields { line: usize, fields: Vec<String> },
    /// 无法按 Schema 使用的行
    Malformed { line: usize, reason: String },
}

impl RawRow {
    pub fn line(&self) -> usize {
        match self {
            RawRow::Fields { line, .. } | RawRow::Malformed { line, .. } => *line,
        }
    }
}

// ==========================================
// RecordReader
// ==========================================
// 表头按物理行丢弃（读到第一个换行符为止），之后的内容交给 csv 解析；
// csv 会跳过空行，若由它识别表头，开头的空行会让第一条数据行被当作表头吞掉
enum ReaderState<R: Read> {
    Pending { source: R, options: ReaderOptions },
    Records(StringRecordsIntoIter<BufReader<R>>),
    Done,
}

pub struct RecordReader<R: Read> {
    state: ReaderState<R>,
    min_columns: usize,
    next_line: usize,
}

impl<R: Read> RecordReader<R> {
    pub fn new(source: R, min_columns: usize, options: ReaderOptions) -> Self {
        Self {
            state: ReaderState::Pending { source, options },
            min_columns,
            next_line: 1,
        }
    }

    /// 丢弃第一物理行并构建 csv 读取器；流为空时返回 Ok(None)
    fn open(
        source: R,
        options: ReaderOptions,
    ) -> ImporterResult<Option<StringRecordsIntoIter<BufReader<R>>>> {
        let mut buffered = BufReader::new(source);
        let mut header = Vec::new();
        if buffered.read_until(b'\n', &mut header)? == 0 {
            return Ok(None);
        }
        debug!(bytes = header.len(), "表头已丢弃");

        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致，列数由本读取器判定
            .delimiter(options.delimiter)
            .quote(options.quote)
            .from_reader(buffered);
        Ok(Some(reader.into_records()))
    }

    fn fail(&mut self, err: ImportError) -> Option<ImporterResult<RawRow>> {
        self.state = ReaderState::Done;
        Some(Err(err))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = ImporterResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if let ReaderState::Pending { .. } = self.state {
            let ReaderState::Pending { source, options } =
                std::mem::replace(&mut self.state, ReaderState::Done)
            else {
                return None;
            };
            match Self::open(source, options) {
                Ok(Some(records)) => self.state = ReaderState::Records(records),
                Ok(None) => return None,
                Err(e) => return self.fail(e),
            }
        }

        let ReaderState::Records(records) = &mut self.state else {
            return None;
        };
        let result = match records.next() {
            None => {
                self.state = ReaderState::Done;
                return None;
            }
            Some(result) => result,
        };

        let line = self.next_line;
        self.next_line += 1;

        match result {
            Ok(record) if record.len() < self.min_columns => Some(Ok(RawRow::Malformed {
                line,
                reason: format!(
                    "{}: expected at least {} columns, found {}",
                    MALFORMED_ROW,
                    self.min_columns,
                    record.len()
                ),
            })),
            Ok(record) => Some(Ok(RawRow::Fields {
                line,
                fields: record.iter().map(str::to_string).collect(),
            })),
            Err(e) if e.is_io_error() => self.fail(ImportError::from(e)),
            Err(e) => Some(Ok(RawRow::Malformed {
                line,
                reason: format!("{}: {}", MALFORMED_ROW, e),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn read_all(input: &str, min_columns: usize) -> Vec<RawRow> {
        RecordReader::new(input.as_bytes(), min_columns, ReaderOptions::default())
            .collect::<ImporterResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_header_is_discarded_regardless_of_content() {
        let rows = read_all("1,looks,like,data\n2,real,row,x\n", 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            RawRow::Fields {
                line: 1,
                fields: vec!["2".into(), "real".into(), "row".into(), "x".into()],
            }
        );
    }

    #[test]
    fn test_blank_first_line_is_the_header() {
        let rows = read_all("\nA,B\nC,D\n", 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line(), 1);
        assert_eq!(
            rows[0],
            RawRow::Fields {
                line: 1,
                fields: vec!["A".into(), "B".into()],
            }
        );
        assert_eq!(rows[1].line(), 2);
    }

    #[test]
    fn test_non_utf8_header_is_discarded() {
        let input: &[u8] = b"\xff\xfe,h2\nA,B\n";
        let rows: Vec<_> = RecordReader::new(input, 2, ReaderOptions::default())
            .collect::<ImporterResult<Vec<_>>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line(), 1);
    }

    #[test]
    fn test_short_row_is_malformed_and_reading_continues() {
        let rows = read_all("h1,h2,h3\nA,B,C\nonly\nD,E,F\n", 3);
        assert_eq!(rows.len(), 3);
        assert!(matches!(rows[1], RawRow::Malformed { line: 2, ref reason } if reason.starts_with(MALFORMED_ROW)));
        assert_eq!(rows[2].line(), 3);
    }

    #[test]
    fn test_quoted_field_keeps_delimiter() {
        let rows = read_all("code,title\nA1,\"Intro, part 1\"\n", 2);
        match &rows[0] {
            RawRow::Fields { fields, .. } => assert_eq!(fields[1], "Intro, part 1"),
            other => panic!("unexpected row: {:?}", other),
        }
    }

    #[test]
    fn test_custom_delimiter() {
        let options = ReaderOptions {
            delimiter: b';',
            quote: b'\'',
        };
        let rows: Vec<_> = RecordReader::new("a;b\nX;'1;2'\n".as_bytes(), 2, options)
            .collect::<ImporterResult<Vec<_>>>()
            .unwrap();
        assert_eq!(
            rows[0],
            RawRow::Fields {
                line: 1,
                fields: vec!["X".into(), "1;2".into()],
            }
        );
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(read_all("", 1).is_empty());
        assert!(read_all("only,header\n", 1).is_empty());
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::Other, "disk gone"));
            }
            self.served = true;
            let data = b"h1,h2\nA,B\n";
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }
    }

    #[test]
    fn test_stream_failure_is_fatal() {
        let reader = RecordReader::new(FailingReader { served: false }, 2, ReaderOptions::default());
        let results: Vec<_> = reader.collect();

        assert!(results.iter().any(|r| matches!(r, Err(ImportError::SourceReadError(_)))));
        // 致命错误后序列终止
        assert!(matches!(results.last(), Some(Err(_))));
    }
}
