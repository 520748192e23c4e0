use crate::domain::model::FilmRecord;
use crate::utils::error::{FilmMapError, Result};
use crate::utils::validation::is_valid_year;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 地點清單檔案開頭固定的說明行數
pub const DEFAULT_HEADER_LINES: usize = 14;

/// 地點字串最多保留的逗號分段數
const MAX_PLACE_SEGMENTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no '(year)' group in the title field")]
    MissingYear,

    #[error("year '{0}' is not four digits")]
    InvalidYear(String),

    #[error("empty title before the year")]
    MissingTitle,

    #[error("no location field after the title")]
    MissingPlace,
}

/// 遇到格式錯誤的行時要略過還是中止
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    #[default]
    Skip,
    Abort,
}

#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub records: Vec<FilmRecord>,
    pub skipped: usize,
}

/// 解析單一行（tab 分隔）
pub fn parse_line(line: &str) -> std::result::Result<FilmRecord, ParseError> {
    let fields: Vec<&str> = line.trim().split('\t').collect();
    parse_fields(&fields)
}

pub fn parse_fields(fields: &[&str]) -> std::result::Result<FilmRecord, ParseError> {
    let mut fields = fields.iter().map(|f| f.trim());
    let head = fields.next().ok_or(ParseError::MissingYear)?;

    let open = head.find('(').ok_or(ParseError::MissingYear)?;
    let close = head[open..]
        .find(')')
        .map(|i| open + i)
        .ok_or(ParseError::MissingYear)?;

    let year = head[open + 1..close].trim();
    if !is_valid_year(year) {
        return Err(ParseError::InvalidYear(year.to_string()));
    }

    let title = head[..open].trim_end();
    if title.is_empty() {
        return Err(ParseError::MissingTitle);
    }

    let episode = head[close + 1..].trim();
    let episode = (!episode.is_empty()).then(|| episode.to_string());

    // 空欄位直接丟掉
    let candidates: Vec<&str> = fields.filter(|f| !f.is_empty()).collect();
    let place = match candidates.as_slice() {
        [] => return Err(ParseError::MissingPlace),
        [.., previous, last] if last.contains('(') => *previous,
        [.., last] => *last,
    };

    Ok(FilmRecord {
        title: title.to_string(),
        year: year.to_string(),
        place: collapse_place(place),
        episode,
    })
}

/// 超過三段時只留最後三段（城市、地區、國家）
pub fn collapse_place(place: &str) -> String {
    let segments: Vec<&str> = place.split(", ").collect();
    if segments.len() > MAX_PLACE_SEGMENTS {
        segments[segments.len() - MAX_PLACE_SEGMENTS..].join(", ")
    } else {
        place.to_string()
    }
}

/// 解析整個檔案內容，先略過固定的檔頭
pub fn parse_lines(
    text: &str,
    header_lines: usize,
    policy: MalformedPolicy,
) -> Result<ParseReport> {
    let body_offset = text
        .match_indices('\n')
        .nth(header_lines.saturating_sub(1))
        .map(|(i, _)| i + 1);
    let body = match (header_lines, body_offset) {
        (0, _) => text,
        (_, Some(offset)) => &text[offset..],
        (_, None) => "",
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(body.as_bytes());

    let mut report = ParseReport::default();
    for row in reader.records() {
        let row = row?;
        let line = header_lines
            + row
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(report.records.len() + report.skipped + 1);

        if row.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let fields: Vec<&str> = row.iter().collect();
        match parse_fields(&fields) {
            Ok(record) => report.records.push(record),
            Err(source) => match policy {
                MalformedPolicy::Skip => {
                    tracing::warn!("⚠️ Skipping malformed line {}: {}", line, source);
                    report.skipped += 1;
                }
                MalformedPolicy::Abort => {
                    return Err(FilmMapError::Parse { line, source });
                }
            },
        }
    }

    tracing::debug!(
        "Parsed {} records ({} skipped)",
        report.records.len(),
        report.skipped
    );
    Ok(report)
}
