use crate::domain::model::FilmRecord;

/// 只保留年份完全相同的紀錄，保持原本順序
pub fn filter_by_year(records: Vec<FilmRecord>, year: &str) -> Vec<FilmRecord> {
    records.into_iter().filter(|r| r.year == year).collect()
}
