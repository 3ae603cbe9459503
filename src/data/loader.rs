//! Load a normalised case table from CSV or Parquet into a [`CaseTable`].

use std::{fs::File, path::Path};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use polars::prelude::{CsvReadOptions, DataFrame, DataType, ParquetReader, SerReader};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::{
    data::cases::{Case, CaseTable, ColumnSet, Outcome},
    error::{EngineError, Result},
    index::DatasetVersion,
};

const CASE_ID_COLUMNS: &[&str] = &["case_id", "caseid", "primaryid"];
const DRUG_COLUMNS: &[&str] = &["drug_names", "drug_name", "drugs", "drug", "drugname"];
const REACTION_COLUMNS: &[&str] = &["reactions", "reaction", "pt", "event"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[;|,]").expect("valid regex"));

/// Read a case table from disk. `.parquet` files go through the Parquet
/// reader; anything else is treated as CSV with a header row.
pub fn load_case_table(path: &Path, version: DatasetVersion) -> Result<CaseTable> {
    let df = read_frame(path)?;
    info!(path = %path.display(), rows = df.height(), "read case table");
    frame_to_table(&df, version)
}

fn read_frame(path: &Path) -> Result<DataFrame> {
    let is_parquet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        Ok(ParquetReader::new(File::open(path)?).finish()?)
    } else {
        // Schema inference is disabled so every column arrives as text and is
        // parsed here, independent of what polars would guess.
        Ok(CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?)
    }
}

/// Extract one column as optional strings, or `None` when the column is absent.
fn text_column(df: &DataFrame, names: &[&str]) -> Result<Option<Vec<Option<String>>>> {
    for name in names {
        let Ok(column) = df.column(name) else {
            continue;
        };
        let casted = column.cast(&DataType::String)?;
        let values = casted.str()?;
        let mut out = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            out.push(
                values
                    .get(idx)
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string),
            );
        }
        return Ok(Some(out));
    }
    Ok(None)
}

fn required_column(df: &DataFrame, names: &[&str]) -> Result<Vec<Option<String>>> {
    text_column(df, names)?.ok_or_else(|| {
        EngineError::Load(format!("missing required column (one of {})", names.join(", ")))
    })
}

/// Split a delimited multi-valued cell into its terms.
pub fn split_list(raw: &str) -> Vec<String> {
    LIST_SEPARATOR
        .split(raw)
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            // Datetime strings: keep the date part.
            raw.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "y" | "yes" => Some(true),
        "0" | "2" | "false" | "f" | "n" | "no" => Some(false),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn frame_to_table(df: &DataFrame, version: DatasetVersion) -> Result<CaseTable> {
    let case_ids = required_column(df, CASE_ID_COLUMNS)?;
    let drugs = required_column(df, DRUG_COLUMNS)?;
    let reactions = required_column(df, REACTION_COLUMNS)?;

    let event_date = text_column(df, &["event_date", "event_dt"])?;
    let age = text_column(df, &["age"])?;
    let sex = text_column(df, &["sex", "gender"])?;
    let region = text_column(df, &["region", "country", "reporter_country"])?;
    let indication = text_column(df, &["indication", "indi_pt"])?;
    let dose = text_column(df, &["dose", "dose_amt"])?;
    let weight = text_column(df, &["weight", "wt"])?;
    let serious = text_column(df, &["serious"])?;
    let outcome = text_column(df, &["outcome", "outc_cod"])?;
    let onset_date = text_column(df, &["onset_date"])?;
    let start_date = text_column(df, &["start_date", "start_dt"])?;

    let columns = ColumnSet {
        event_date: event_date.is_some(),
        age: age.is_some(),
        sex: sex.is_some(),
        region: region.is_some(),
        indication: indication.is_some(),
        dose: dose.is_some(),
        weight: weight.is_some(),
        serious: serious.is_some(),
        outcome: outcome.is_some(),
        onset_date: onset_date.is_some(),
        start_date: start_date.is_some(),
    };
    debug!(?columns, "optional columns present");

    let cell = |column: &Option<Vec<Option<String>>>, idx: usize| -> Option<String> {
        column.as_ref().and_then(|values| values[idx].clone())
    };

    let mut malformed = 0usize;
    let mut cases = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let Some(case_id) = case_ids[idx].clone() else {
            malformed += 1;
            continue;
        };
        let outcome_value = cell(&outcome, idx)
            .map(|raw| Outcome::parse(&raw))
            .unwrap_or_default();
        // Without a seriousness column, a fatal outcome is the only evidence of seriousness.
        let serious_value = match cell(&serious, idx) {
            Some(raw) => parse_flag(&raw).unwrap_or(false),
            None if !columns.serious => outcome_value == Outcome::Death,
            None => false,
        };
        let parse_opt_date = |column: &Option<Vec<Option<String>>>, malformed: &mut usize| {
            cell(column, idx).and_then(|raw| {
                let parsed = parse_date(&raw);
                if parsed.is_none() {
                    *malformed += 1;
                }
                parsed
            })
        };
        let event = parse_opt_date(&event_date, &mut malformed);
        let onset = parse_opt_date(&onset_date, &mut malformed);
        let start = parse_opt_date(&start_date, &mut malformed);
        cases.push(Case {
            case_id,
            drugs: drugs[idx].as_deref().map(split_list).unwrap_or_default(),
            reactions: reactions[idx].as_deref().map(split_list).unwrap_or_default(),
            event_date: event,
            age: cell(&age, idx).and_then(|raw| parse_number(&raw)),
            sex: cell(&sex, idx).map(|raw| raw.to_ascii_uppercase()),
            region: cell(&region, idx),
            indication: cell(&indication, idx).map(|raw| raw.to_lowercase()),
            dose: cell(&dose, idx),
            weight: cell(&weight, idx).and_then(|raw| parse_number(&raw)),
            serious: serious_value,
            outcome: outcome_value,
            onset_date: onset,
            start_date: start,
        });
    }
    if malformed > 0 {
        warn!(malformed, "skipped malformed cells while loading case table");
    }
    let table = CaseTable::with_columns(version, columns, cases);
    info!(version = %version, cases = table.len(), "built case table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_mixed_delimiters() {
        assert_eq!(
            split_list("Aspirin; ibuprofen|naproxen , "),
            vec!["Aspirin", "ibuprofen", "naproxen"]
        );
    }

    #[test]
    fn parses_faers_compact_dates() {
        assert_eq!(parse_date("20240315"), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(parse_date("2024-03-15T10:00:00"), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("Y"), Some(true));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
