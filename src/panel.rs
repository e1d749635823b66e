//! Panel normalization for raw per-store monthly sheets
//!
//! Converts heterogeneous tabular rows (one sheet per store, headers in
//! Portuguese or English, month tokens like `Set/2020`) into a canonical
//! numeric [`Panel`]. Rows that cannot be normalized are excluded and
//! counted, never fatal: partial data is the normal case in a multi-sheet
//! load.

use crate::factor::Factor;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single cell as handed over by a sheet reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawCell {
    /// Textual cell content (month tokens, or numbers as text)
    Text(String),
    /// Numeric cell content
    Number(f64),
    /// Blank cell
    Empty,
}

/// One raw sheet: the sheet name carries the store identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSheet {
    /// Sheet name, e.g. `Loja_A`; the token after the last `_` becomes
    /// the store id
    pub name: String,
    /// Header row, matched case/accent-insensitively against known aliases
    pub headers: Vec<String>,
    /// Data rows, index-aligned with `headers`
    pub rows: Vec<Vec<RawCell>>,
}

/// One store, one month, with the required sales figure and whatever
/// explanatory factors the row carried
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub store_id: String,
    /// Always the first day of the calendar month
    pub month: NaiveDate,
    pub sales: f64,
    pub avg_price: Option<f64>,
    pub competition_promotions: Option<f64>,
    pub staff_absences: Option<f64>,
    pub marketing_investment: Option<f64>,
    pub stock_percent: Option<f64>,
}

impl Observation {
    /// Value of one explanatory factor, if the row carried it
    pub fn factor(&self, factor: Factor) -> Option<f64> {
        match factor {
            Factor::AvgPrice => self.avg_price,
            Factor::CompetitionPromotions => self.competition_promotions,
            Factor::StaffAbsences => self.staff_absences,
            Factor::MarketingInvestment => self.marketing_investment,
            Factor::StockPercent => self.stock_percent,
        }
    }

    /// True when all five factors are present (complete case for the
    /// attribution fit)
    pub fn is_complete_case(&self) -> bool {
        Factor::ALL.iter().all(|f| self.factor(*f).is_some())
    }
}

/// The normalized cross-store, cross-month table
///
/// Immutable once built. Sorted by month ascending, ties broken by store id
/// ascending, so every downstream iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    observations: Vec<Observation>,
}

impl Panel {
    /// Build a panel from already-normalized observations
    ///
    /// Sorts into canonical order and drops duplicate `(store_id, month)`
    /// rows beyond the first encountered, returning how many were dropped.
    pub fn from_observations(observations: Vec<Observation>) -> (Self, usize) {
        let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();
        let mut unique = Vec::with_capacity(observations.len());
        let mut duplicates = 0;
        for obs in observations {
            if seen.insert((obs.store_id.clone(), obs.month)) {
                unique.push(obs);
            } else {
                duplicates += 1;
            }
        }
        unique.sort_by(|a, b| {
            a.month
                .cmp(&b.month)
                .then_with(|| a.store_id.cmp(&b.store_id))
        });
        (
            Panel {
                observations: unique,
            },
            duplicates,
        )
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct months present, ascending
    pub fn months(&self) -> Vec<NaiveDate> {
        let mut months: Vec<NaiveDate> = Vec::new();
        for obs in &self.observations {
            if months.last() != Some(&obs.month) {
                months.push(obs.month);
            }
        }
        months
    }
}

/// Row exclusion accounting surfaced to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    /// Total rows excluded from the panel
    pub excluded_rows: usize,
    /// Rows whose month token matched no recognized pattern
    pub unparseable_month: usize,
    /// Rows missing a usable (numeric, non-negative) sales value
    pub missing_sales: usize,
    /// Later rows sharing a `(store_id, month)` pair with an earlier one
    pub duplicate_rows: usize,
}

/// Canonical column a header can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Month,
    Sales,
    Factor(Factor),
}

/// Fold a single character: strip Portuguese diacritics, lowercase
fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        _ => c.to_ascii_lowercase(),
    }
}

/// Normalize a header for alias lookup: fold accents, lowercase, collapse
/// runs of non-alphanumerics to a single `_`, trim `_` at the ends
fn fold_header(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    let mut last_was_sep = false;
    for c in raw.trim().chars().map(fold_char) {
        if c.is_ascii_alphanumeric() {
            folded.push(c);
            last_was_sep = false;
        } else if !last_was_sep && !folded.is_empty() {
            folded.push('_');
            last_was_sep = true;
        }
    }
    while folded.ends_with('_') {
        folded.pop();
    }
    folded
}

/// Explicit table of recognized header variants
///
/// Unmatched headers are ignored rather than guessed at; the original
/// sheets also carry columns (e.g. a temperature reading) that feed no
/// computation here.
fn resolve_header(raw: &str) -> Option<Column> {
    match fold_header(raw).as_str() {
        "mes" | "month" => Some(Column::Month),
        "vendas" | "sales" => Some(Column::Sales),
        "preco_medio" | "avg_price" => Some(Column::Factor(Factor::AvgPrice)),
        "concorrencia_promocoes" | "competition_promotions" => {
            Some(Column::Factor(Factor::CompetitionPromotions))
        }
        "faltas_func" | "staff_absences" => Some(Column::Factor(Factor::StaffAbsences)),
        "investimento_marketing" | "marketing_investment" => {
            Some(Column::Factor(Factor::MarketingInvestment))
        }
        "estoque" | "estoque_perc" | "stock_percent" => {
            Some(Column::Factor(Factor::StockPercent))
        }
        _ => None,
    }
}

/// Month number for a localized three-letter abbreviation (pt-BR or English)
fn month_number(name: &str) -> Option<u32> {
    let folded: String = name.chars().map(fold_char).take(3).collect();
    match folded.as_str() {
        "jan" => Some(1),
        "fev" | "feb" => Some(2),
        "mar" => Some(3),
        "abr" | "apr" => Some(4),
        "mai" | "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "ago" | "aug" => Some(8),
        "set" | "sep" => Some(9),
        "out" | "oct" => Some(10),
        "nov" => Some(11),
        "dez" | "dec" => Some(12),
        _ => None,
    }
}

/// Parse a calendar-month token into the first day of that month
///
/// Accepted shapes, case-insensitive, with `/`, `-` or space separators:
/// `Set/2020`, `set-2020`, `Sep 2020`, `2020-09`, `09/2020`.
///
/// Callers selecting a target month for attribution use the same rules as
/// the normalizer.
pub fn parse_month_token(token: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = token
        .trim()
        .split(['/', '-', ' '])
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 2 {
        return None;
    }

    let (year, month) = if let (Ok(a), Ok(b)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>())
    {
        // Numeric: the 4-digit side is the year
        if parts[0].len() == 4 && parts[1].len() <= 2 {
            (a as i32, b)
        } else if parts[1].len() == 4 && parts[0].len() <= 2 {
            (b as i32, a)
        } else {
            return None;
        }
    } else {
        // Abbreviated month name followed by a 4-digit year
        let month = month_number(parts[0])?;
        if parts[1].len() != 4 {
            return None;
        }
        let year = parts[1].parse::<i32>().ok()?;
        (year, month)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Coerce a raw cell to a float; anything unparseable is missing
fn numeric(cell: &RawCell) -> Option<f64> {
    match cell {
        RawCell::Number(n) if n.is_finite() => Some(*n),
        RawCell::Number(_) => None,
        RawCell::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            // pt-BR sheets use the comma as decimal separator
            trimmed
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
        }
        RawCell::Empty => None,
    }
}

/// Store id from a sheet name: the token after the last `_`, or the whole
/// name (original sheets are `Loja_A`, `Loja_B`, `Loja_C`)
fn store_id_from_sheet(name: &str) -> String {
    match name.rsplit('_').next() {
        Some(suffix) if !suffix.is_empty() => suffix.to_string(),
        _ => name.to_string(),
    }
}

enum RowSkip {
    UnparseableMonth,
    MissingSales,
}

fn build_observation(
    store_id: &str,
    columns: &[Option<Column>],
    row: &[RawCell],
) -> Result<Observation, RowSkip> {
    let mut month = None;
    let mut sales = None;
    let mut factors: [Option<f64>; 5] = [None; 5];

    for (column, cell) in columns.iter().zip(row.iter()) {
        match column {
            Some(Column::Month) => {
                if let RawCell::Text(s) = cell {
                    month = parse_month_token(s);
                }
            }
            Some(Column::Sales) => sales = numeric(cell),
            Some(Column::Factor(factor)) => factors[factor.index()] = numeric(cell),
            None => {}
        }
    }

    let month = month.ok_or(RowSkip::UnparseableMonth)?;
    // Sales is the dependent variable of every downstream computation:
    // a row without it (or with a negative figure) carries no signal
    let sales = sales.filter(|s| *s >= 0.0).ok_or(RowSkip::MissingSales)?;

    Ok(Observation {
        store_id: store_id.to_string(),
        month,
        sales,
        avg_price: factors[0],
        competition_promotions: factors[1],
        staff_absences: factors[2],
        marketing_investment: factors[3],
        stock_percent: factors[4],
    })
}

/// Normalize raw sheets into a [`Panel`], reporting excluded rows
///
/// Never fails: rows that cannot be normalized are dropped and counted in
/// the [`NormalizeReport`] so the caller can render how much data survived.
pub fn normalize(sheets: &[RawSheet]) -> (Panel, NormalizeReport) {
    let mut report = NormalizeReport::default();
    let mut observations = Vec::new();

    for sheet in sheets {
        let store_id = store_id_from_sheet(&sheet.name);
        let columns: Vec<Option<Column>> =
            sheet.headers.iter().map(|h| resolve_header(h)).collect();

        for row in &sheet.rows {
            match build_observation(&store_id, &columns, row) {
                Ok(obs) => observations.push(obs),
                Err(RowSkip::UnparseableMonth) => report.unparseable_month += 1,
                Err(RowSkip::MissingSales) => report.missing_sales += 1,
            }
        }
    }

    let (panel, duplicates) = Panel::from_observations(observations);
    report.duplicate_rows = duplicates;
    report.excluded_rows =
        report.unparseable_month + report.missing_sales + report.duplicate_rows;

    if report.excluded_rows > 0 {
        tracing::warn!(
            "normalization excluded {} rows ({} unparseable month, {} missing sales, {} duplicate)",
            report.excluded_rows,
            report.unparseable_month,
            report.missing_sales,
            report.duplicate_rows
        );
    }

    (panel, report)
}
