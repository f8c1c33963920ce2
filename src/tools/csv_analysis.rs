//! CSV preview and statistical analysis tools
//!
//! A column counts as numeric when every non-empty cell parses as a finite
//! number. Statistics use the sample standard deviation and linearly
//! interpolated quartiles.

use crate::tools::{normalize_path, Tool};
use crate::Result;
use std::path::Path;

const PREVIEW_ROWS: usize = 5;

pub const NO_NUMERIC_DATA: &str =
    "File read, but no numeric data (price, quantity, etc.) found to analyze.";

#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::parse(&bytes)
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map(String::as_str).unwrap_or("")
    }

    /// Numeric columns in header order; missing cells are `None`.
    pub fn numeric_columns(&self) -> Vec<NumericColumn> {
        let mut columns = Vec::new();

        for (index, name) in self.headers.iter().enumerate() {
            let mut values = Vec::with_capacity(self.rows.len());
            let mut numeric = true;
            let mut seen = 0;

            for row in 0..self.rows.len() {
                let raw = self.cell(row, index);
                if raw.is_empty() {
                    values.push(None);
                    continue;
                }
                match raw.parse::<f64>() {
                    Ok(v) if v.is_finite() => {
                        seen += 1;
                        values.push(Some(v));
                    }
                    Ok(_) => values.push(None),
                    Err(_) => {
                        numeric = false;
                        break;
                    }
                }
            }

            if numeric && seen > 0 {
                columns.push(NumericColumn {
                    name: name.clone(),
                    values,
                });
            }
        }

        columns
    }
}

#[derive(Debug, Clone)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl NumericColumn {
    fn present(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> ColumnStats {
    let count = values.len();
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    ColumnStats {
        count,
        mean: mean(values),
        std: sample_std(values),
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q25: quantile(&sorted, 0.25),
        q50: quantile(&sorted, 0.50),
        q75: quantile(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTrend {
    pub start: f64,
    pub end: f64,
    pub change_pct: f64,
    pub volatility_pct: f64,
}

impl ColumnTrend {
    pub fn direction(&self) -> &'static str {
        if self.change_pct > 0.0 {
            "UPTREND"
        } else if self.change_pct < 0.0 {
            "DOWNTREND"
        } else {
            "FLAT"
        }
    }
}

/// Start/end/percent change and coefficient of variation of a column.
/// Both percentages are 0 when their denominator is 0.
pub fn trend(values: &[f64]) -> Option<ColumnTrend> {
    let start = *values.first()?;
    let end = *values.last()?;

    let change_pct = if start != 0.0 {
        (end - start) / start * 100.0
    } else {
        0.0
    };

    let m = mean(values);
    let std = sample_std(values);
    let volatility_pct = if m != 0.0 && std.is_finite() {
        std / m * 100.0
    } else {
        0.0
    };

    Some(ColumnTrend {
        start,
        end,
        change_pct,
        volatility_pct,
    })
}

/// Pearson correlation over rows where both columns have a value.
pub fn correlation(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        f64::NAN
    } else {
        cov / denom
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{:.4}", value)
    }
}

/// Left-aligned plain text table.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i >= widths.len() {
                widths.push(0);
            }
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render_row = |cells: &[String]| -> String {
        widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                format!("{:<width$}", cell, width = *w)
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(headers)];
    lines.extend(rows.iter().map(|r| render_row(r)));
    lines.join("\n")
}

pub fn render_preview(table: &CsvTable) -> String {
    if table.rows.is_empty() {
        return "File is empty.".to_string();
    }

    let head: Vec<Vec<String>> = table.rows.iter().take(PREVIEW_ROWS).cloned().collect();
    let tail_start = table.rows.len().saturating_sub(PREVIEW_ROWS);
    let tail: Vec<Vec<String>> = table.rows[tail_start..].to_vec();

    format!(
        "FILE INFO:\n- Columns: {:?}\n- Total Rows: {}\n\n--- FIRST {} ROWS ---\n{}\n\n--- LAST {} ROWS ---\n{}",
        table.headers,
        table.rows.len(),
        PREVIEW_ROWS,
        render_table(&table.headers, &head),
        PREVIEW_ROWS,
        render_table(&table.headers, &tail),
    )
}

pub fn render_analysis(table: &CsvTable) -> String {
    if table.rows.is_empty() {
        return "File is empty.".to_string();
    }

    let columns = table.numeric_columns();
    if columns.is_empty() {
        return NO_NUMERIC_DATA.to_string();
    }

    // 1. describe() style statistics, one row per statistic
    let stats: Vec<ColumnStats> = columns.iter().map(|c| describe(&c.present())).collect();
    let mut stat_headers = vec![String::new()];
    stat_headers.extend(columns.iter().map(|c| c.name.clone()));

    let getters: [(&str, fn(&ColumnStats) -> f64); 8] = [
        ("count", |s| s.count as f64),
        ("mean", |s| s.mean),
        ("std", |s| s.std),
        ("min", |s| s.min),
        ("25%", |s| s.q25),
        ("50%", |s| s.q50),
        ("75%", |s| s.q75),
        ("max", |s| s.max),
    ];

    let stat_rows: Vec<Vec<String>> = getters
        .iter()
        .map(|(label, getter)| {
            let mut row = vec![label.to_string()];
            row.extend(stats.iter().map(|s| format_number(getter(s))));
            row
        })
        .collect();

    // 2. trend and risk per column
    let trend_text = columns
        .iter()
        .filter_map(|c| trend(&c.present()).map(|t| (c, t)))
        .map(|(c, t)| {
            format!(
                "--- COLUMN: {} ---\n   • Start Value: {}\n   • End Value: {}\n   • Total Change: {:.2}% ({})\n   • Volatility (Risk): {:.2}% (Higher value = Higher fluctuation)\n",
                c.name,
                format_number(t.start),
                format_number(t.end),
                t.change_pct,
                t.direction(),
                t.volatility_pct
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    // 3. correlation matrix
    let correlation_text = if columns.len() > 1 {
        let mut rows = Vec::with_capacity(columns.len());
        for a in &columns {
            let mut row = vec![a.name.clone()];
            for b in &columns {
                row.push(format!("{:.2}", correlation(&a.values, &b.values)));
            }
            rows.push(row);
        }
        format!(
            "\n\n--- CORRELATION MATRIX ---\n{}\n(1.00 = Perfect correlation, -1.00 = Inverse correlation, 0 = No correlation)",
            render_table(&stat_headers, &rows)
        )
    } else {
        String::new()
    };

    format!(
        "DETAILED DATA ANALYSIS REPORT:\nTotal Rows: {}\n\n1. BASIC STATISTICS:\n{}\n\n2. TREND AND RISK ANALYSIS:\n{}{}",
        table.rows.len(),
        render_table(&stat_headers, &stat_rows),
        trend_text,
        correlation_text
    )
}

fn missing_file(path: &Path) -> String {
    format!("ERROR: '{}' not found.", path.display())
}

//
// ================= Tools =================
//

pub struct ReadCsvPreviewTool;

#[async_trait::async_trait]
impl Tool for ReadCsvPreviewTool {
    fn name(&self) -> &'static str {
        "read_csv_preview"
    }

    fn description(&self) -> &'static str {
        "Reads the first 5 rows of a CSV file to understand its structure/columns. Input: File path."
    }

    async fn execute(&self, argument: &str) -> Result<String> {
        let path = normalize_path(argument);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(missing_file(&path));
        }
        let table = CsvTable::load(&path).await?;
        Ok(render_preview(&table))
    }
}

pub struct AnalyzeFullCsvTool;

#[async_trait::async_trait]
impl Tool for AnalyzeFullCsvTool {
    fn name(&self) -> &'static str {
        "analyze_full_csv"
    }

    fn description(&self) -> &'static str {
        "Performs deep statistical analysis (Trend, Volatility, Mean) on a CSV file. Input: File path."
    }

    async fn execute(&self, argument: &str) -> Result<String> {
        let path = normalize_path(argument);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(missing_file(&path));
        }
        let table = CsvTable::load(&path).await?;
        Ok(render_analysis(&table))
    }
}
