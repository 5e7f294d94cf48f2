//! Comparison-table building: filter the flat result set, pivot it into
//! benchmark rows against (language, model) columns, and render the
//! pivot as aligned plain text.

use crate::records::{MetricRecord, ResultSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Row filter over the result set. An empty selection list means that
/// dimension is unrestricted.
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    pub models: Vec<String>,
    pub benchmarks: Vec<String>,
    pub languages: Vec<String>,
}

impl TableFilter {
    pub fn matches(&self, record: &MetricRecord) -> bool {
        selected(&self.models, &record.model)
            && selected(&self.benchmarks, &record.benchmark)
            && selected(&self.languages, &record.language)
    }
}

fn selected(selection: &[String], value: &str) -> bool {
    selection.is_empty() || selection.iter().any(|s| s == value)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotColumn {
    pub language: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub benchmark: String,
    /// One cell per column, `None` where the combination was never run.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub columns: Vec<PivotColumn>,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }
}

/// Pivot the filtered records into benchmark rows and (language, model)
/// columns, averaging duplicate cells. Rows and columns come out sorted.
pub fn pivot(results: &ResultSet, filter: &TableFilter) -> PivotTable {
    let mut cells: BTreeMap<(String, String, String), (f64, u32)> = BTreeMap::new();
    let mut benchmarks: BTreeSet<String> = BTreeSet::new();
    let mut columns: BTreeSet<(String, String)> = BTreeSet::new();

    for record in results.iter().filter(|r| filter.matches(r)) {
        benchmarks.insert(record.benchmark.clone());
        columns.insert((record.language.clone(), record.model.clone()));
        let cell = cells
            .entry((
                record.benchmark.clone(),
                record.language.clone(),
                record.model.clone(),
            ))
            .or_insert((0.0, 0));
        cell.0 += record.value;
        cell.1 += 1;
    }

    let columns: Vec<PivotColumn> = columns
        .into_iter()
        .map(|(language, model)| PivotColumn { language, model })
        .collect();
    let rows = benchmarks
        .into_iter()
        .map(|benchmark| {
            let values = columns
                .iter()
                .map(|col| {
                    cells
                        .get(&(benchmark.clone(), col.language.clone(), col.model.clone()))
                        .map(|(sum, count)| sum / f64::from(*count))
                })
                .collect();
            PivotRow { benchmark, values }
        })
        .collect();

    PivotTable { columns, rows }
}

/// Render the pivot with aligned columns, `-` for missing cells, and
/// `precision` decimal places per value.
pub fn render(table: &PivotTable, precision: usize) -> String {
    if table.is_empty() {
        return String::from("(no results)\n");
    }

    let mut headers = vec!["benchmark".to_string()];
    headers.extend(
        table
            .columns
            .iter()
            .map(|col| format!("{}/{}", col.language, col.model)),
    );

    let mut grid: Vec<Vec<String>> = vec![headers];
    for row in &table.rows {
        let mut cells = vec![row.benchmark.clone()];
        cells.extend(row.values.iter().map(|value| match value {
            Some(v) => format!("{v:.precision$}"),
            None => "-".to_string(),
        }));
        grid.push(cells);
    }

    let cols = grid[0].len();
    let mut widths = vec![0usize; cols];
    for row in &grid {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    for (ri, row) in grid.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
        if ri == 0 {
            out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (cols - 1)));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str, benchmark: &str, language: &str, value: f64) -> MetricRecord {
        MetricRecord {
            model: model.to_string(),
            benchmark: benchmark.to_string(),
            language: language.to_string(),
            task: format!("{benchmark}_{language}"),
            metric: "acc".to_string(),
            value,
        }
    }

    fn result_set(records: Vec<MetricRecord>) -> ResultSet {
        let mut set = ResultSet::new();
        set.extend(records);
        set
    }

    #[test]
    fn pivot_places_values_by_benchmark_and_column() {
        let set = result_set(vec![
            record("modelA", "mmlu", "en", 0.42),
            record("modelB", "mmlu", "en", 0.52),
            record("modelA", "arc", "de", 0.30),
        ]);

        let table = pivot(&set, &TableFilter::default());
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.rows.len(), 2);

        // Rows sorted by benchmark, columns by (language, model).
        assert_eq!(table.rows[0].benchmark, "arc");
        assert_eq!(table.columns[0].language, "de");
        assert_eq!(table.columns[1].model, "modelA");

        // arc/de exists only for modelA.
        assert_eq!(table.rows[0].values[0], Some(0.30));
        assert_eq!(table.rows[0].values[1], None);
        assert_eq!(table.rows[1].values[1], Some(0.42));
        assert_eq!(table.rows[1].values[2], Some(0.52));
    }

    #[test]
    fn pivot_averages_duplicate_cells() {
        let set = result_set(vec![
            record("modelA", "mmlu", "en", 0.4),
            record("modelA", "mmlu", "en", 0.6),
        ]);

        let table = pivot(&set, &TableFilter::default());
        assert_eq!(table.rows[0].values[0], Some(0.5));
    }

    #[test]
    fn filter_restricts_each_dimension() {
        let set = result_set(vec![
            record("modelA", "mmlu", "en", 0.1),
            record("modelB", "mmlu", "en", 0.2),
            record("modelA", "arc", "de", 0.3),
        ]);

        let filter = TableFilter {
            models: vec!["modelA".to_string()],
            ..Default::default()
        };
        let table = pivot(&set, &filter);
        assert_eq!(table.columns.len(), 2);
        assert!(table.columns.iter().all(|c| c.model == "modelA"));

        let filter = TableFilter {
            languages: vec!["de".to_string()],
            ..Default::default()
        };
        let table = pivot(&set, &filter);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].benchmark, "arc");
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = TableFilter::default();
        assert!(filter.matches(&record("any", "thing", "xx", 0.0)));
    }

    #[test]
    fn filter_with_no_survivors_gives_empty_pivot() {
        let set = result_set(vec![record("modelA", "mmlu", "en", 0.1)]);
        let filter = TableFilter {
            models: vec!["ghost".to_string()],
            ..Default::default()
        };
        assert!(pivot(&set, &filter).is_empty());
    }

    #[test]
    fn render_aligns_and_marks_missing_cells() {
        let set = result_set(vec![
            record("modelA", "mmlu", "en", 0.42),
            record("modelB", "arc", "en", 0.9),
        ]);
        let text = render(&pivot(&set, &TableFilter::default()), 4);

        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("benchmark"));
        assert!(lines[0].contains("en/modelA"));
        assert!(lines[0].contains("en/modelB"));
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(text.contains("0.4200"));
        assert!(text.contains("0.9000"));

        // arc row has a value for modelB only.
        let arc_line = lines.iter().find(|l| l.starts_with("arc")).unwrap();
        let cells: Vec<&str> = arc_line.split_whitespace().collect();
        assert_eq!(cells, vec!["arc", "-", "0.9000"]);
    }

    #[test]
    fn render_honors_precision() {
        let set = result_set(vec![record("m", "mmlu", "en", 0.123456)]);
        let text = render(&pivot(&set, &TableFilter::default()), 2);
        assert!(text.contains("0.12"));
        assert!(!text.contains("0.1235"));
    }

    #[test]
    fn render_empty_table() {
        let table = pivot(&ResultSet::new(), &TableFilter::default());
        assert_eq!(render(&table, 4), "(no results)\n");
    }
}
