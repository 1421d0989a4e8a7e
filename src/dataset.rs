use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{PrepError, Result};
use crate::types::CellValue;

/// Stable identifier of a data row, assigned at ingestion and kept across filtering.
pub type RowIndex = usize;

/// One row of a [`Dataset`], carrying its stable index.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub index: RowIndex,
    pub cells: Vec<CellValue>,
}

/// An ordered, in-memory table.
///
/// Filtering never mutates a dataset; every narrowing step returns a new one that
/// holds a subset of the rows with their original indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a dataset from cell rows, indexing them by position.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut dataset = Self::new(columns);
        for (index, cells) in rows.into_iter().enumerate() {
            dataset.push_row(index, cells)?;
        }
        Ok(dataset)
    }

    /// Append a row. Indices must be strictly increasing.
    pub fn push_row(&mut self, index: RowIndex, cells: Vec<CellValue>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(PrepError::InvalidArgument(format!(
                "row {} has {} cells but the dataset has {} columns",
                index,
                cells.len(),
                self.columns.len()
            )));
        }
        if let Some(last) = self.rows.last() {
            if index <= last.index {
                return Err(PrepError::InvalidArgument(format!(
                    "row index {} does not follow {}",
                    index, last.index
                )));
            }
        }
        self.rows.push(Row { index, cells });
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_position(name).is_some()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn indices(&self) -> Vec<RowIndex> {
        self.rows.iter().map(|r| r.index).collect()
    }

    /// Extract a named column as a series keyed by row index.
    pub fn column(&self, name: &str) -> Result<Series<CellValue>> {
        let pos = self
            .column_position(name)
            .ok_or_else(|| PrepError::ColumnNotFound(name.to_string()))?;
        let entries = self
            .rows
            .iter()
            .map(|r| (r.index, r.cells[pos].clone()))
            .collect();
        Ok(Series::from_entries(name, entries))
    }

    /// New dataset holding only the rows whose index is in `keep`.
    pub fn select(&self, keep: &BTreeSet<RowIndex>) -> Dataset {
        self.filter_rows(|row| keep.contains(&row.index))
    }

    /// New dataset holding every row except those whose index is in `drop`.
    pub fn exclude(&self, drop: &BTreeSet<RowIndex>) -> Dataset {
        self.filter_rows(|row| !drop.contains(&row.index))
    }

    /// New dataset without the rows whose value in `column` is missing.
    pub fn drop_missing(&self, column: &str) -> Result<Dataset> {
        let pos = self
            .column_position(column)
            .ok_or_else(|| PrepError::ColumnNotFound(column.to_string()))?;
        Ok(self.filter_rows(|row| !row.cells[pos].is_null()))
    }

    fn filter_rows<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Row) -> bool,
    {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

/// A named sequence of values keyed by row index.
#[derive(Debug, Clone, PartialEq)]
pub struct Series<T> {
    name: String,
    entries: Vec<(RowIndex, T)>,
}

/// Cleaned feature text keyed by row index.
pub type TextColumn = Series<String>;

/// Cleaned target labels keyed by row index.
pub type LabelColumn = Series<String>;

impl<T> Series<T> {
    pub fn from_entries(name: impl Into<String>, entries: Vec<(RowIndex, T)>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(RowIndex, T)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &(RowIndex, T)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn indices(&self) -> Vec<RowIndex> {
        self.entries.iter().map(|(i, _)| *i).collect()
    }

    pub fn index_set(&self) -> BTreeSet<RowIndex> {
        self.entries.iter().map(|(i, _)| *i).collect()
    }

    pub fn get(&self, index: RowIndex) -> Option<&T> {
        self.entries
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, v)| v)
    }

    /// Keep the entries for which `keep` returns true.
    pub fn filter<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&T) -> bool,
    {
        Self {
            name: self.name,
            entries: self.entries.into_iter().filter(|(_, v)| keep(v)).collect(),
        }
    }

    /// Transform every value, keeping indices.
    pub fn map<U, F>(self, mut f: F) -> Series<U>
    where
        F: FnMut(T) -> U,
    {
        Series {
            name: self.name,
            entries: self.entries.into_iter().map(|(i, v)| (i, f(v))).collect(),
        }
    }

    /// Restrict the series to exactly `ids`, in the order given.
    ///
    /// Every requested index must be present and may appear only once.
    pub fn restrict(&self, ids: &[RowIndex]) -> Result<Series<T>>
    where
        T: Clone,
    {
        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(repeated) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(PrepError::InvalidArgument(format!(
                "row index {} requested more than once",
                repeated
            )));
        }

        let lookup: BTreeMap<RowIndex, &T> = self.entries.iter().map(|(i, v)| (*i, v)).collect();
        let missing: Vec<RowIndex> = ids
            .iter()
            .filter(|id| !lookup.contains_key(*id))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(PrepError::IndexMismatch { missing });
        }

        let entries = ids.iter().map(|id| (*id, lookup[id].clone())).collect();
        Ok(Series {
            name: self.name.clone(),
            entries,
        })
    }
}

impl Series<String> {
    /// Number of occurrences of each distinct value.
    pub fn value_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for value in self.values() {
            *counts.entry(value.clone()).or_insert(0) += 1;
        }
        counts
    }
}
