//! Column-oriented numeric table
//!
//! A minimal named-column store used between the generator, the dataset
//! views and the feature preparer. Column order is preserved.

use crate::errors::{CoreError, Result};
use std::io::Write;

/// One named column of numeric values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Ordered set of equally sized numeric columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; all columns must have the same length and unique names.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if self.index_of(&name).is_some() {
            return Err(CoreError::InvalidFrame(format!("duplicate column `{}`", name)));
        }
        if let Some(first) = self.columns.first() {
            if first.values.len() != values.len() {
                return Err(CoreError::InvalidFrame(format!(
                    "column `{}` has {} rows, expected {}",
                    name,
                    values.len(),
                    first.values.len()
                )));
            }
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Builder-style variant of [`Frame::push_column`].
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.push_column(name, values)?;
        Ok(self)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index_of(name).map(|i| self.columns[i].values.as_slice())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Remove and return a column.
    pub fn take_column(&mut self, name: &str) -> Option<Vec<f64>> {
        self.index_of(name).map(|i| self.columns.remove(i).values)
    }

    /// Drop every listed column that exists; unknown names are ignored.
    pub fn drop_if_present(&mut self, names: &[&str]) {
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
    }

    /// Values of one row in column order.
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c.values[index]).collect()
    }

    /// Write the frame as CSV with a header line.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", self.names().join(","))?;
        for i in 0..self.n_rows() {
            let line: Vec<String> = self.columns.iter().map(|c| c.values[i].to_string()).collect();
            writeln!(writer, "{}", line.join(","))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::new()
            .with_column("a", vec![1.0, 2.0])
            .and_then(|f| f.with_column("b", vec![3.0, 4.0]))
            .unwrap()
    }

    #[test]
    fn test_push_and_lookup() {
        let frame = sample();
        assert_eq!(frame.n_rows(), 2);
        assert_eq!(frame.names(), vec!["a", "b"]);
        assert_eq!(frame.column("b"), Some(&[3.0, 4.0][..]));
        assert_eq!(frame.row(1), vec![2.0, 4.0]);
    }

    #[test]
    fn test_rejects_length_mismatch_and_duplicates() {
        let mut frame = sample();
        assert!(matches!(
            frame.push_column("c", vec![1.0]),
            Err(CoreError::InvalidFrame(_))
        ));
        assert!(matches!(
            frame.push_column("a", vec![1.0, 2.0]),
            Err(CoreError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_drop_if_present_ignores_unknown() {
        let mut frame = sample();
        frame.drop_if_present(&["a", "does_not_exist"]);
        assert_eq!(frame.names(), vec!["b"]);
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        sample().write_csv(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a,b\n1,3\n2,4\n");
    }
}
