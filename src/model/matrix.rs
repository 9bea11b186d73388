use crate::model::indicator::IndicatorId;

/// Country x indicator table. Rows follow eligibility order; every transform
/// returns a new matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorMatrix {
    pub countries: Vec<String>,
    pub columns: Vec<IndicatorId>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl IndicatorMatrix {
    pub fn new(countries: Vec<String>, columns: Vec<IndicatorId>) -> Self {
        let n_cols = columns.len();
        let values = vec![vec![None; n_cols]; countries.len()];
        Self {
            countries,
            columns,
            values,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.countries.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col).copied().flatten())
    }

    pub fn column(&self, col: usize) -> Vec<Option<f64>> {
        self.values.iter().map(|r| r[col]).collect()
    }

    pub fn column_index(&self, id: IndicatorId) -> Option<usize> {
        self.columns.iter().position(|&c| c == id)
    }

    pub fn observed(&self, col: usize) -> Vec<f64> {
        self.values.iter().filter_map(|r| r[col]).collect()
    }

    pub fn row_missing_count(&self, row: usize) -> usize {
        self.values[row].iter().filter(|v| v.is_none()).count()
    }

    pub fn row_all_missing(&self, row: usize) -> bool {
        self.values[row].iter().all(|v| v.is_none())
    }

    pub fn missing_cells(&self) -> usize {
        self.values
            .iter()
            .map(|r| r.iter().filter(|v| v.is_none()).count())
            .sum()
    }
}
