use crate::model::indicator::CORE_INDICATORS;
use crate::model::matrix::IndicatorMatrix;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index needs {expected} rescaled core columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryScore {
    pub row: usize,
    pub iso_code: String,
    pub score: Option<f64>,
    pub rank: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Stage6Output {
    /// Ranked countries first (rank 1 = toughest), then unscorable ones in row order.
    pub scores: Vec<CountryScore>,
}

impl Stage6Output {
    pub fn scored(&self) -> impl Iterator<Item = &CountryScore> {
        self.scores.iter().filter(|s| s.score.is_some())
    }

    pub fn score_values(&self) -> Vec<f64> {
        self.scored().filter_map(|s| s.score).collect()
    }
}

pub fn run_stage6(rescaled: &IndicatorMatrix) -> Result<Stage6Output, IndexError> {
    let scores = compute_index(rescaled)?;
    let n_scored = scores.iter().filter(|s| s.score.is_some()).count();
    crate::info!(
        "index: {} countries ranked, {} without a score",
        n_scored,
        scores.len() - n_scored
    );
    Ok(Stage6Output { scores })
}

/// Unweighted mean of the rescaled core values per row, ranked by descending
/// score. Equal scores keep row order.
pub fn compute_index(rescaled: &IndicatorMatrix) -> Result<Vec<CountryScore>, IndexError> {
    let expected = CORE_INDICATORS.len();
    if rescaled.n_cols() != expected {
        return Err(IndexError::ShapeMismatch {
            expected,
            actual: rescaled.n_cols(),
        });
    }

    let mut scored = Vec::new();
    let mut unscored = Vec::new();
    for (row, values) in rescaled.values.iter().enumerate() {
        let mut sum = 0.0;
        let mut complete = true;
        for v in values {
            match v {
                Some(v) => sum += v,
                None => complete = false,
            }
        }
        let entry = CountryScore {
            row,
            iso_code: rescaled.countries[row].clone(),
            score: complete.then(|| sum / expected as f64),
            rank: None,
        };
        if complete {
            scored.push(entry);
        } else {
            unscored.push(entry);
        }
    }

    scored.sort_by(|a, b| {
        let (a_score, b_score) = (a.score.unwrap_or(0.0), b.score.unwrap_or(0.0));
        b_score
            .partial_cmp(&a_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.row.cmp(&b.row))
    });
    for (i, s) in scored.iter_mut().enumerate() {
        s.rank = Some(i + 1);
    }

    scored.extend(unscored);
    Ok(scored)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_index.rs"]
mod tests;
