use ndarray::Array2;

/// Compressed sparse row matrix, laid out like scipy's CSR.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    data: Vec<f64>,
    indices: Vec<usize>,
    indptr: Vec<usize>,
}

impl CsrMatrix {
    /// Validates and assembles the three CSR arrays.
    pub fn from_parts(
        shape: (usize, usize),
        data: Vec<f64>,
        indices: Vec<usize>,
        indptr: Vec<usize>,
    ) -> Result<Self, String> {
        let (nrows, ncols) = shape;
        if indptr.len() != nrows + 1 {
            return Err(format!("indptr has {} entries, expected {}", indptr.len(), nrows + 1));
        }
        if data.len() != indices.len() {
            return Err(format!("{} values but {} column indices", data.len(), indices.len()));
        }
        if indptr.first() != Some(&0) || indptr.last() != Some(&data.len()) {
            return Err("indptr must start at 0 and end at nnz".to_string());
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err("indptr is not monotonic".to_string());
        }
        if let Some(bad) = indices.iter().find(|&&c| c >= ncols) {
            return Err(format!("column index {bad} out of bounds for {ncols} columns"));
        }
        Ok(Self { nrows, ncols, data, indices, indptr })
    }

    pub fn from_dense(dense: &Array2<f64>) -> Self {
        let (nrows, ncols) = dense.dim();
        let mut data = Vec::new();
        let mut indices = Vec::new();
        let mut indptr = Vec::with_capacity(nrows + 1);
        indptr.push(0);
        for row in dense.rows() {
            for (c, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    data.push(v);
                    indices.push(c);
                }
            }
            indptr.push(data.len());
        }
        Self { nrows, ncols, data, indices, indptr }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        (&self.indices[start..end], &self.data[start..end])
    }

    /// Euclidean norm of every row.
    pub fn row_norms(&self) -> Vec<f64> {
        (0..self.nrows)
            .map(|i| self.row(i).1.iter().map(|v| v * v).sum::<f64>().sqrt())
            .collect()
    }

    /// Cosine similarity of row `i` with every row. Rows with zero norm have
    /// similarity 0 with everything.
    pub fn cosine_row(&self, i: usize, norms: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.nrows];
        if i >= self.nrows || norms[i] == 0.0 {
            return out;
        }
        let mut dense = vec![0.0; self.ncols];
        let (cols, vals) = self.row(i);
        for (&c, &v) in cols.iter().zip(vals) {
            dense[c] += v;
        }
        for (j, slot) in out.iter_mut().enumerate() {
            if norms[j] == 0.0 {
                continue;
            }
            let (cols, vals) = self.row(j);
            let dot: f64 = cols.iter().zip(vals).map(|(&c, &v)| v * dense[c]).sum();
            *slot = dot / (norms[i] * norms[j]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn cosine_matches_dense_computation() {
        let m = CsrMatrix::from_dense(&array![
            [1.0, 0.0, 1.0],
            [0.0, 2.0, 0.0],
            [2.0, 0.0, 2.0],
            [0.0, 0.0, 0.0]
        ]);
        let norms = m.row_norms();
        let sims = m.cosine_row(0, &norms);
        assert!((sims[0] - 1.0).abs() < 1e-12);
        assert_eq!(sims[1], 0.0);
        assert!((sims[2] - 1.0).abs() < 1e-12);
        assert_eq!(sims[3], 0.0);
        assert!(m.cosine_row(3, &norms).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn malformed_parts_are_rejected() {
        assert!(CsrMatrix::from_parts((2, 2), vec![1.0], vec![0], vec![0, 1]).is_err());
        assert!(CsrMatrix::from_parts((1, 2), vec![1.0], vec![5], vec![0, 1]).is_err());
        assert!(CsrMatrix::from_parts((2, 2), vec![1.0, 2.0], vec![0, 1], vec![0, 2, 1]).is_err());
        assert!(CsrMatrix::from_parts((2, 2), vec![1.0, 2.0], vec![0, 1], vec![0, 1, 2]).is_ok());
    }
}
