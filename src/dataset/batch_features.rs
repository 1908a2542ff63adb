//! Column-oriented store for one batch of feature vectors.
//!
//! Dense float columns are kept as `[N, D]` matrices. Sparse columns are
//! converted into a compressed per-example layout so that an example's
//! entries can be found without scanning the whole column.

use crate::core::error::{BoostedTreesError, Result};
use crate::core::types::{CategoricalId, FeatureColumn};
use crate::tree::node::Split;
use crate::tree::tree::DecisionTree;

use ndarray::{Array1, Array2, ArrayD, Ix2};
use serde::{Deserialize, Serialize};

/// Sparse column in coordinate form.
///
/// `indices` is `[nnz, 2]` with rows `(example, dimension)` for float columns
/// and `(example, position)` for categorical columns, `values` is `[nnz]` and
/// `shape` is `[2]` holding `(batch_size, num_dimensions)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseFeatureColumn<T> {
    /// Coordinates of the stored entries
    pub indices: ArrayD<i64>,
    /// Stored values
    pub values: ArrayD<T>,
    /// Dense shape of the column
    pub shape: ArrayD<i64>,
}

impl<T: Clone> SparseFeatureColumn<T> {
    /// Build a column from `(example, dimension, value)` triples.
    pub fn from_entries(batch_size: usize, num_dimensions: usize, entries: &[(usize, usize, T)]) -> Self {
        let indices = Array2::from_shape_fn((entries.len(), 2), |(row, col)| {
            let (example, dimension, _) = &entries[row];
            if col == 0 {
                *example as i64
            } else {
                *dimension as i64
            }
        });
        let values: Vec<T> = entries.iter().map(|(_, _, value)| value.clone()).collect();
        SparseFeatureColumn {
            indices: indices.into_dyn(),
            values: Array1::from(values).into_dyn(),
            shape: Array1::from(vec![batch_size as i64, num_dimensions as i64]).into_dyn(),
        }
    }
}

impl SparseFeatureColumn<CategoricalId> {
    /// Build a categorical column from one id set per example.
    pub fn from_id_sets(id_sets: &[Vec<CategoricalId>]) -> Self {
        let max_len = id_sets.iter().map(Vec::len).max().unwrap_or(0);
        let entries: Vec<(usize, usize, CategoricalId)> = id_sets
            .iter()
            .enumerate()
            .flat_map(|(example, ids)| {
                ids.iter()
                    .enumerate()
                    .map(move |(position, id)| (example, position, *id))
            })
            .collect();
        Self::from_entries(id_sets.len(), max_len, &entries)
    }
}

/// Raw feature tensors of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureInputs {
    /// Dense float columns, each `[N, D]`
    pub dense_float: Vec<ArrayD<f32>>,
    /// Sparse float columns
    pub sparse_float: Vec<SparseFeatureColumn<f32>>,
    /// Sparse categorical columns
    pub sparse_int: Vec<SparseFeatureColumn<CategoricalId>>,
}

impl FeatureInputs {
    /// Inputs without any column
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dense float column
    pub fn with_dense_float(mut self, column: Array2<f32>) -> Self {
        self.dense_float.push(column.into_dyn());
        self
    }

    /// Append a sparse float column
    pub fn with_sparse_float(mut self, column: SparseFeatureColumn<f32>) -> Self {
        self.sparse_float.push(column);
        self
    }

    /// Append a sparse categorical column
    pub fn with_sparse_int(mut self, column: SparseFeatureColumn<CategoricalId>) -> Self {
        self.sparse_int.push(column);
        self
    }
}

/// Infer the batch size from the first available column.
///
/// Dense columns take precedence, then sparse float, then sparse int.
pub fn infer_batch_size(inputs: &FeatureInputs) -> Result<usize> {
    if let Some(dense) = inputs.dense_float.first() {
        if dense.ndim() == 0 {
            return Err(BoostedTreesError::invalid_argument(
                "Dense float feature must be a matrix.",
            ));
        }
        return Ok(dense.shape()[0]);
    }
    if let Some(sparse) = inputs.sparse_float.first() {
        return batch_size_from_shape(&sparse.shape);
    }
    if let Some(sparse) = inputs.sparse_int.first() {
        return batch_size_from_shape(&sparse.shape);
    }
    Err(BoostedTreesError::invalid_argument(
        "Unable to infer batch size: no feature columns provided.",
    ))
}

fn batch_size_from_shape(shape: &ArrayD<i64>) -> Result<usize> {
    if shape.ndim() != 1 || shape.len() != 2 {
        return Err(BoostedTreesError::invalid_argument(
            "Sparse feature shape must be a vector of size 2.",
        ));
    }
    let rows = shape.iter().next().copied().unwrap_or(-1);
    usize::try_from(rows).map_err(|_| {
        BoostedTreesError::invalid_argument(format!("Invalid sparse feature batch size {}", rows))
    })
}

/// Number of columns per feature family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStats {
    /// Dense float columns
    pub num_dense_float: usize,
    /// Sparse float columns
    pub num_sparse_float: usize,
    /// Sparse categorical columns
    pub num_sparse_int: usize,
}

#[derive(Debug, Clone)]
struct SparseFloatColumn {
    num_dimensions: usize,
    // CSR layout: entries of example i live in row_offsets[i]..row_offsets[i + 1],
    // sorted by dimension.
    row_offsets: Vec<usize>,
    dimensions: Vec<usize>,
    values: Vec<f32>,
}

impl SparseFloatColumn {
    fn get(&self, example: usize, dimension: usize) -> Option<f32> {
        let start = *self.row_offsets.get(example)?;
        let end = *self.row_offsets.get(example + 1)?;
        let dims = &self.dimensions[start..end];
        dims.binary_search(&dimension)
            .ok()
            .map(|pos| self.values[start + pos])
    }
}

#[derive(Debug, Clone)]
struct SparseIntColumn {
    row_offsets: Vec<usize>,
    ids: Vec<CategoricalId>,
}

impl SparseIntColumn {
    fn ids(&self, example: usize) -> &[CategoricalId] {
        match (self.row_offsets.get(example), self.row_offsets.get(example + 1)) {
            (Some(&start), Some(&end)) => &self.ids[start..end],
            _ => &[],
        }
    }
}

/// Validated feature batch.
#[derive(Debug, Clone)]
pub struct BatchFeatures {
    batch_size: usize,
    dense_float: Vec<Array2<f32>>,
    sparse_float: Vec<SparseFloatColumn>,
    sparse_int: Vec<SparseIntColumn>,
}

impl BatchFeatures {
    /// Empty store for `batch_size` examples.
    pub fn new(batch_size: usize) -> Self {
        BatchFeatures {
            batch_size,
            dense_float: Vec::new(),
            sparse_float: Vec::new(),
            sparse_int: Vec::new(),
        }
    }

    /// Infer the batch size and load every column.
    pub fn from_inputs(inputs: &FeatureInputs) -> Result<Self> {
        let batch_size = infer_batch_size(inputs)?;
        let mut features = BatchFeatures::new(batch_size);
        features.initialize(&inputs.dense_float, &inputs.sparse_float, &inputs.sparse_int)?;
        Ok(features)
    }

    /// Validate and load the feature tensors, replacing any previous content.
    pub fn initialize(
        &mut self,
        dense_float: &[ArrayD<f32>],
        sparse_float: &[SparseFeatureColumn<f32>],
        sparse_int: &[SparseFeatureColumn<CategoricalId>],
    ) -> Result<()> {
        let batch_size = self.batch_size;

        let dense = dense_float
            .iter()
            .enumerate()
            .map(|(column, tensor)| load_dense(column, tensor, batch_size))
            .collect::<Result<Vec<_>>>()?;
        let floats = sparse_float
            .iter()
            .enumerate()
            .map(|(column, tensor)| load_sparse_float(column, tensor, batch_size))
            .collect::<Result<Vec<_>>>()?;
        let ints = sparse_int
            .iter()
            .enumerate()
            .map(|(column, tensor)| load_sparse_int(column, tensor, batch_size))
            .collect::<Result<Vec<_>>>()?;

        self.dense_float = dense;
        self.sparse_float = floats;
        self.sparse_int = ints;

        log::trace!(
            "Loaded batch of {} examples: {:?}",
            batch_size,
            self.feature_stats()
        );
        Ok(())
    }

    /// Number of examples in the batch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of columns per feature family
    pub fn feature_stats(&self) -> FeatureStats {
        FeatureStats {
            num_dense_float: self.dense_float.len(),
            num_sparse_float: self.sparse_float.len(),
            num_sparse_int: self.sparse_int.len(),
        }
    }

    /// Check that every column referenced by `tree` exists in this batch.
    pub fn check_tree_columns(&self, tree: &DecisionTree) -> Result<()> {
        for split in tree.splits() {
            match split {
                Split::DenseFloat(s) => {
                    let column = self.dense_float.get(s.feature_column).ok_or_else(|| {
                        missing_column("dense float", s.feature_column, self.dense_float.len())
                    })?;
                    if s.dimension_id >= column.ncols() {
                        return Err(BoostedTreesError::invalid_argument(format!(
                            "Dense float column {} has {} dimensions, tree uses dimension {}",
                            s.feature_column,
                            column.ncols(),
                            s.dimension_id
                        )));
                    }
                }
                Split::SparseFloat(s) => {
                    let column = self.sparse_float.get(s.feature_column).ok_or_else(|| {
                        missing_column("sparse float", s.feature_column, self.sparse_float.len())
                    })?;
                    if s.dimension_id >= column.num_dimensions {
                        return Err(BoostedTreesError::invalid_argument(format!(
                            "Sparse float column {} has {} dimensions, tree uses dimension {}",
                            s.feature_column, column.num_dimensions, s.dimension_id
                        )));
                    }
                }
                Split::CategoricalId(s) => {
                    if s.feature_column >= self.sparse_int.len() {
                        return Err(missing_column(
                            "sparse int",
                            s.feature_column,
                            self.sparse_int.len(),
                        ));
                    }
                }
                Split::CategoricalIdSetMembership(s) => {
                    if s.feature_column >= self.sparse_int.len() {
                        return Err(missing_column(
                            "sparse int",
                            s.feature_column,
                            self.sparse_int.len(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Read-only view of example `example`.
    pub fn example(&self, example: usize) -> ExampleView<'_> {
        ExampleView {
            features: self,
            example,
        }
    }
}

fn missing_column(family: &str, column: FeatureColumn, available: usize) -> BoostedTreesError {
    BoostedTreesError::invalid_argument(format!(
        "Tree references {} column {} but the batch has {}",
        family, column, available
    ))
}

fn load_dense(column: usize, tensor: &ArrayD<f32>, batch_size: usize) -> Result<Array2<f32>> {
    let matrix = tensor.view().into_dimensionality::<Ix2>().map_err(|_| {
        BoostedTreesError::invalid_argument(format!(
            "Dense float feature {} must be a matrix, got rank {}",
            column,
            tensor.ndim()
        ))
    })?;
    if matrix.nrows() != batch_size {
        return Err(BoostedTreesError::invalid_argument(format!(
            "Dense float feature {} has {} rows, expected batch size {}",
            column,
            matrix.nrows(),
            batch_size
        )));
    }
    if matrix.ncols() == 0 {
        return Err(BoostedTreesError::invalid_argument(format!(
            "Dense float feature {} has no dimensions",
            column
        )));
    }
    Ok(matrix.to_owned())
}

/// Checks the shared sparse layout and returns `(num_dimensions, coordinates)`.
fn sparse_coordinates<T>(
    family: &str,
    column: usize,
    tensor: &SparseFeatureColumn<T>,
    batch_size: usize,
) -> Result<(usize, Vec<(usize, usize)>)> {
    let indices = tensor.indices.view().into_dimensionality::<Ix2>().map_err(|_| {
        BoostedTreesError::invalid_argument(format!(
            "Sparse {} feature {} indices must be a matrix",
            family, column
        ))
    })?;
    if indices.ncols() != 2 {
        return Err(BoostedTreesError::invalid_argument(format!(
            "Sparse {} feature {} indices must have 2 columns, got {}",
            family,
            column,
            indices.ncols()
        )));
    }
    if tensor.values.ndim() != 1 {
        return Err(BoostedTreesError::invalid_argument(format!(
            "Sparse {} feature {} values must be a vector",
            family, column
        )));
    }
    if tensor.values.len() != indices.nrows() {
        return Err(BoostedTreesError::invalid_argument(format!(
            "Sparse {} feature {} has {} values for {} indices",
            family,
            column,
            tensor.values.len(),
            indices.nrows()
        )));
    }
    if tensor.shape.ndim() != 1 || tensor.shape.len() != 2 {
        return Err(BoostedTreesError::invalid_argument(format!(
            "Sparse {} feature {} shape must be a vector of size 2",
            family, column
        )));
    }

    let shape: Vec<i64> = tensor.shape.iter().copied().collect();
    if shape[0] != batch_size as i64 {
        return Err(BoostedTreesError::invalid_argument(format!(
            "Sparse {} feature {} has batch size {}, expected {}",
            family, column, shape[0], batch_size
        )));
    }
    let num_dimensions = usize::try_from(shape[1]).map_err(|_| {
        BoostedTreesError::invalid_argument(format!(
            "Sparse {} feature {} has negative dimension count {}",
            family, column, shape[1]
        ))
    })?;

    let mut coordinates = Vec::with_capacity(indices.nrows());
    for row in indices.rows() {
        let (example, dimension) = (row[0], row[1]);
        if example < 0 || example >= batch_size as i64 {
            return Err(BoostedTreesError::invalid_argument(format!(
                "Sparse {} feature {} has example index {} outside [0, {})",
                family, column, example, batch_size
            )));
        }
        if dimension < 0 {
            return Err(BoostedTreesError::invalid_argument(format!(
                "Sparse {} feature {} has negative index {}",
                family, column, dimension
            )));
        }
        if dimension >= shape[1] {
            return Err(BoostedTreesError::invalid_argument(format!(
                "Sparse {} feature {} has dimension {} outside [0, {})",
                family, column, dimension, num_dimensions
            )));
        }
        coordinates.push((example as usize, dimension as usize));
    }
    Ok((num_dimensions, coordinates))
}

fn row_offsets(batch_size: usize, sorted_examples: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut offsets = vec![0usize; batch_size + 1];
    for example in sorted_examples {
        offsets[example + 1] += 1;
    }
    for i in 0..batch_size {
        offsets[i + 1] += offsets[i];
    }
    offsets
}

fn load_sparse_float(
    column: usize,
    tensor: &SparseFeatureColumn<f32>,
    batch_size: usize,
) -> Result<SparseFloatColumn> {
    let (num_dimensions, coordinates) = sparse_coordinates("float", column, tensor, batch_size)?;

    let mut entries: Vec<(usize, usize, f32)> = coordinates
        .into_iter()
        .zip(tensor.values.iter().copied())
        .map(|((example, dimension), value)| (example, dimension, value))
        .collect();
    entries.sort_by_key(|&(example, dimension, _)| (example, dimension));
    if let Some(pair) = entries
        .windows(2)
        .find(|pair| (pair[0].0, pair[0].1) == (pair[1].0, pair[1].1))
    {
        return Err(BoostedTreesError::invalid_argument(format!(
            "Sparse float feature {} has duplicate entry for example {} dimension {}",
            column, pair[0].0, pair[0].1
        )));
    }

    Ok(SparseFloatColumn {
        num_dimensions,
        row_offsets: row_offsets(batch_size, entries.iter().map(|e| e.0)),
        dimensions: entries.iter().map(|e| e.1).collect(),
        values: entries.iter().map(|e| e.2).collect(),
    })
}

fn load_sparse_int(
    column: usize,
    tensor: &SparseFeatureColumn<CategoricalId>,
    batch_size: usize,
) -> Result<SparseIntColumn> {
    let (_, coordinates) = sparse_coordinates("int", column, tensor, batch_size)?;

    let mut entries: Vec<(usize, CategoricalId)> = coordinates
        .into_iter()
        .zip(tensor.values.iter().copied())
        .map(|((example, _), id)| (example, id))
        .collect();
    entries.sort_unstable();
    entries.dedup();

    Ok(SparseIntColumn {
        row_offsets: row_offsets(batch_size, entries.iter().map(|e| e.0)),
        ids: entries.iter().map(|e| e.1).collect(),
    })
}

/// Feature lookups for a single example.
#[derive(Debug, Clone, Copy)]
pub struct ExampleView<'a> {
    features: &'a BatchFeatures,
    example: usize,
}

impl<'a> ExampleView<'a> {
    /// Index of the example in its batch
    pub fn index(&self) -> usize {
        self.example
    }

    /// Value of a dense float column, `None` if the column does not exist.
    pub fn dense_float(&self, column: FeatureColumn, dimension: usize) -> Option<f32> {
        self.features
            .dense_float
            .get(column)?
            .get((self.example, dimension))
            .copied()
    }

    /// Value of a sparse float column, `None` if the example lacks it.
    pub fn sparse_float(&self, column: FeatureColumn, dimension: usize) -> Option<f32> {
        self.features
            .sparse_float
            .get(column)?
            .get(self.example, dimension)
    }

    /// Sorted, deduplicated categorical ids of a sparse int column.
    pub fn sparse_int(&self, column: FeatureColumn) -> &'a [CategoricalId] {
        match self.features.sparse_int.get(column) {
            Some(ints) => ints.ids(self.example),
            None => &[],
        }
    }
}
