//! Tabular data loading and stratified train/test splitting.
//!
//! A [`Frame`] is a small column store: every column is either numeric or
//! categorical (string valued). CSV columns whose cells all parse as numbers
//! become numeric, everything else stays categorical.
use std::collections::HashSet;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Name of the identifier column removed on load.
pub const ID_COLUMN: &str = "id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Column {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<String>) -> Self {
        Column {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }
}

/// Ordered collection of equally sized, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<Column>,
}

#[derive(Hash, PartialEq, Eq)]
enum CellKey<'a> {
    Num(u64),
    Text(&'a str),
}

impl Frame {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let n = first.data.len();
            if let Some(bad) = columns.iter().find(|c| c.data.len() != n) {
                return Err(RiskError::invalid_state(format!(
                    "column '{}' has {} rows, expected {}",
                    bad.name,
                    bad.data.len(),
                    n
                )));
            }
        }
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.name.as_str()) {
                return Err(RiskError::invalid_state(format!(
                    "duplicate column name '{}'",
                    c.name
                )));
            }
        }
        Ok(Frame { columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// True when the frame holds no rows (a frame without columns is empty too).
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Borrow a numeric column, failing when it is missing or categorical.
    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Numeric(v)) => Ok(v),
            Some(ColumnData::Categorical(_)) => Err(RiskError::invalid_state(format!(
                "column '{}' is not numeric",
                name
            ))),
            None => Err(RiskError::invalid_state(format!(
                "column '{}' not found",
                name
            ))),
        }
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let pos = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(pos))
    }

    pub fn select_rows(&self, indices: &[usize]) -> Frame {
        Frame {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.select(indices),
                })
                .collect(),
        }
    }

    /// Remove exact duplicate rows, keeping the first occurrence.
    /// Returns the number of rows removed.
    pub fn drop_duplicates(&mut self) -> usize {
        let n = self.n_rows();
        let mut keep = Vec::with_capacity(n);
        {
            let mut seen: HashSet<Vec<CellKey<'_>>> = HashSet::with_capacity(n);
            for row in 0..n {
                let key: Vec<CellKey<'_>> = self
                    .columns
                    .iter()
                    .map(|c| match &c.data {
                        // +0.0 and -0.0 compare equal, NaNs collapse to one key
                        ColumnData::Numeric(v) if v[row] == 0.0 => CellKey::Num(0),
                        ColumnData::Numeric(v) if v[row].is_nan() => CellKey::Num(u64::MAX),
                        ColumnData::Numeric(v) => CellKey::Num(v[row].to_bits()),
                        ColumnData::Categorical(v) => CellKey::Text(v[row].as_str()),
                    })
                    .collect();
                if seen.insert(key) {
                    keep.push(row);
                }
            }
        }
        let removed = n - keep.len();
        if removed > 0 {
            *self = self.select_rows(&keep);
        }
        removed
    }

    /// Parse CSV text with a header row into a frame.
    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Frame> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let rows = rdr
            .records()
            .map(|record| Ok(record?.iter().map(|v| v.to_string()).collect()))
            .collect::<Result<Vec<Vec<String>>>>()?;
        Frame::from_records(headers, rows)
    }

    /// Build a frame from a header and row-major text records. A column is
    /// numeric when every non-empty cell parses as a number.
    pub fn from_records(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Frame> {
        let mut raw: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); headers.len()];
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != headers.len() {
                return Err(RiskError::invalid_state(format!(
                    "record {} has {} fields, expected {}",
                    i,
                    row.len(),
                    headers.len()
                )));
            }
            for (col, value) in raw.iter_mut().zip(row) {
                col.push(value);
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| infer_column(name, cells))
            .collect();
        Frame::new(columns)
    }
}

fn infer_column(name: String, cells: Vec<String>) -> Column {
    let parsed: Option<Vec<f64>> = cells
        .iter()
        .map(|c| {
            if c.is_empty() {
                Some(f64::NAN)
            } else {
                c.parse::<f64>().ok()
            }
        })
        .collect();
    match parsed {
        Some(values) if cells.iter().any(|c| !c.is_empty()) => Column::numeric(name, values),
        _ => Column::categorical(name, cells),
    }
}

/// Load a CSV dataset, drop the identifier column and remove duplicate rows.
///
/// A path that does not exist is reported and yields an empty frame; callers
/// must check [`Frame::is_empty`]. Unreadable or malformed files are errors.
pub fn load_data<P: AsRef<Path>>(path: P) -> Result<Frame> {
    let path = path.as_ref();
    if !path.exists() {
        log::error!("{}", RiskError::NotFound(path.to_path_buf()));
        return Ok(Frame::default());
    }

    let file = std::fs::File::open(path)?;
    let mut df = Frame::from_csv_reader(file)?;

    if df.drop_column(ID_COLUMN).is_some() {
        log::debug!("Dropped identifier column '{}'", ID_COLUMN);
    }

    let removed = df.drop_duplicates();
    log::info!("Duplicates removed: {}", removed);
    log::info!(
        "Loaded {} rows x {} columns from {}",
        df.n_rows(),
        df.n_cols(),
        path.display()
    );

    Ok(df)
}

/// Train/test partitions produced by [`split_data`].
#[derive(Debug, Clone)]
pub struct SplitData {
    pub x_train: Frame,
    pub x_test: Frame,
    pub y_train: Vec<i32>,
    pub y_test: Vec<i32>,
}

/// Extract a 0/1 label vector from a numeric column.
pub fn binary_labels(column: &Column) -> Result<Vec<i32>> {
    let values = match &column.data {
        ColumnData::Numeric(v) => v,
        ColumnData::Categorical(_) => {
            return Err(RiskError::invalid_state(format!(
                "target column '{}' must be numeric",
                column.name
            )))
        }
    };
    values
        .iter()
        .map(|&v| {
            if v == 0.0 {
                Ok(0)
            } else if v == 1.0 {
                Ok(1)
            } else {
                Err(RiskError::invalid_state(format!(
                    "target column '{}' must only contain 0 and 1, found {}",
                    column.name, v
                )))
            }
        })
        .collect()
}

/// Partition row indices so that `n_test` rows are drawn with the label
/// proportions of `y`. Returns `(train, test)` index lists, both shuffled.
pub(crate) fn stratified_partition<R: Rng>(
    y: &[i32],
    n_test: usize,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let n = y.len();
    let mut classes: Vec<i32> = y.to_vec();
    classes.sort_unstable();
    classes.dedup();

    let mut members: Vec<Vec<usize>> = classes
        .iter()
        .map(|&c| (0..n).filter(|&i| y[i] == c).collect())
        .collect();

    // Largest-remainder allocation of the test rows across classes.
    let exact: Vec<f64> = members
        .iter()
        .map(|m| n_test as f64 * m.len() as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let mut left = n_test.saturating_sub(alloc.iter().sum());
    let mut order: Vec<usize> = (0..classes.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });
    for &k in order.iter().cycle().take(classes.len() * 2) {
        if left == 0 {
            break;
        }
        if alloc[k] < members[k].len() {
            alloc[k] += 1;
            left -= 1;
        }
    }

    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (m, &k) in members.iter_mut().zip(alloc.iter()) {
        m.shuffle(rng);
        test.extend_from_slice(&m[..k]);
        train.extend_from_slice(&m[k..]);
    }
    train.shuffle(rng);
    test.shuffle(rng);
    (train, test)
}

/// Split a frame into stratified train/test partitions.
///
/// # Arguments
///
/// * `df` - Loaded dataset including the target column.
/// * `target` - Name of the binary (0/1) label column.
/// * `test_size` - Fraction of rows assigned to the test partition.
/// * `random_state` - Seed controlling the shuffle; identical seeds give identical splits.
pub fn split_data(df: &Frame, target: &str, test_size: f64, random_state: u64) -> Result<SplitData> {
    if df.is_empty() {
        return Err(RiskError::invalid_state(
            "DataFrame is empty. Check data loading.",
        ));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(RiskError::invalid_state(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let mut x = df.clone();
    let target_col = x.drop_column(target).ok_or_else(|| {
        RiskError::invalid_state(format!("target column '{}' not found", target))
    })?;
    let y = binary_labels(&target_col)?;

    let n = y.len();
    if n < 2 {
        return Err(RiskError::invalid_state(format!(
            "cannot split {} row(s) into train and test partitions",
            n
        )));
    }
    let n_test = ((test_size * n as f64).ceil() as usize).clamp(1, n - 1);

    let mut rng = ChaCha8Rng::seed_from_u64(random_state);
    let (train_idx, test_idx) = stratified_partition(&y, n_test, &mut rng);

    log::debug!(
        "Split {} rows into {} train / {} test",
        n,
        train_idx.len(),
        test_idx.len()
    );

    Ok(SplitData {
        x_train: x.select_rows(&train_idx),
        x_test: x.select_rows(&test_idx),
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
    })
}
