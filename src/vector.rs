use serde::Serialize;

use super::error::PredictError;

/// Sentinel returned for keys a vector holds no value for.
pub const ABSENT: f64 = f64::NAN;

/// Immutable sparse vector keyed by user or item id.
///
/// Keys are unique and strictly ascending. Looking up a key the vector does not
/// contain yields [`ABSENT`], never zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SparseVector {
  keys: Vec<i64>,
  values: Vec<f64>
}

impl SparseVector {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn wrap(keys: Vec<i64>, values: Vec<f64>) -> Result<Self, PredictError> {
    if keys.len() != values.len() {
      return Err(PredictError::MismatchedLengths { keys: keys.len(), values: values.len() });
    }
    if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
      return Err(PredictError::UnsortedKeys);
    }
    Ok(Self { keys, values })
  }

  /// Build a vector from unordered pairs. When a key repeats, the later value wins.
  pub fn from_pairs<I>(pairs: I) -> Self
    where I: IntoIterator<Item = (i64, f64)> {
    let mut pairs: Vec<(i64, f64)> = pairs.into_iter().collect();
    // stable sort keeps input order among equal keys
    pairs.sort_by_key(|(key, _)| *key);
    let mut keys: Vec<i64> = Vec::with_capacity(pairs.len());
    let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
      if keys.last() == Some(&key) {
        if let Some(last) = values.last_mut() {
          *last = value;
        }
      } else {
        keys.push(key);
        values.push(value);
      }
    }
    Self { keys, values }
  }

  pub fn get(&self, key: i64) -> f64 {
    self.keys.binary_search(&key)
      .map(|idx| self.values[idx])
      .unwrap_or(ABSENT)
  }

  pub fn contains_key(&self, key: i64) -> bool {
    self.keys.binary_search(&key).is_ok()
  }

  pub fn len(&self) -> usize {
    self.keys.len()
  }

  pub fn is_empty(&self) -> bool {
    self.keys.is_empty()
  }

  pub fn keys(&self) -> &[i64] {
    &self.keys
  }

  pub fn values(&self) -> &[f64] {
    &self.values
  }

  pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
    self.keys.iter().copied().zip(self.values.iter().copied())
  }

  pub fn mean(&self) -> f64 {
    let (sum, count) = self.values.iter()
      .filter(|value| !value.is_nan())
      .fold((0.0f64, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
      ABSENT
    } else {
      sum / count as f64
    }
  }

  pub fn mutable_copy(&self) -> MutableSparseVector {
    MutableSparseVector { keys: self.keys.clone(), values: self.values.clone() }
  }
}

impl From<MutableSparseVector> for SparseVector {
  fn from(value: MutableSparseVector) -> Self {
    value.freeze()
  }
}

/// Sparse vector with a fixed key domain and writable values.
///
/// Used for in-progress state: neighbor ratings while they are normalized and
/// predictions before they are handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct MutableSparseVector {
  keys: Vec<i64>,
  values: Vec<f64>
}

impl MutableSparseVector {
  /// Create a vector over `keys` with every value set to [`ABSENT`].
  pub fn with_keys(keys: &[i64]) -> Result<Self, PredictError> {
    let values = vec![ABSENT; keys.len()];
    SparseVector::wrap(keys.to_vec(), values)
      .map(|v| MutableSparseVector { keys: v.keys, values: v.values })
  }

  pub fn get(&self, key: i64) -> f64 {
    self.keys.binary_search(&key)
      .map(|idx| self.values[idx])
      .unwrap_or(ABSENT)
  }

  /// Overwrite the value for `key`, returning the previous value. Keys outside
  /// the vector's domain are left alone and yield `None`.
  pub fn set(&mut self, key: i64, value: f64) -> Option<f64> {
    let idx = self.keys.binary_search(&key).ok()?;
    Some(std::mem::replace(&mut self.values[idx], value))
  }

  pub fn len(&self) -> usize {
    self.keys.len()
  }

  pub fn is_empty(&self) -> bool {
    self.keys.is_empty()
  }

  pub fn keys(&self) -> &[i64] {
    &self.keys
  }

  pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
    self.keys.iter().copied().zip(self.values.iter().copied())
  }

  pub fn values_mut(&mut self) -> impl Iterator<Item = (i64, &mut f64)> + '_ {
    self.keys.iter().copied().zip(self.values.iter_mut())
  }

  pub fn freeze(self) -> SparseVector {
    SparseVector { keys: self.keys, values: self.values }
  }
}
