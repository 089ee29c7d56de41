use std::collections::BTreeMap;

use super::{
  error::PredictError,
  scope::ItemScope,
  vector::{MutableSparseVector, SparseVector}
};

/// Identity token for a neighbor's ratings vector within one [`Neighborhoods`].
///
/// Two handles are equal only if they refer to the same stored vector, no matter
/// what the vectors contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VectorHandle(usize);

/// A user allowed to vote on an item, with their similarity to the target user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
  pub user: i64,
  pub similarity: f64,
  pub ratings: VectorHandle
}

impl Neighbor {
  pub fn new(user: i64, similarity: f64, ratings: VectorHandle) -> Self {
    Self { user, similarity, ratings }
  }
}

/// The neighbors found for one prediction request, keyed by item.
///
/// Rating vectors live in a call-private arena and neighbors point at them by
/// [`VectorHandle`], so one neighbor voting on many items shares a single vector.
#[derive(Debug, Default)]
pub struct Neighborhoods {
  vectors: Vec<MutableSparseVector>,
  by_item: BTreeMap<i64, Vec<Neighbor>>
}

impl Neighborhoods {
  pub fn builder() -> NeighborhoodsBuilder {
    NeighborhoodsBuilder::default()
  }

  pub fn neighbors(&self, item: i64) -> &[Neighbor] {
    self.by_item.get(&item)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn items(&self) -> ItemScope {
    self.by_item.iter()
      .filter(|(_, nbrs)| !nbrs.is_empty())
      .map(|(item, _)| *item)
      .collect()
  }

  /// Every neighbor entry across all items. The same neighbor shows up once per
  /// item it votes on.
  pub fn iter_neighbors(&self) -> impl Iterator<Item = &Neighbor> {
    self.by_item.values().flatten()
  }

  pub fn vector(&self, handle: VectorHandle) -> Result<&MutableSparseVector, PredictError> {
    self.vectors.get(handle.0)
      .ok_or(PredictError::UnknownVector(handle))
  }

  pub fn vector_mut(&mut self, handle: VectorHandle)
      -> Result<&mut MutableSparseVector, PredictError> {
    self.vectors.get_mut(handle.0)
      .ok_or(PredictError::UnknownVector(handle))
  }

  pub fn vector_count(&self) -> usize {
    self.vectors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_item.values().all(Vec::is_empty)
  }
}

#[derive(Debug, Default)]
pub struct NeighborhoodsBuilder {
  inner: Neighborhoods
}

impl NeighborhoodsBuilder {
  /// Store a ratings vector and return a fresh handle to it. Adding the same
  /// contents twice yields two distinct handles.
  pub fn add_vector(&mut self, ratings: SparseVector) -> VectorHandle {
    self.inner.vectors.push(ratings.mutable_copy());
    VectorHandle(self.inner.vectors.len() - 1)
  }

  pub fn add_neighbor(&mut self, item: i64, neighbor: Neighbor) -> Result<&mut Self, PredictError> {
    self.inner.vector(neighbor.ratings)?;
    self.inner.by_item.entry(item)
      .or_default()
      .push(neighbor);
    Ok(self)
  }

  pub fn build(self) -> Neighborhoods {
    self.inner
  }
}

/// Finds, for each requested item, the neighbors eligible to vote on it.
///
/// Implementations own the whole neighbor policy: how similarity is measured,
/// how many neighbors are kept and any thresholds. Each call must return fresh
/// vectors; the predictor normalizes them in place.
pub trait NeighborhoodFinder {
  /// With `scope` of `None`, return neighbors for every item the finder can
  /// supply them for.
  fn find_neighbors(&self, user: i64, ratings: &SparseVector, scope: Option<&ItemScope>)
      -> Result<Neighborhoods, PredictError>;
}

impl<F> NeighborhoodFinder for &F
  where F: NeighborhoodFinder + ?Sized {
  fn find_neighbors(&self, user: i64, ratings: &SparseVector, scope: Option<&ItemScope>)
      -> Result<Neighborhoods, PredictError> {
    (**self).find_neighbors(user, ratings, scope)
  }
}
