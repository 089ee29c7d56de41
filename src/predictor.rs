use std::collections::HashSet;

use tracing::{Level, span, debug, trace};

use super::{
  RatingPredictor,
  RecommendationList,
  error::PredictError,
  neighbor::{NeighborhoodFinder, Neighborhoods},
  norm::{Normalizer, VectorTransformation},
  scope::ItemScope,
  vector::{ABSENT, MutableSparseVector, SparseVector}
};

/// User-user collaborative filtering.
///
/// Each item's prediction is the mean of its neighbors' normalized ratings,
/// weighted by similarity, mapped back onto the target user's rating scale.
/// Negative similarities pull the score the other way while still adding to the
/// total weight.
#[derive(Debug, Builder)]
#[builder(name = "UserUserPredictorBuilder", pattern = "owned", public)]
pub struct UserUserPredictor<F, N> {
  finder: F,
  normalizer: N
}

impl<F, N> UserUserPredictor<F, N> {
  pub fn new(finder: F, normalizer: N) -> Self {
    Self { finder, normalizer }
  }

  pub fn builder() -> UserUserPredictorBuilder<F, N> {
    UserUserPredictorBuilder::default()
  }

  pub fn finder(&self) -> &F {
    &self.finder
  }

  pub fn normalizer(&self) -> &N {
    &self.normalizer
  }
}

impl<F, N> UserUserPredictor<F, N>
  where F: NeighborhoodFinder,
        N: Normalizer {
  /// Predict a single item; NaN when no neighbor can vote on it.
  pub fn predict_one(&self, user: i64, ratings: &SparseVector, item: i64)
      -> Result<f64, PredictError> {
    self.predict(user, ratings, Some(&[item][..]))
      .map(|predictions| predictions.get(item))
  }

  /// The `n` highest predicted `candidates` the user has not rated yet.
  pub fn recommend(&self, user: i64, ratings: &SparseVector, candidates: &[i64], n: usize)
      -> Result<RecommendationList<i64>, PredictError> {
    let span = span!(Level::DEBUG, "user-user-recommend", user);
    let _guard = span.enter();
    let predictions = self.predict(user, ratings, Some(candidates))?;
    let recs = RecommendationList::from_predictions(&predictions, ratings).truncate(n);
    debug!("Returning {} recommendations", recs.len());
    Ok(recs)
  }
}

impl<F, N> RatingPredictor for UserUserPredictor<F, N>
  where F: NeighborhoodFinder,
        N: Normalizer {
  fn predict(&self, user: i64, ratings: &SparseVector, items: Option<&[i64]>)
      -> Result<SparseVector, PredictError> {
    let span = span!(Level::DEBUG, "user-user-predict", user);
    let _guard = span.enter();
    let requested = items.map(ItemScope::from);
    trace!("Finding neighbors");
    let mut neighborhoods = self.finder.find_neighbors(user, ratings, requested.as_ref())?;
    let scope = requested.unwrap_or_else(|| neighborhoods.items());
    debug!("Predicting {} items", scope.len());

    let normalized = normalize_neighbor_ratings(&self.normalizer, &mut neighborhoods)?;
    debug!("Normalized {} neighbor vectors", normalized);

    let mut predictions = MutableSparseVector::with_keys(scope.as_slice())?;
    for item in scope.iter() {
      let score = weighted_average(&neighborhoods, item)?;
      trace!("Item {} scored {}", item, score);
      predictions.set(item, score);
    }

    trace!("Denormalizing predictions");
    let transform = self.normalizer.make_transformation(user, ratings)?;
    transform.unapply(&mut predictions);
    Ok(predictions.freeze())
  }
}

/// Normalize every distinct neighbor vector in `neighborhoods` exactly once.
///
/// Vectors are told apart by handle, not by contents: a neighbor voting on
/// several items is normalized once, while two neighbors with equal ratings are
/// each normalized. Returns the number of vectors normalized.
pub fn normalize_neighbor_ratings<N>(normalizer: &N, neighborhoods: &mut Neighborhoods)
    -> Result<usize, PredictError>
  where N: Normalizer + ?Sized {
  let span = span!(Level::TRACE, "normalize-neighbors");
  let _guard = span.enter();
  let mut seen = HashSet::with_capacity(neighborhoods.vector_count());
  let pending: Vec<_> = neighborhoods.iter_neighbors()
    .filter(|nbr| seen.insert(nbr.ratings))
    .map(|nbr| (nbr.user, nbr.ratings))
    .collect();
  for &(user, handle) in &pending {
    trace!("Normalizing ratings of neighbor {}", user);
    normalizer.normalize(user, neighborhoods.vector_mut(handle)?)?;
  }
  Ok(pending.len())
}

/// `Σ sim·r / Σ |sim|` over the neighbors who rated `item`, or [`ABSENT`] when
/// nobody did or the total weight is zero.
fn weighted_average(neighborhoods: &Neighborhoods, item: i64) -> Result<f64, PredictError> {
  let mut sum = 0.0;
  let mut weight = 0.0;
  for nbr in neighborhoods.neighbors(item) {
    let rating = neighborhoods.vector(nbr.ratings)?.get(item);
    if rating.is_nan() {
      continue;
    }
    weight += nbr.similarity.abs();
    sum += nbr.similarity * rating;
  }
  if weight > 0.0 {
    Ok(sum / weight)
  } else {
    Ok(ABSENT)
  }
}
