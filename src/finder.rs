use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{Level, span, debug, trace};

use super::{
  error::PredictError,
  neighbor::{Neighbor, NeighborhoodFinder, Neighborhoods, VectorHandle},
  scope::ItemScope,
  vector::SparseVector
};

#[derive(Debug, Clone, Default)]
pub struct RatingStore {
  users: BTreeMap<i64, SparseVector>
}

impl RatingStore {
  /// Build from `(user, item, rating)` triples. A repeated `(user, item)` pair
  /// keeps the later rating.
  pub fn from_triples<I>(triples: I) -> Result<Self, PredictError>
    where I: IntoIterator<Item = (i64, i64, f64)> {
    let mut grouped: BTreeMap<i64, Vec<(i64, f64)>> = BTreeMap::new();
    for (user, item, rating) in triples {
      if !rating.is_finite() {
        return Err(PredictError::NonFiniteRating { user, item });
      }
      grouped.entry(user).or_default().push((item, rating));
    }
    let users = grouped.into_iter()
      .map(|(user, pairs)| (user, SparseVector::from_pairs(pairs)))
      .collect();
    Ok(Self { users })
  }

  pub fn user_ratings(&self, user: i64) -> Option<&SparseVector> {
    self.users.get(&user)
  }

  /// Replace `user`'s ratings, returning the previous ones.
  pub fn insert_user(&mut self, user: i64, ratings: SparseVector)
      -> Result<Option<SparseVector>, PredictError> {
    if let Some((item, _)) = ratings.iter().find(|(_, rating)| !rating.is_finite()) {
      return Err(PredictError::NonFiniteRating { user, item });
    }
    Ok(self.users.insert(user, ratings))
  }

  pub fn users(&self) -> impl Iterator<Item = i64> + '_ {
    self.users.keys().copied()
  }

  pub fn len(&self) -> usize {
    self.users.len()
  }

  pub fn is_empty(&self) -> bool {
    self.users.is_empty()
  }
}

/// Serves neighbors from precomputed user-user similarities.
///
/// For every item, the eligible neighbors are the target user's similar users
/// who rated it and clear `min_similarity`, keeping the `max_neighbors` with the
/// largest similarity magnitude.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct StaticNeighborhoodFinder {
  store: RatingStore,
  #[builder(setter(custom), default)]
  similarities: BTreeMap<i64, BTreeMap<i64, f64>>,
  #[builder(default = "30")]
  max_neighbors: usize,
  #[builder(default, setter(strip_option))]
  min_similarity: Option<f64>
}

impl StaticNeighborhoodFinderBuilder {
  /// Record the similarity of `neighbor` to `user`. Setting a pair again
  /// replaces the earlier value.
  pub fn similarity(&mut self, user: i64, neighbor: i64, similarity: f64) -> &mut Self {
    self.similarities
      .get_or_insert_with(BTreeMap::new)
      .entry(user)
      .or_default()
      .insert(neighbor, similarity);
    self
  }

  fn validate(&self) -> Result<(), String> {
    if self.max_neighbors == Some(0) {
      return Err("max_neighbors must be positive".to_string());
    }
    let bad = self.similarities.iter()
      .flatten()
      .flat_map(|(user, row)| row.iter().map(move |(nbr, sim)| (*user, *nbr, *sim)))
      .find(|(_, _, sim)| !sim.is_finite());
    match bad {
      Some((user, nbr, sim)) =>
        Err(format!("similarity of {} to {} is not finite: {}", nbr, user, sim)),
      None => Ok(())
    }
  }
}

impl StaticNeighborhoodFinder {
  pub fn builder() -> StaticNeighborhoodFinderBuilder {
    StaticNeighborhoodFinderBuilder::default()
  }

  pub fn store(&self) -> &RatingStore {
    &self.store
  }

  fn candidates(&self, user: i64) -> Vec<(i64, f64, &SparseVector)> {
    let Some(row) = self.similarities.get(&user) else {
      return Vec::new();
    };
    row.iter()
      .filter(|(nbr, _)| **nbr != user)
      .filter(|(_, sim)| self.min_similarity.map_or(true, |min| **sim >= min))
      .filter_map(|(nbr, sim)| {
        self.store.user_ratings(*nbr).map(|ratings| (*nbr, *sim, ratings))
      })
      .collect()
  }
}

impl NeighborhoodFinder for StaticNeighborhoodFinder {
  fn find_neighbors(&self, user: i64, _ratings: &SparseVector, scope: Option<&ItemScope>)
      -> Result<Neighborhoods, PredictError> {
    let span = span!(Level::DEBUG, "static-find-neighbors", user);
    let _guard = span.enter();
    let candidates = self.candidates(user);
    debug!("Found {} candidate neighbors", candidates.len());

    let items: Vec<i64> = match scope {
      Some(scope) => scope.iter().collect(),
      None => candidates.iter()
        .flat_map(|(_, _, ratings)| ratings.keys().iter().copied())
        .collect::<BTreeSet<i64>>()
        .into_iter()
        .collect()
    };

    let mut builder = Neighborhoods::builder();
    let mut handles: HashMap<i64, VectorHandle> = HashMap::new();
    for item in items {
      let mut eligible: Vec<&(i64, f64, &SparseVector)> = candidates.iter()
        .filter(|(_, _, ratings)| ratings.contains_key(item))
        .collect();
      eligible.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then(a.0.cmp(&b.0)));
      eligible.truncate(self.max_neighbors);
      trace!("Item {} has {} neighbors", item, eligible.len());
      for &&(nbr, sim, ratings) in &eligible {
        let handle = *handles.entry(nbr)
          .or_insert_with(|| builder.add_vector(ratings.clone()));
        builder.add_neighbor(item, Neighbor::new(nbr, sim, handle))?;
      }
    }
    debug!("Copied {} neighbor vectors", handles.len());
    Ok(builder.build())
  }
}
