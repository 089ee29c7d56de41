//! Per-user rating normalization.
//!
//! A [`Normalizer`] moves a user's ratings into a space where users with
//! different rating habits are comparable, and hands out a
//! [`VectorTransformation`] that maps scores computed in that space back onto
//! the user's own scale.

use tracing::trace;

use super::{
  error::PredictError,
  vector::{MutableSparseVector, SparseVector}
};

/// A reversible per-user transform, fixed at creation time.
///
/// Both directions work in place and leave NaN entries as NaN, so "no
/// prediction" survives a round trip.
pub trait VectorTransformation {
  fn apply(&self, vector: &mut MutableSparseVector);

  fn unapply(&self, vector: &mut MutableSparseVector);
}

pub trait Normalizer {
  type Transformation: VectorTransformation;

  /// Normalize `ratings` in place. Applying this twice to the same vector is
  /// not the same as applying it once.
  fn normalize(&self, user: i64, ratings: &mut MutableSparseVector) -> Result<(), PredictError>;

  fn make_transformation(&self, user: i64, ratings: &SparseVector)
      -> Result<Self::Transformation, PredictError>;
}

impl<N> Normalizer for &N
  where N: Normalizer + ?Sized {
  type Transformation = N::Transformation;

  fn normalize(&self, user: i64, ratings: &mut MutableSparseVector) -> Result<(), PredictError> {
    (**self).normalize(user, ratings)
  }

  fn make_transformation(&self, user: i64, ratings: &SparseVector)
      -> Result<Self::Transformation, PredictError> {
    (**self).make_transformation(user, ratings)
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNormalizer;

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformation;

impl VectorTransformation for IdentityTransformation {
  fn apply(&self, _vector: &mut MutableSparseVector) {}

  fn unapply(&self, _vector: &mut MutableSparseVector) {}
}

impl Normalizer for IdentityNormalizer {
  type Transformation = IdentityTransformation;

  fn normalize(&self, _user: i64, _ratings: &mut MutableSparseVector) -> Result<(), PredictError> {
    Ok(())
  }

  fn make_transformation(&self, _user: i64, _ratings: &SparseVector)
      -> Result<IdentityTransformation, PredictError> {
    Ok(IdentityTransformation)
  }
}

/// Shift and scale: `apply` maps `r` to `(r - offset) / scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransformation {
  offset: f64,
  scale: f64
}

impl AffineTransformation {
  pub fn offset(&self) -> f64 {
    self.offset
  }

  pub fn scale(&self) -> f64 {
    self.scale
  }
}

impl VectorTransformation for AffineTransformation {
  fn apply(&self, vector: &mut MutableSparseVector) {
    for (_, value) in vector.values_mut() {
      *value = (*value - self.offset) / self.scale;
    }
  }

  fn unapply(&self, vector: &mut MutableSparseVector) {
    for (_, value) in vector.values_mut() {
      *value = *value * self.scale + self.offset;
    }
  }
}

/// Subtracts each user's (optionally damped) mean rating.
///
/// With damping `d` and global mean `μ` the offset for a user with ratings
/// `r_1..r_n` is `(Σr + d·μ) / (n + d)`. A user without ratings and no damping
/// is centered on `μ`.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct MeanCenteringNormalizer {
  #[builder(default = "0.0")]
  damping: f64,
  #[builder(default = "0.0")]
  global_mean: f64
}

impl MeanCenteringNormalizerBuilder {
  fn validate(&self) -> Result<(), String> {
    if let Some(d) = self.damping {
      if !(d >= 0.0 && d.is_finite()) {
        return Err(format!("damping must be finite and non-negative, got {}", d));
      }
    }
    match self.global_mean {
      Some(mean) if !mean.is_finite() =>
        Err(format!("global mean must be finite, got {}", mean)),
      _ => Ok(())
    }
  }
}

impl Default for MeanCenteringNormalizer {
  fn default() -> Self {
    Self { damping: 0.0, global_mean: 0.0 }
  }
}

impl MeanCenteringNormalizer {
  pub fn builder() -> MeanCenteringNormalizerBuilder {
    MeanCenteringNormalizerBuilder::default()
  }

  fn offset<I>(&self, values: I) -> f64
    where I: IntoIterator<Item = f64> {
    let (sum, count) = values.into_iter()
      .filter(|v| !v.is_nan())
      .fold((0.0f64, 0usize), |(sum, count), v| (sum + v, count + 1));
    let denominator = count as f64 + self.damping;
    if denominator == 0.0 {
      self.global_mean
    } else {
      (sum + self.damping * self.global_mean) / denominator
    }
  }

  fn transformation<I>(&self, user: i64, values: I) -> AffineTransformation
    where I: IntoIterator<Item = f64> {
    let offset = self.offset(values);
    trace!("user {} centered on {}", user, offset);
    AffineTransformation { offset, scale: 1.0 }
  }
}

impl Normalizer for MeanCenteringNormalizer {
  type Transformation = AffineTransformation;

  fn normalize(&self, user: i64, ratings: &mut MutableSparseVector) -> Result<(), PredictError> {
    let transform = self.transformation(user, ratings.iter().map(|(_, v)| v));
    transform.apply(ratings);
    Ok(())
  }

  fn make_transformation(&self, user: i64, ratings: &SparseVector)
      -> Result<AffineTransformation, PredictError> {
    Ok(self.transformation(user, ratings.values().iter().copied()))
  }
}

/// Converts each user's ratings to z-scores. Users whose ratings have no spread
/// are only centered.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanVarianceNormalizer;

impl MeanVarianceNormalizer {
  fn transformation<I>(&self, user: i64, values: I) -> AffineTransformation
    where I: IntoIterator<Item = f64> {
    let values: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
      return AffineTransformation { offset: 0.0, scale: 1.0 };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    let scale = if std_dev > f64::EPSILON { std_dev } else { 1.0 };
    trace!("user {} has mean {} and scale {}", user, mean, scale);
    AffineTransformation { offset: mean, scale }
  }
}

impl Normalizer for MeanVarianceNormalizer {
  type Transformation = AffineTransformation;

  fn normalize(&self, user: i64, ratings: &mut MutableSparseVector) -> Result<(), PredictError> {
    let transform = self.transformation(user, ratings.iter().map(|(_, v)| v));
    transform.apply(ratings);
    Ok(())
  }

  fn make_transformation(&self, user: i64, ratings: &SparseVector)
      -> Result<AffineTransformation, PredictError> {
    Ok(self.transformation(user, ratings.values().iter().copied()))
  }
}
