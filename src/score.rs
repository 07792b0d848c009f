use std::borrow::Cow;
use std::fmt;
use std::ops::{Add, Mul};

use ordered_float::OrderedFloat;

/// Quality measure of a match between abstract location reference data and a concrete graph.
///
/// A score is an immutable `(name, description, value, reference)` tuple where the value is always
/// within `[0, reference]`. Scores compose into binary trees with two operators:
/// - product (conjunctive criteria): values and references are multiplied.
/// - sum (independent criteria): values and references are added.
///
/// Composites keep their sub-expressions so that a named criterion can be looked up again from a
/// blended total with [`Score::find`].
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    name: Cow<'static, str>,
    description: Cow<'static, str>,
    value: f64,
    reference: f64,
    composition: Composition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Composition {
    Leaf,
    Sum(Box<Score>, Box<Score>),
    Product(Box<Score>, Box<Score>),
}

impl Score {
    /// Creates a leaf score, the value is clamped within `[0, reference]`.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        value: f64,
        reference: f64,
    ) -> Self {
        let reference = if reference.is_finite() {
            reference.max(0.0)
        } else {
            0.0
        };
        let value = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, reference)
        };

        Self {
            name: name.into(),
            description: description.into(),
            value,
            reference,
            composition: Composition::Leaf,
        }
    }

    /// Leaf score whose value is a ratio in `[0, 1]`.
    pub fn ratio_of(name: impl Into<Cow<'static, str>>, value: f64) -> Self {
        Self::new(name, "", value, 1.0)
    }

    /// Perfect leaf score, useful as the identity of a product.
    pub fn perfect(name: impl Into<Cow<'static, str>>) -> Self {
        Self::ratio_of(name, 1.0)
    }

    /// Zero leaf score, a product with it never ranks above zero.
    pub fn zero(name: impl Into<Cow<'static, str>>) -> Self {
        Self::ratio_of(name, 0.0)
    }

    /// Named conjunction of two scores.
    pub fn product(
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        left: Self,
        right: Self,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            value: left.value * right.value,
            reference: left.reference * right.reference,
            composition: Composition::Product(Box::new(left), Box::new(right)),
        }
    }

    /// Named accumulation of two scores.
    pub fn sum(
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        left: Self,
        right: Self,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            value: left.value + right.value,
            reference: left.reference + right.reference,
            composition: Composition::Sum(Box::new(left), Box::new(right)),
        }
    }

    /// Renames the score keeping its value and composition.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub const fn value(&self) -> f64 {
        self.value
    }

    pub const fn reference(&self) -> f64 {
        self.reference
    }

    pub const fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Normalized score in `[0, 1]`, zero when the reference is zero.
    pub fn ratio(&self) -> f64 {
        if self.reference > 0.0 {
            self.value / self.reference
        } else {
            0.0
        }
    }

    /// Total order key of the score, higher ranks are better.
    pub fn rank(&self) -> OrderedFloat<f64> {
        OrderedFloat(self.ratio())
    }

    pub fn is_perfect(&self) -> bool {
        self.reference > 0.0 && self.value >= self.reference
    }

    /// Recovers the sub-score with the given name.
    /// When several nodes of the tree carry the name they are recombined with a sum.
    /// Matching nodes are not searched further down.
    pub fn find(&self, name: &str) -> Option<Self> {
        if self.name == name {
            return Some(self.clone());
        }

        match &self.composition {
            Composition::Leaf => None,
            Composition::Sum(left, right) | Composition::Product(left, right) => {
                match (left.find(name), right.find(name)) {
                    (Some(left), Some(right)) => Some(Self::sum(name.to_owned(), "", left, right)),
                    (left, right) => left.or(right),
                }
            }
        }
    }
}

impl Mul for Score {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::product("", "", self, rhs)
    }
}

impl Add for Score {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::sum("", "", self, rhs)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() {
            "score"
        } else {
            &self.name
        };
        write!(f, "{name}={:.4}/{:.4}", self.value, self.reference)
    }
}
