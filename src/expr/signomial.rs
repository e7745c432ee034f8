use std::{
    collections::{BTreeMap, BTreeSet},
    ops::{Add, Div, Mul, Neg},
};

use crate::quantity::{QuantityId, Values};

use super::ExprError;

/// Exponents closer than this are the same exponent.
const EXPONENT_TOL: f64 = 1e-12;

/// Coefficients that cancel to within this fraction of their inputs vanish.
const CANCEL_TOL: f64 = 1e-12;

/// A single term `c * x1^a1 * x2^a2 * ...` with a real coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct Monomial {
    coeff: f64,
    exponents: BTreeMap<QuantityId, f64>,
}

impl Monomial {
    /// A constant term.
    #[must_use]
    pub fn constant(coeff: f64) -> Self {
        Self {
            coeff,
            exponents: BTreeMap::new(),
        }
    }

    /// The term `coeff * x`.
    #[must_use]
    pub fn variable(id: QuantityId, coeff: f64) -> Self {
        Self {
            coeff,
            exponents: BTreeMap::from([(id, 1.0)]),
        }
    }

    /// Builds a term from a coefficient and exponents, dropping zero exponents.
    #[must_use]
    pub fn new(coeff: f64, exponents: impl IntoIterator<Item = (QuantityId, f64)>) -> Self {
        Self {
            coeff,
            exponents: exponents
                .into_iter()
                .filter(|(_, e)| e.abs() > EXPONENT_TOL)
                .collect(),
        }
    }

    #[must_use]
    pub fn coeff(&self) -> f64 {
        self.coeff
    }

    #[must_use]
    pub fn exponents(&self) -> &BTreeMap<QuantityId, f64> {
        &self.exponents
    }

    /// Returns the exponent of a quantity, zero if absent.
    #[must_use]
    pub fn exponent(&self, id: QuantityId) -> f64 {
        self.exponents.get(&id).copied().unwrap_or(0.0)
    }

    /// Returns true if no quantity appears in the term.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Raises the term to a real power.
    ///
    /// Returns `None` if the coefficient has no real power: a non-positive
    /// coefficient under a fractional power, or zero under a negative one.
    #[must_use]
    pub fn powf(&self, power: f64) -> Option<Self> {
        let fractional = power.fract() != 0.0;
        if (self.coeff < 0.0 && fractional) || (self.coeff == 0.0 && power <= 0.0) {
            return None;
        }
        let coeff = self.coeff.powf(power);
        coeff.is_finite().then(|| {
            Self::new(coeff, self.exponents.iter().map(|(id, e)| (*id, e * power)))
        })
    }

    /// Evaluates the term.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::MissingValue`] if a quantity has no value.
    pub fn eval(&self, values: &Values) -> Result<f64, ExprError> {
        self.exponents.iter().try_fold(self.coeff, |acc, (id, e)| {
            let x = values
                .get_id(*id)
                .ok_or(ExprError::MissingValue { id: *id })?;
            Ok::<_, ExprError>(acc * x.powf(*e))
        })
    }

    /// Folds every quantity with a value into the coefficient.
    #[must_use]
    pub fn substitute(&self, values: &Values) -> Self {
        let mut coeff = self.coeff;
        let mut exponents = BTreeMap::new();
        for (id, e) in &self.exponents {
            match values.get_id(*id) {
                Some(x) => coeff *= x.powf(*e),
                None => {
                    exponents.insert(*id, *e);
                }
            }
        }
        Self { coeff, exponents }
    }

    fn same_powers(&self, other: &Self) -> bool {
        self.exponents.len() == other.exponents.len()
            && self
                .exponents
                .iter()
                .zip(&other.exponents)
                .all(|((a, x), (b, y))| a == b && (x - y).abs() <= EXPONENT_TOL)
    }
}

impl Mul for &Monomial {
    type Output = Monomial;

    fn mul(self, rhs: &Monomial) -> Monomial {
        let mut exponents = self.exponents.clone();
        for (id, e) in &rhs.exponents {
            *exponents.entry(*id).or_insert(0.0) += e;
        }
        Monomial::new(self.coeff * rhs.coeff, exponents)
    }
}

impl Div for &Monomial {
    type Output = Monomial;

    fn div(self, rhs: &Monomial) -> Monomial {
        let mut exponents = self.exponents.clone();
        for (id, e) in &rhs.exponents {
            *exponents.entry(*id).or_insert(0.0) -= e;
        }
        Monomial::new(self.coeff / rhs.coeff, exponents)
    }
}

/// A sum of monomials with like terms combined.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signomial {
    terms: Vec<Monomial>,
}

impl Signomial {
    /// The empty sum.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn one() -> Self {
        Self::constant(1.0)
    }

    #[must_use]
    pub fn constant(value: f64) -> Self {
        Monomial::constant(value).into()
    }

    #[must_use]
    pub fn terms(&self) -> &[Monomial] {
        &self.terms
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns every quantity with a nonzero exponent in some term.
    #[must_use]
    pub fn quantities(&self) -> BTreeSet<QuantityId> {
        self.terms
            .iter()
            .flat_map(|t| t.exponents.keys().copied())
            .collect()
    }

    /// Raises the sum to a power, if the result is still a signomial.
    ///
    /// Single terms take any real power their coefficient allows; sums take
    /// non-negative integer powers.
    #[must_use]
    pub fn powf(&self, power: f64) -> Option<Self> {
        match self.terms.as_slice() {
            [] if power > 0.0 => Some(Self::zero()),
            [term] => term.powf(power).map(Into::into),
            _ if power >= 0.0 && power.fract() == 0.0 => {
                let mut result = Self::one();
                for _ in 0..(power as u32) {
                    result = &result * self;
                }
                Some(result)
            }
            _ => None,
        }
    }

    /// Evaluates the sum.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::MissingValue`] if a quantity has no value.
    pub fn eval(&self, values: &Values) -> Result<f64, ExprError> {
        self.terms.iter().map(|t| t.eval(values)).sum()
    }

    /// Folds every quantity with a value into the coefficients.
    #[must_use]
    pub fn substitute(&self, values: &Values) -> Self {
        self.terms.iter().fold(Self::zero(), |mut acc, t| {
            acc.push(t.substitute(values));
            acc
        })
    }

    /// Splits into positive terms and the negation of the negative terms, so
    /// that `self == positive - negative`.
    #[must_use]
    pub fn split(&self) -> (Posynomial, Posynomial) {
        let (positive, negative): (Vec<_>, Vec<_>) =
            self.terms.iter().cloned().partition(|t| t.coeff > 0.0);
        let negative = negative
            .into_iter()
            .map(|t| Monomial {
                coeff: -t.coeff,
                exponents: t.exponents,
            })
            .collect();
        (Posynomial { terms: positive }, Posynomial { terms: negative })
    }

    fn push(&mut self, term: Monomial) {
        if term.coeff == 0.0 {
            return;
        }
        match self.terms.iter().position(|t| t.same_powers(&term)) {
            Some(i) => {
                let existing = self.terms[i].coeff;
                let combined = existing + term.coeff;
                if combined.abs() <= CANCEL_TOL * existing.abs().max(term.coeff.abs()) {
                    self.terms.remove(i);
                } else {
                    self.terms[i].coeff = combined;
                }
            }
            None => self.terms.push(term),
        }
    }
}

impl From<Monomial> for Signomial {
    fn from(term: Monomial) -> Self {
        let mut signomial = Self::zero();
        signomial.push(term);
        signomial
    }
}

impl Add for Signomial {
    type Output = Signomial;

    fn add(mut self, rhs: Signomial) -> Signomial {
        for term in rhs.terms {
            self.push(term);
        }
        self
    }
}

impl Neg for Signomial {
    type Output = Signomial;

    fn neg(mut self) -> Signomial {
        for term in &mut self.terms {
            term.coeff = -term.coeff;
        }
        self
    }
}

impl Mul for &Signomial {
    type Output = Signomial;

    fn mul(self, rhs: &Signomial) -> Signomial {
        let mut product = Signomial::zero();
        for a in &self.terms {
            for b in &rhs.terms {
                product.push(a * b);
            }
        }
        product
    }
}

/// A sum of monomials with strictly positive coefficients.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Posynomial {
    terms: Vec<Monomial>,
}

impl Posynomial {
    /// Checks that a signomial has only positive terms.
    #[must_use]
    pub fn from_signomial(signomial: &Signomial) -> Option<Self> {
        signomial
            .terms
            .iter()
            .all(|t| t.coeff > 0.0)
            .then(|| Self {
                terms: signomial.terms.clone(),
            })
    }

    #[must_use]
    pub fn terms(&self) -> &[Monomial] {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns the single term, if there is exactly one.
    #[must_use]
    pub fn as_monomial(&self) -> Option<&Monomial> {
        match self.terms.as_slice() {
            [term] => Some(term),
            _ => None,
        }
    }

    /// Returns true if no quantity appears in any term.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(Monomial::is_constant)
    }

    #[must_use]
    pub fn quantities(&self) -> BTreeSet<QuantityId> {
        self.terms
            .iter()
            .flat_map(|t| t.exponents.keys().copied())
            .collect()
    }

    /// Evaluates the sum.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::MissingValue`] if a quantity has no value.
    pub fn eval(&self, values: &Values) -> Result<f64, ExprError> {
        self.terms.iter().map(|t| t.eval(values)).sum()
    }

    /// Folds every quantity with a value into the coefficients.
    #[must_use]
    pub fn substitute(&self, values: &Values) -> Self {
        let mut substituted = Signomial::zero();
        for term in &self.terms {
            substituted.push(term.substitute(values));
        }
        Self {
            terms: substituted.terms,
        }
    }

    /// Divides every term by a monomial.
    #[must_use]
    pub fn div_monomial(&self, divisor: &Monomial) -> Self {
        Self {
            terms: self.terms.iter().map(|t| t / divisor).collect(),
        }
    }

    /// Returns the monomial that matches this posynomial's value and
    /// log-gradient at `point`.
    ///
    /// By the weighted AM-GM inequality the result never exceeds the
    /// posynomial anywhere, and equals it at `point`.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::MissingValue`] if `point` lacks a quantity.
    pub fn monomial_approximation(&self, point: &Values) -> Result<Monomial, ExprError> {
        let values = self
            .terms
            .iter()
            .map(|t| t.eval(point))
            .collect::<Result<Vec<_>, _>>()?;
        let total: f64 = values.iter().sum();

        let mut exponents = BTreeMap::new();
        for (term, value) in self.terms.iter().zip(&values) {
            let weight = value / total;
            for (id, e) in &term.exponents {
                *exponents.entry(*id).or_insert(0.0) += weight * e;
            }
        }

        let mut coeff = total;
        for (id, a) in &exponents {
            let x = point.get_id(*id).ok_or(ExprError::MissingValue { id: *id })?;
            coeff /= x.powf(*a);
        }
        Ok(Monomial::new(coeff, exponents))
    }
}
