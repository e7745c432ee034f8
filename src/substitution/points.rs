use crate::{quantity::Values, support::positive::Positive};

use super::{Override, SubstitutionError, Substitutions};

/// One combination of swept values together with every fixed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubstitutionPoint {
    swept: Values,
    fixed: Values,
}

impl SubstitutionPoint {
    /// Returns only the swept values of this point.
    #[must_use]
    pub fn swept(&self) -> &Values {
        &self.swept
    }

    /// Returns fixed and swept values, before derived values are computed.
    #[must_use]
    pub fn fixed(&self) -> &Values {
        &self.fixed
    }
}

impl Substitutions {
    /// Expands every sweep into points.
    ///
    /// Without sweeps there is exactly one point.
    #[must_use]
    pub fn points(&self) -> Vec<SubstitutionPoint> {
        let mut base = Values::new();
        let mut sweeps = Vec::new();
        for (id, entry) in &self.entries {
            match &entry.value {
                Override::Fixed(value) => {
                    base.insert(*id, *value);
                }
                Override::Sweep(values) => sweeps.push((*id, values)),
                Override::Derived(_) => {}
            }
        }

        let count: usize = sweeps.iter().map(|(_, values)| values.len()).product();
        (0..count)
            .map(|k| {
                let mut fixed = base.clone();
                let mut swept = Values::new();
                let mut rest = k;
                for (id, values) in sweeps.iter().rev() {
                    let value = values[rest % values.len()];
                    rest /= values.len();
                    fixed.insert(*id, value);
                    swept.insert(*id, value);
                }
                SubstitutionPoint { swept, fixed }
            })
            .collect()
    }

    /// Returns the only point of a set without sweeps.
    ///
    /// # Errors
    ///
    /// Returns [`SubstitutionError::UnexpectedSweep`] naming the first swept
    /// quantity.
    pub fn single_point(&self) -> Result<SubstitutionPoint, SubstitutionError> {
        if let Some(entry) = self
            .entries
            .values()
            .find(|e| matches!(e.value, Override::Sweep(_)))
        {
            return Err(SubstitutionError::UnexpectedSweep {
                name: entry.quantity.qualified_name(),
            });
        }
        let mut points = self.points();
        Ok(points.pop().unwrap_or_default())
    }

    /// Returns the point's fixed values with derived values added.
    ///
    /// # Errors
    ///
    /// Returns [`SubstitutionError::Derived`] if a derived value is not
    /// strictly positive.
    pub fn resolve(&self, point: &SubstitutionPoint) -> Result<Values, SubstitutionError> {
        let mut values = point.fixed.clone();
        for (id, entry) in &self.entries {
            if let Override::Derived(f) = &entry.value {
                let value = f(&values);
                if Positive::new(value).is_err() {
                    return Err(SubstitutionError::Derived {
                        name: entry.quantity.qualified_name(),
                        value,
                    });
                }
                values.insert(*id, value);
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::quantity::{Declaration, Registry};

    #[test]
    fn cartesian_product_in_identity_order() {
        let mut registry = Registry::new();
        let root = registry.root();
        let a = registry.declare(root, Declaration::new("a", "-")).unwrap();
        let b = registry.declare(root, Declaration::new("b", "-")).unwrap();
        let c = registry.declare(root, Declaration::new("c", "-")).unwrap();

        let mut subs = Substitutions::new();
        subs.sweep(&b, vec![10.0, 20.0, 30.0]).unwrap();
        subs.sweep(&a, vec![1.0, 2.0]).unwrap();
        subs.fix(&c, 5.0).unwrap();

        let points = subs.points();
        assert_eq!(points.len(), 6);

        let pairs: Vec<_> = points
            .iter()
            .map(|p| (p.swept().get(&a).unwrap(), p.swept().get(&b).unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![(1.0, 10.0), (1.0, 20.0), (1.0, 30.0), (2.0, 10.0), (2.0, 20.0), (2.0, 30.0)]
        );
        assert!(points.iter().all(|p| p.fixed().get(&c) == Some(5.0)));
        assert!(points.iter().all(|p| p.swept().get(&c).is_none()));

        assert!(matches!(
            subs.single_point(),
            Err(SubstitutionError::UnexpectedSweep { .. })
        ));
    }

    #[test]
    fn derived_values_follow_each_point() {
        let mut registry = Registry::new();
        let root = registry.root();
        let mach = registry.declare(root, Declaration::new("M", "-")).unwrap();
        let beta = registry.declare(root, Declaration::new("beta", "-")).unwrap();

        let mut subs = Substitutions::new();
        subs.sweep(&mach, vec![0.6, 0.8]).unwrap();
        let m = mach.id();
        subs.derive(&beta, move |fixed| {
            (1.0 - fixed.get_id(m).unwrap_or(0.0).powi(2)).sqrt()
        });

        let betas: Vec<_> = subs
            .points()
            .iter()
            .map(|p| subs.resolve(p).unwrap().get(&beta).unwrap())
            .collect();
        assert_relative_eq!(betas[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(betas[1], 0.6, epsilon = 1e-12);

        let mut supersonic = Substitutions::new();
        supersonic.fix(&mach, 1.5).unwrap();
        supersonic.derive(&beta, move |fixed| {
            (1.0 - fixed.get_id(m).unwrap_or(0.0).powi(2)).sqrt()
        });
        let point = supersonic.single_point().unwrap();
        assert!(matches!(
            supersonic.resolve(&point),
            Err(SubstitutionError::Derived { .. })
        ));
    }
}
