//! Simulation collaborators read by component construction closures.
//!
//! The particle and field kernels that operate on these are external;
//! only the parts that components consult (species identity, particle
//! counts, field damping) are modelled here.

use crate::error::ComponentError;

/// A particle species.
#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    /// Unique species name.
    pub name: String,
    /// Charge per physical particle.
    pub q: f32,
    /// Mass per physical particle.
    pub m: f32,
    /// Number of macro-particles currently held.
    pub np: u64,
}

/// Ordered species list owned by a simulation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpeciesList {
    species: Vec<Species>,
}

impl SpeciesList {
    /// Create an empty species list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a species, returning its index.
    ///
    /// # Errors
    ///
    /// [`ComponentError::DuplicateName`] if a species with `name` exists.
    pub fn define(&mut self, name: &str, q: f32, m: f32) -> Result<usize, ComponentError> {
        if self.find(name).is_some() {
            return Err(ComponentError::DuplicateName {
                name: name.to_string(),
            });
        }
        self.species.push(Species {
            name: name.to_string(),
            q,
            m,
            np: 0,
        });
        Ok(self.species.len() - 1)
    }

    /// Push a species without checking for name collisions.
    ///
    /// Used when reconstructing a list from a checkpoint.
    pub fn push(&mut self, species: Species) {
        self.species.push(species);
    }

    /// Look up a species by name.
    pub fn find(&self, name: &str) -> Option<&Species> {
        self.species.iter().find(|s| s.name == name)
    }

    /// Index of the species with `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s.name == name)
    }

    /// Species at `index`.
    pub fn get(&self, index: usize) -> Option<&Species> {
        self.species.get(index)
    }

    /// Mutable species at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Species> {
        self.species.get_mut(index)
    }

    /// Number of species.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Whether no species are defined.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Iterate species in definition order.
    pub fn iter(&self) -> std::slice::Iter<'_, Species> {
        self.species.iter()
    }

    /// Iterate species names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.species.iter().map(|s| s.name.as_str())
    }
}

impl<'a> IntoIterator for &'a SpeciesList {
    type Item = &'a Species;
    type IntoIter = std::slice::Iter<'a, Species>;

    fn into_iter(self) -> Self::IntoIter {
        self.species.iter()
    }
}

/// Electromagnetic field array parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldArray {
    /// Radiation damping coefficient.
    pub damp: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_rejects_duplicate_names() {
        let mut list = SpeciesList::new();
        assert_eq!(list.define("electron", -1.0, 1.0), Ok(0));
        assert_eq!(list.define("ion", 1.0, 1836.0), Ok(1));
        assert_eq!(
            list.define("electron", -1.0, 1.0),
            Err(ComponentError::DuplicateName {
                name: "electron".into()
            })
        );
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn names_preserve_definition_order() {
        let mut list = SpeciesList::new();
        list.define("b", 1.0, 1.0).unwrap();
        list.define("a", 1.0, 1.0).unwrap();
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(list.index_of("a"), Some(1));
    }
}
