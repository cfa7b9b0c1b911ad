use crate::real::Real;

/// Index of a slot in a [`Bindings`] table.
///
/// Parsed [`Expression`](crate::Expression)s store these instead of values,
/// so changing a slot after parsing is seen by the next evaluation.
pub type BindingId = usize;

/// Caller-owned table of single-character variables.
///
/// Names compare ASCII case-insensitively and are unique within a table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bindings {
    names: Vec<char>,
    values: Vec<Real>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// `x` and `z`, both zero: the horizontal coordinates of a sampled
    /// surface.
    pub fn xz() -> Self {
        [('x', 0.0), ('z', 0.0)].into_iter().collect()
    }

    /// Adds a slot, or overwrites the value of the slot that already has this
    /// name.
    pub fn declare(&mut self, name: char, value: Real) -> BindingId {
        if let Some(id) = self.find(name) {
            self.values[id] = value;
            return id;
        }
        self.names.push(name);
        self.values.push(value);
        self.names.len() - 1
    }

    pub fn find(&self, name: char) -> Option<BindingId> {
        self.names.iter().position(|n| n.eq_ignore_ascii_case(&name))
    }

    pub fn name(&self, id: BindingId) -> Option<char> {
        self.names.get(id).copied()
    }

    pub fn get(&self, id: BindingId) -> Option<Real> {
        self.values.get(id).copied()
    }

    /// # Panics
    ///
    /// If `id` was not handed out by this table.
    pub fn set(&mut self, id: BindingId, value: Real) {
        self.values[id] = value;
    }

    /// Returns the slot that was updated, or `None` if no slot has this name.
    pub fn set_by_name(&mut self, name: char, value: Real) -> Option<BindingId> {
        let id = self.find(name)?;
        self.values[id] = value;
        Some(id)
    }

    /// Current values, indexed by [`BindingId`].
    pub fn values(&self) -> &[Real] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, Real)> + '_ {
        self.names.iter().copied().zip(self.values.iter().copied())
    }
}

impl FromIterator<(char, Real)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (char, Real)>>(iter: I) -> Self {
        let mut bindings = Self::new();
        for (name, value) in iter {
            bindings.declare(name, value);
        }
        bindings
    }
}
