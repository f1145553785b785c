use crate::objects::{Name, PdfObject};

/// PDF dictionary. Keys are unique by name bytes; insertion order is
/// preserved so serialization is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<(Name, PdfObject)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace. Replacing keeps the key's original position.
    pub fn set(&mut self, key: impl Into<Name>, value: impl Into<PdfObject>) {
        let key = key.into();
        let value = value.into();
        for (name, slot) in &mut self.entries {
            if *name == key {
                *slot = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries
            .iter()
            .find(|(name, _)| name.as_str() == key)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PdfObject> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name.as_str() == key)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, key: &str) -> Option<PdfObject> {
        let idx = self.entries.iter().position(|(name, _)| name.as_str() == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(name, _)| name.as_str() == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.entries.iter().map(|(name, _)| name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &PdfObject)> {
        self.entries.iter().map(|(name, value)| (name, value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Name, &mut PdfObject)> {
        self.entries.iter_mut().map(|(name, value)| (&*name, value))
    }
}

impl FromIterator<(Name, PdfObject)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Name, PdfObject)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        for (key, value) in iter {
            dict.set(key, value);
        }
        dict
    }
}
