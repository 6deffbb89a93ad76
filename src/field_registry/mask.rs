use serde::{Deserialize, Serialize};

use super::{FieldType, FilterScope};

/// Set of fields, one bit per [`FieldType`].
///
/// Serialized as the list of persisted field names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<FieldType>", into = "Vec<FieldType>")]
pub struct FieldMask(u64);

impl FieldMask {
    pub const fn empty() -> Self {
        FieldMask(0)
    }

    /// Every field of one scope.
    pub fn all_of(scope: FilterScope) -> Self {
        FieldType::ALL
            .iter()
            .copied()
            .filter(|f| f.scope() == scope)
            .collect()
    }

    pub fn insert(&mut self, field: FieldType) {
        self.0 |= Self::bit(field);
    }

    pub fn remove(&mut self, field: FieldType) {
        self.0 &= !Self::bit(field);
    }

    pub fn with(mut self, field: FieldType) -> Self {
        self.insert(field);
        self
    }

    pub fn contains(&self, field: FieldType) -> bool {
        self.0 & Self::bit(field) != 0
    }

    pub fn union(self, other: FieldMask) -> FieldMask {
        FieldMask(self.0 | other.0)
    }

    pub fn intersection(self, other: FieldMask) -> FieldMask {
        FieldMask(self.0 & other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Fields in discriminant order.
    pub fn iter(&self) -> impl Iterator<Item = FieldType> + '_ {
        FieldType::ALL.iter().copied().filter(move |f| self.contains(*f))
    }

    fn bit(field: FieldType) -> u64 {
        1u64 << (field as u8)
    }
}

impl FromIterator<FieldType> for FieldMask {
    fn from_iter<I: IntoIterator<Item = FieldType>>(iter: I) -> Self {
        let mut mask = FieldMask::empty();
        for field in iter {
            mask.insert(field);
        }
        mask
    }
}

impl From<Vec<FieldType>> for FieldMask {
    fn from(fields: Vec<FieldType>) -> Self {
        fields.into_iter().collect()
    }
}

impl From<FieldMask> for Vec<FieldType> {
    fn from(mask: FieldMask) -> Self {
        mask.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut mask = FieldMask::empty();
        assert!(mask.is_empty());
        mask.insert(FieldType::Password);
        mask.insert(FieldType::AttachmentFileAccessed);
        assert!(mask.contains(FieldType::Password));
        assert!(mask.contains(FieldType::AttachmentFileAccessed));
        assert!(!mask.contains(FieldType::Notes));
        assert_eq!(mask.len(), 2);

        mask.remove(FieldType::Password);
        assert!(!mask.contains(FieldType::Password));
        assert_eq!(mask.len(), 1);
    }

    #[test]
    fn test_set_operations() {
        let a = FieldMask::empty().with(FieldType::Notes).with(FieldType::Url);
        let b = FieldMask::empty().with(FieldType::Url).with(FieldType::Email);
        assert_eq!(a.union(b).len(), 3);
        assert_eq!(a.intersection(b), FieldMask::empty().with(FieldType::Url));
    }

    #[test]
    fn test_serializes_as_field_names() {
        let mask = FieldMask::empty().with(FieldType::Notes).with(FieldType::Password);
        let json = serde_json::to_string(&mask).unwrap();
        assert_eq!(json, r#"["notes","password"]"#);

        let parsed: FieldMask = serde_json::from_str(r#"["password","notes"]"#).unwrap();
        assert_eq!(parsed, mask);
    }

    #[test]
    fn test_all_of_scope() {
        assert_eq!(FieldMask::all_of(FilterScope::History).len(), 6);
        assert_eq!(FieldMask::all_of(FilterScope::Policy).len(), 9);
        assert_eq!(FieldMask::all_of(FilterScope::Attachment).len(), 9);
    }
}
