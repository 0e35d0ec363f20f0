use std::sync::Arc;

/// Identifier of a transform frame.
///
/// A frame id is a non-empty string, unique within a graph, immutable once
/// assigned. Cloning is cheap (shared string storage), so the same id can be
/// handed around freely between the graph, snapshots and change callbacks.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(Arc<str>);

impl FrameId {
    #[inline]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrameId {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for FrameId {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl From<&str> for FrameId {
    #[inline]
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FrameId {
    #[inline]
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for FrameId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Allows looking up map entries keyed by [`FrameId`] with a plain `&str`.
impl std::borrow::Borrow<str> for FrameId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for FrameId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for FrameId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::FrameId;

    #[test]
    fn test_str_lookup() {
        let mut ids = std::collections::HashMap::new();
        ids.insert(FrameId::new("robot/arm"), 1);

        // `Borrow<str>` must agree with `Hash`/`Eq` for str-keyed lookups to work.
        assert_eq!(ids.get("robot/arm"), Some(&1));
        assert_eq!(ids.get("robot"), None);
    }

    #[test]
    fn test_serde_plain_string() {
        let id = FrameId::new("camera");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"camera\"");
        assert_eq!(
            serde_json::from_str::<FrameId>("\"camera\"").unwrap(),
            FrameId::new("camera")
        );
    }
}
