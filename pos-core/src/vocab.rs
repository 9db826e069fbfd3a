//! Vocabulário bidirecional string ↔ id estável.
//!
//! Tags e features ganham ids inteiros na ordem em que aparecem pela primeira
//! vez; a ordem de inserção é também a ordem de iteração.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Serializado como a lista ordenada de strings; o índice reverso é
/// reconstruído na desserialização. Uma lista com entradas repetidas é
/// rejeitada, já que deslocaria os ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    entries: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id existente ou um novo, no fim da ordem de inserção.
    pub fn get_or_insert(&mut self, key: &str) -> usize {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        let id = self.entries.len();
        self.ids.insert(key.to_string(), id);
        self.entries.push(key.to_string());
        id
    }

    pub fn to_id(&self, key: &str) -> Option<usize> {
        self.ids.get(key).copied()
    }

    pub fn to_str(&self, id: usize) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.entries.iter().enumerate().map(|(id, s)| (id, s.as_str()))
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = String;

    fn try_from(entries: Vec<String>) -> Result<Self, Self::Error> {
        let mut vocab = Vocabulary::new();
        for (i, entry) in entries.iter().enumerate() {
            if vocab.get_or_insert(entry) != i {
                return Err(format!("entrada repetida no vocabulário: {entry:?}"));
            }
        }
        Ok(vocab)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut vocab = Vocabulary::new();
        for (s, id) in [("NN", 0), ("VB", 1), ("NN", 0), ("DT", 2), ("VB", 1)] {
            assert_eq!(vocab.get_or_insert(s), id, "{s}");
        }
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.to_str(2), Some("DT"));
        assert_eq!(vocab.to_str(3), None);
        assert_eq!(vocab.to_id("JJ"), None);
    }

    #[test]
    fn test_serialized_as_ordered_list() {
        let vocab = Vocabulary::try_from(vec!["w=dog".to_string(), "suf=ing".to_string()]).unwrap();
        let json = serde_json::to_string(&vocab).unwrap();
        assert_eq!(json, r#"["w=dog","suf=ing"]"#);

        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vocab);
        assert_eq!(back.to_id("suf=ing"), Some(1));
    }

    #[test]
    fn test_duplicate_entries_are_rejected() {
        let err = Vocabulary::try_from(vec!["NN".to_string(), "VB".to_string(), "NN".to_string()]);
        assert!(err.is_err());
        assert!(serde_json::from_str::<Vocabulary>(r#"["NN","NN"]"#).is_err());
    }
}
