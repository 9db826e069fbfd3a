//! # Tabela de Pesos (o modelo aprendido)
//!
//! Matriz esparsa `tag → feature → peso`, com ids estáveis vindos de dois
//! [`Vocabulary`]: um de tags e outro de features.
//!
//! ## Inicialização por contagem
//!
//! O ponto de partida não é um modelo discriminativo: cada par (tag gold,
//! feature) observado no treino soma `+1`. O resultado são contagens de
//! coocorrência brutas, que o [`crate::trainer`] depois corrige.
//!
//! $$ w_{t,f} = \#\{ i : \text{gold}_i = t \land f \in \phi(x_i) \} $$

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::features::FeatureSet;
use crate::vocab::Vocabulary;

/// Pesos por tag, uma linha esparsa (`feature id → peso`) por tag id.
///
/// Invariante: toda tag gold do treino tem linha, mesmo que vazia.
/// Consultas a tags ou features desconhecidas retornam `None` e contam como zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeightTable")]
pub struct WeightTable {
    tags: Vocabulary,
    features: Vocabulary,
    rows: Vec<HashMap<usize, f64>>,
}

/// Forma serializada, validada antes de virar [`WeightTable`].
#[derive(Deserialize)]
struct RawWeightTable {
    tags: Vocabulary,
    features: Vocabulary,
    rows: Vec<HashMap<usize, f64>>,
}

impl TryFrom<RawWeightTable> for WeightTable {
    type Error = String;

    fn try_from(raw: RawWeightTable) -> Result<Self, Self::Error> {
        if raw.rows.len() != raw.tags.len() {
            return Err(format!(
                "{} linhas de pesos para {} tags",
                raw.rows.len(),
                raw.tags.len()
            ));
        }
        let num_features = raw.features.len();
        if let Some(id) = raw.rows.iter().flat_map(HashMap::keys).find(|&&id| id >= num_features) {
            return Err(format!("feature id {id} fora do vocabulário ({num_features} features)"));
        }
        Ok(Self {
            tags: raw.tags,
            features: raw.features,
            rows: raw.rows,
        })
    }
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrói a tabela contando coocorrências (tag gold, feature).
    ///
    /// `gold_tags[i]` é a tag do token cujas features estão em `feature_sets[i]`.
    pub fn initialize<S: AsRef<str>>(gold_tags: &[S], feature_sets: &[FeatureSet]) -> Self {
        let mut table = Self::new();
        for (tag, fs) in gold_tags.iter().zip(feature_sets) {
            let tag_id = table.ensure_tag(tag.as_ref());
            for feature in fs.iter() {
                table.add(tag_id, feature, 1.0);
            }
        }
        tracing::debug!(
            tags = table.num_tags(),
            features = table.num_features(),
            "pesos inicializados por contagem"
        );
        table
    }

    /// Id da tag, criando uma linha vazia se for nova.
    pub fn ensure_tag(&mut self, tag: &str) -> usize {
        let id = self.tags.get_or_insert(tag);
        if id == self.rows.len() {
            self.rows.push(HashMap::new());
        }
        id
    }

    /// Soma `delta` ao peso `(tag, feature)`, criando a entrada com 0 antes.
    ///
    /// Um `tag_id` sem linha é no-op.
    pub fn add(&mut self, tag_id: usize, feature: &str, delta: f64) {
        if tag_id >= self.rows.len() {
            return;
        }
        let feature_id = self.features.get_or_insert(feature);
        if let Some(row) = self.rows.get_mut(tag_id) {
            *row.entry(feature_id).or_insert(0.0) += delta;
        }
    }

    /// Peso de `(tag, feature)`, se a entrada existir.
    pub fn get(&self, tag: &str, feature: &str) -> Option<f64> {
        let tag_id = self.tags.to_id(tag)?;
        let feature_id = self.features.to_id(feature)?;
        self.rows.get(tag_id)?.get(&feature_id).copied()
    }

    /// Soma dos pesos da tag para as features presentes na linha dela.
    pub fn score(&self, tag_id: usize, fs: &FeatureSet) -> f64 {
        let Some(row) = self.rows.get(tag_id) else {
            return 0.0;
        };
        fs.iter()
            .filter_map(|f| self.features.to_id(f))
            .filter_map(|id| row.get(&id))
            .sum()
    }

    /// Subtrai `step` de cada feature de `fs` que já existe na linha da tag.
    ///
    /// Tag ou feature ausentes são no-op. Retorna quantas entradas mudaram.
    pub fn penalize(&mut self, tag: &str, fs: &FeatureSet, step: f64) -> usize {
        let Some(row) = self.tags.to_id(tag).and_then(|id| self.rows.get_mut(id)) else {
            return 0;
        };
        let mut changed = 0;
        for feature in fs.iter() {
            let Some(feature_id) = self.features.to_id(feature) else {
                continue;
            };
            if let Some(w) = row.get_mut(&feature_id) {
                *w -= step;
                changed += 1;
            }
        }
        changed
    }

    /// Tags na ordem de inserção: `(id, nome)`.
    pub fn tags(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.tags.iter()
    }

    pub fn tag_name(&self, tag_id: usize) -> Option<&str> {
        self.tags.to_str(tag_id)
    }

    pub fn tag_id(&self, tag: &str) -> Option<usize> {
        self.tags.to_id(tag)
    }

    pub fn num_tags(&self) -> usize {
        self.tags.len()
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Número de entradas `(tag, feature)` existentes.
    pub fn num_entries(&self) -> usize {
        self.rows.iter().map(HashMap::len).sum()
    }
}
