//! # Preditor do Perceptron
//!
//! Cada token é classificado de forma independente (sem Viterbi, sem beam):
//! a tag escolhida é o argmax da soma dos pesos das features ativas.
//!
//! $$ \hat{y} = \arg\max_{t} \sum_{f \in \phi(x)} w_{t,f} $$
//!
//! ## Desempate e piso em zero
//!
//! O melhor score começa em `0` com a tag "não atribuída" (`None`). Uma tag só
//! substitui a atual se for **estritamente** maior. Consequências:
//! - se nenhuma tag pontua acima de zero, o resultado é `None`;
//! - entre empates, vence a primeira tag na ordem de inserção da tabela.
//!
//! Os scores são somas de pesos sem normalização, não probabilidades.

use crate::features::FeatureSet;
use crate::weights::WeightTable;

/// Melhor tag entre todas as tags da tabela, na ordem de inserção.
pub fn predict(weights: &WeightTable, fs: &FeatureSet) -> Option<usize> {
    predict_among(weights, fs, weights.tags().map(|(id, _)| id))
}

/// Melhor tag entre `candidates`, percorridos na ordem dada.
pub fn predict_among(
    weights: &WeightTable,
    fs: &FeatureSet,
    candidates: impl IntoIterator<Item = usize>,
) -> Option<usize> {
    let mut best_tag = None;
    let mut best_score = 0.0;

    for tag_id in candidates {
        let score = weights.score(tag_id, fs);
        if score > best_score {
            best_score = score;
            best_tag = Some(tag_id);
        }
    }
    best_tag
}

/// Prediz todos os tokens com o mesmo snapshot de pesos.
pub fn predict_all(weights: &WeightTable, feature_sets: &[FeatureSet]) -> Vec<Option<usize>> {
    feature_sets.iter().map(|fs| predict(weights, fs)).collect()
}

/// Converte ids preditos em nomes de tag.
pub fn tag_names<'w>(weights: &'w WeightTable, predictions: &[Option<usize>]) -> Vec<Option<&'w str>> {
    predictions
        .iter()
        .map(|p| p.and_then(|id| weights.tag_name(id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs(features: &[&str]) -> FeatureSet {
        FeatureSet {
            features: features.iter().map(|f| f.to_string()).collect(),
            token_index: 0,
        }
    }

    fn table(entries: &[(&str, &str, f64)]) -> WeightTable {
        let mut table = WeightTable::new();
        for (tag, feature, w) in entries {
            let id = table.ensure_tag(tag);
            table.add(id, feature, *w);
        }
        table
    }

    #[test]
    fn test_highest_score_wins() {
        let weights = table(&[("NN", "w=dog", 5.0), ("VB", "w=dog", 3.0)]);
        let best = predict(&weights, &fs(&["w=dog"]));
        assert_eq!(best.and_then(|id| weights.tag_name(id)), Some("NN"));
    }

    #[test]
    fn test_tie_goes_to_first_tag() {
        let weights = table(&[("VB", "w=run", 4.0), ("NN", "w=run", 4.0)]);
        let best = predict(&weights, &fs(&["w=run"]));
        assert_eq!(best.and_then(|id| weights.tag_name(id)), Some("VB"));
    }

    #[test]
    fn test_non_positive_scores_leave_tag_unassigned() {
        let weights = table(&[("NN", "w=dog", -1.0), ("VB", "w=dog", 0.0)]);
        assert_eq!(predict(&weights, &fs(&["w=dog"])), None);
        // Nenhuma feature conhecida: todos os scores são 0
        assert_eq!(predict(&weights, &fs(&["w=cat"])), None);
    }

    #[test]
    fn test_predict_among_respects_candidate_order() {
        let weights = table(&[("NN", "w=run", 2.0), ("VB", "w=run", 2.0)]);
        let vb = weights.tag_id("VB").unwrap();
        let nn = weights.tag_id("NN").unwrap();
        assert_eq!(predict_among(&weights, &fs(&["w=run"]), [vb, nn]), Some(vb));
    }

    #[test]
    fn test_tag_names() {
        let weights = table(&[("NN", "w=dog", 1.0)]);
        let predictions = predict_all(&weights, &[fs(&["w=dog"]), fs(&["w=cat"])]);
        assert_eq!(tag_names(&weights, &predictions), vec![Some("NN"), None]);
    }
}
