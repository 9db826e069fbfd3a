//! # Treinamento Orientado a Erros
//!
//! Máquina de estados sobre as passadas de treino:
//!
//! ```text
//! Uninitialized ──initialize──▶ Initialized ──passadas──▶ Exhausted
//! ```
//!
//! 1. Os pesos nascem das contagens de coocorrência do corpus de treino e são
//!    gravados no checkpoint.
//! 2. Todo o conjunto de teste é predito e as predições vão para o sink.
//! 3. Cada passada extra relê o checkpoint e, para cada token de teste com
//!    predição errada, subtrai `step` dos pesos das features do token na linha
//!    da tag **predita**. A tag correta não é recompensada (atualização
//!    assimétrica). Os pesos são gravados e o teste é predito de novo.
//!
//! As correções usam os erros do próprio conjunto de teste, não de uma partição
//! de validação separada. Não há detecção de convergência: o laço sempre roda
//! o número de passadas pedido, e a mesma entrada produz sempre o mesmo resultado.

use crate::checkpoint::CheckpointStore;
use crate::corpus::{PredictionSink, TaggedCorpus};
use crate::error::{PosError, Result};
use crate::features::{extract_features, FeatureFlags, FeatureSet};
use crate::perceptron::{predict_all, tag_names};
use crate::weights::WeightTable;

/// Passo de penalização padrão.
pub const DEFAULT_STEP: f64 = 100.0;

/// Parâmetros do treino.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    iterations: usize,
    step: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            step: DEFAULT_STEP,
        }
    }
}

impl TrainConfig {
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Número total de passadas, contando a inicial. Deve ser pelo menos 1.
    pub fn set_iterations(&mut self, iterations: usize) -> Result<()> {
        if iterations < 1 {
            return Err(PosError::InvalidParameter(
                "iterations deve ser pelo menos 1".to_string(),
            ));
        }
        self.iterations = iterations;
        Ok(())
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn set_step(&mut self, step: f64) -> Result<()> {
        if !step.is_finite() || step <= 0.0 {
            return Err(PosError::InvalidParameter(format!(
                "step deve ser finito e positivo (recebido {step})"
            )));
        }
        self.step = step;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Uninitialized,
    Initialized,
    /// Todas as passadas pedidas foram executadas.
    Exhausted,
}

/// Resultado de um treino completo.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Predições finais para o conjunto de teste (`None` = não atribuída).
    pub predictions: Vec<Option<String>>,
    /// Snapshot final dos pesos.
    pub weights: WeightTable,
    /// Tokens de teste errados após cada passada (a inicial inclusive).
    pub errors_per_iteration: Vec<usize>,
}

impl TrainingOutcome {
    /// Erros da última passada.
    pub fn final_errors(&self) -> usize {
        self.errors_per_iteration.last().copied().unwrap_or(0)
    }
}

/// Treinador do perceptron sobre um par (treino, teste).
pub struct Trainer<C, S> {
    config: TrainConfig,
    train_tags: Vec<String>,
    train_features: Vec<FeatureSet>,
    test: TaggedCorpus,
    test_features: Vec<FeatureSet>,
    checkpoint: C,
    sink: S,
    state: TrainerState,
}

impl<C: CheckpointStore, S: PredictionSink> Trainer<C, S> {
    /// Extrai as features dos dois corpora com as mesmas `flags`.
    pub fn new(
        train: &TaggedCorpus,
        test: TaggedCorpus,
        flags: FeatureFlags,
        config: TrainConfig,
        checkpoint: C,
        sink: S,
    ) -> Self {
        let train_features = extract_features(&train.words(), flags);
        let test_features = extract_features(&test.words(), flags);
        tracing::info!(
            treino = train.len(),
            teste = test.len(),
            %flags,
            "features extraídas"
        );
        Self {
            config,
            train_tags: train.tags.clone(),
            train_features,
            test,
            test_features,
            checkpoint,
            sink,
            state: TrainerState::Uninitialized,
        }
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn checkpoint(&self) -> &C {
        &self.checkpoint
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Features de todos os tokens de teste, na ordem do corpus.
    pub fn test_features(&self) -> &[FeatureSet] {
        &self.test_features
    }

    /// Executa `config.iterations()` passadas a partir de pesos recém contados.
    pub fn train(&mut self) -> Result<TrainingOutcome> {
        let weights = WeightTable::initialize(&self.train_tags, &self.train_features);
        self.checkpoint.save(&weights)?;
        self.state = TrainerState::Initialized;

        let mut predictions = predict_all(&weights, &self.test_features);
        let mut errors_per_iteration = vec![self.publish(&weights, &predictions)?];
        tracing::info!(passada = 1, erros = errors_per_iteration[0], "predição inicial");

        let mut weights = weights;
        for iteration in 2..=self.config.iterations {
            weights = self.checkpoint.load()?;
            let penalized = self.penalize_errors(&mut weights, &predictions);
            self.checkpoint.save(&weights)?;

            predictions = predict_all(&weights, &self.test_features);
            let errors = self.publish(&weights, &predictions)?;
            errors_per_iteration.push(errors);
            tracing::info!(passada = iteration, penalizados = penalized, erros = errors, "pesos ajustados");
        }

        self.state = TrainerState::Exhausted;
        let predictions = tag_names(&weights, &predictions)
            .into_iter()
            .map(|t| t.map(str::to_string))
            .collect();
        Ok(TrainingOutcome {
            predictions,
            weights,
            errors_per_iteration,
        })
    }

    /// Penaliza a tag predita em cada token de teste errado.
    ///
    /// Predições não atribuídas não têm linha na tabela: nada a penalizar.
    fn penalize_errors(&self, weights: &mut WeightTable, predictions: &[Option<usize>]) -> usize {
        let step = self.config.step;
        let mut changed = 0;
        for (i, predicted) in predictions.iter().enumerate() {
            let gold = self.test.tags[i].as_str();
            let Some(predicted) = predicted.and_then(|id| weights.tag_name(id)) else {
                continue;
            };
            if predicted != gold {
                let predicted = predicted.to_string();
                changed += weights.penalize(&predicted, &self.test_features[i], step);
            }
        }
        changed
    }

    /// Envia as predições ao sink e devolve quantas estão erradas.
    fn publish(&mut self, weights: &WeightTable, predictions: &[Option<usize>]) -> Result<usize> {
        let names = tag_names(weights, predictions);
        self.sink.write(&self.test.tokens, &names)?;
        let errors = names
            .iter()
            .zip(&self.test.tags)
            .filter(|(p, gold)| **p != Some(gold.as_str()))
            .count();
        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpoint;
    use crate::corpus::MemorySink;

    fn trainer(
        train: &TaggedCorpus,
        test: TaggedCorpus,
        flags: &str,
        iterations: usize,
    ) -> Trainer<MemoryCheckpoint, MemorySink> {
        let mut config = TrainConfig::default();
        config.set_iterations(iterations).unwrap();
        Trainer::new(
            train,
            test,
            flags.parse().unwrap(),
            config,
            MemoryCheckpoint::new(),
            MemorySink::default(),
        )
    }

    #[test]
    fn test_single_iteration_predicts_most_frequent_tag() {
        let train = TaggedCorpus::from_pairs([("the", "DT"), ("dog", "NN"), ("the", "DT")]);
        let test = TaggedCorpus::from_pairs([("dog", "NN"), ("the", "DT"), ("cat", "NN")]);

        let mut t = trainer(&train, test, "1", 1);
        assert_eq!(t.state(), TrainerState::Uninitialized);
        let outcome = t.train().unwrap();

        assert_eq!(t.state(), TrainerState::Exhausted);
        assert_eq!(
            outcome.predictions,
            vec![Some("NN".to_string()), Some("DT".to_string()), None]
        );
        assert_eq!(outcome.errors_per_iteration, vec![1]);
        assert_eq!(t.checkpoint().saves(), 1);
        assert_eq!(t.sink().batches.len(), 1);
    }

    #[test]
    fn test_repeated_error_is_penalized_each_pass() {
        let mut pairs = vec![("dog", "NN"); 150];
        pairs.push(("dog", "VB"));
        let train = TaggedCorpus::from_pairs(pairs);
        let test = TaggedCorpus::from_pairs([("dog", "VB")]);

        let mut t = trainer(&train, test, "1", 3);
        let outcome = t.train().unwrap();

        // Errou nas passadas 1 e 2 (NN: 150, depois 50), acertou na 3 (NN: -50)
        assert_eq!(outcome.errors_per_iteration, vec![1, 1, 0]);
        assert_eq!(outcome.weights.get("NN", "w=dog"), Some(150.0 - 2.0 * 100.0));
        // A tag correta nunca é recompensada
        assert_eq!(outcome.weights.get("VB", "w=dog"), Some(1.0));
        assert_eq!(outcome.predictions, vec![Some("VB".to_string())]);
        assert_eq!(t.checkpoint().load().unwrap(), outcome.weights);
        assert_eq!(t.checkpoint().saves(), 3);
    }

    #[test]
    fn test_unassigned_prediction_is_not_penalized() {
        let train = TaggedCorpus::from_pairs([("the", "DT")]);
        let test = TaggedCorpus::from_pairs([("cat", "NN")]);

        let outcome = trainer(&train, test, "1", 2).train().unwrap();
        assert_eq!(outcome.predictions, vec![None]);
        assert_eq!(outcome.errors_per_iteration, vec![1, 1]);
        assert_eq!(outcome.weights.get("DT", "w=the"), Some(1.0));
    }

    #[test]
    fn test_training_is_deterministic() {
        let train = TaggedCorpus::from_pairs([
            ("The", "DT"), ("dog", "NN"), ("runs", "VBZ"), (".", "."),
            ("A", "DT"), ("cat", "NN"), ("running", "VBG"), ("fast", "RB"), (".", "."),
        ]);
        let test = TaggedCorpus::from_pairs([
            ("The", "DT"), ("cat", "NN"), ("runs", "VBZ"), ("fast", "RB"), (".", "."),
        ]);

        let first = trainer(&train, test.clone(), "12347", 4).train().unwrap();
        let second = trainer(&train, test, "12347", 4).train().unwrap();
        assert_eq!(first.predictions, second.predictions);
        assert_eq!(first.weights, second.weights);
        assert_eq!(first.errors_per_iteration, second.errors_per_iteration);
    }

    #[test]
    fn test_config_validation() {
        let mut config = TrainConfig::default();
        assert_eq!(config.iterations(), 1);
        assert_eq!(config.step(), DEFAULT_STEP);
        assert!(config.set_iterations(0).is_err());
        assert!(config.set_step(0.0).is_err());
        assert!(config.set_step(f64::NAN).is_err());
        config.set_step(0.5).unwrap();
        assert_eq!(config.step(), 0.5);
    }
}
