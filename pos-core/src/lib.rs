//! # pos-core — Etiquetador Morfossintático (POS) com Perceptron
//!
//! Este crate treina um classificador linear baseado em features para atribuir
//! classes gramaticais (part-of-speech) a palavras, e pontua a saída contra um
//! corpus gold.
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Entrada** ([`corpus`]): pares `palavra tag` lidos de arquivos de duas colunas.
//! 2.  **Extração de Features** ([`features`]): cada palavra vira um conjunto de
//!     features `nome=valor` (ex: `w=dog`, `suf=ing`), ligadas por flags `1`..`8`.
//! 3.  **Modelo** ([`weights`]): tabela esparsa `tag → feature → peso`, iniciada
//!     por contagem de coocorrências.
//! 4.  **Predição** ([`perceptron`]): argmax da soma dos pesos, token a token.
//! 5.  **Treino** ([`trainer`]): correções orientadas a erro, com checkpoint
//!     ([`checkpoint`]) entre as passadas.
//! 6.  **Avaliação** ([`evaluation`]): matriz de confusão e médias micro/macro.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use pos_core::checkpoint::MemoryCheckpoint;
//! use pos_core::corpus::{MemorySink, TaggedCorpus};
//! use pos_core::evaluation::{align_predictions, Confusion, ScoreReport};
//! use pos_core::trainer::{TrainConfig, Trainer};
//!
//! let train = TaggedCorpus::from_pairs([("the", "DT"), ("dog", "NN"), ("barks", "VBZ")]);
//! let test = TaggedCorpus::from_pairs([("the", "DT"), ("dog", "NN")]);
//!
//! // Flags "1" e "3": a própria palavra e a palavra anterior
//! let mut trainer = Trainer::new(
//!     &train,
//!     test.clone(),
//!     "13".parse()?,
//!     TrainConfig::default(),
//!     MemoryCheckpoint::new(),
//!     MemorySink::default(),
//! );
//! let outcome = trainer.train()?;
//!
//! let alignment = align_predictions(&test, &outcome.predictions)?;
//! let report = ScoreReport::from_confusion(&Confusion::build(&alignment));
//! assert_eq!(report.micro_f1, Some(1.0));
//! # Ok::<(), pos_core::PosError>(())
//! ```
//!
//! ## Módulos Principais
//!
//! - [`trainer`]: laço de treino e máquina de estados.
//! - [`evaluation`]: alinhamento gold × predito e métricas.
//! - [`sweep`]: varredura de todas as combinações de features.

pub mod checkpoint;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod perceptron;
pub mod sweep;
pub mod trainer;
pub mod vocab;
pub mod weights;

pub use corpus::{TaggedCorpus, Token};
pub use error::{PosError, Result};
pub use evaluation::{Confusion, ScoreReport};
pub use features::{FeatureFlags, FeatureSet};
pub use trainer::{TrainConfig, Trainer, TrainingOutcome};
pub use weights::WeightTable;
