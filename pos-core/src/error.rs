//! # Erros do Etiquetador
//!
//! Nenhuma operação do núcleo derruba o processo: toda anomalia vira um
//! resultado parcial ou um sinal explícito para quem chamou.
//!
//! | Situação                  | Tratamento                                             |
//! |---------------------------|--------------------------------------------------------|
//! | Tamanhos diferentes       | [`PosError::LengthMismatch`], avaliação é pulada       |
//! | Linha predita malformada  | recuperada localmente com a tag `"X"`                  |
//! | Métrica indefinida        | `None` em [`crate::evaluation::Averages`]              |
//! | Peso inexistente          | contribuição zero / no-op, nunca erro                  |

use std::path::PathBuf;

use thiserror::Error;

/// Erros que o núcleo pode sinalizar.
#[derive(Debug, Error)]
pub enum PosError {
    #[error("erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    /// O checkpoint de pesos não pôde ser (des)serializado.
    #[error("checkpoint de pesos inválido: {0}")]
    Checkpoint(#[from] serde_json::Error),

    /// Tentativa de recarregar pesos antes de qualquer `save`.
    #[error("nenhum checkpoint de pesos foi salvo ainda")]
    MissingCheckpoint,

    /// Os arquivos gold e predito têm quantidades diferentes de tokens.
    #[error("os documentos têm tamanhos diferentes (gold: {gold}, predito: {predicted})")]
    LengthMismatch { gold: usize, predicted: usize },

    /// Linha de um corpus gold sem a coluna de tag.
    #[error("{}:{line}: linha malformada {content:?}", .path.display())]
    MalformedLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// Um denominador de precisão/cobertura/F1 é zero.
    #[error("métrica indefinida: {0}")]
    UndefinedMetric(&'static str),

    #[error("flag de feature inválida {0:?} (esperado um dígito de 1 a 8)")]
    InvalidFlag(char),

    #[error("nenhuma flag de feature informada")]
    EmptyFlags,

    #[error("parâmetro inválido: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, PosError>;
