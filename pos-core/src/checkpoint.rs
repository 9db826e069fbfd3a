//! # Checkpoint de Pesos
//!
//! Fronteira explícita de salvar/restaurar entre as passadas de treino: o
//! treinador grava a tabela depois de cada mutação e relê o snapshot no início
//! da passada seguinte. Uma queda no meio de uma passada perde apenas as
//! atualizações daquela passada.
//!
//! O formato é JSON (`serde_json`), com ida e volta exata dos pesos.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{PosError, Result};
use crate::weights::WeightTable;

/// Armazenamento durável de um snapshot da [`WeightTable`].
pub trait CheckpointStore {
    fn save(&mut self, weights: &WeightTable) -> Result<()>;
    fn load(&self) -> Result<WeightTable>;
}

/// Checkpoint em arquivo JSON, sobrescrito a cada `save`.
#[derive(Debug, Clone)]
pub struct JsonCheckpoint {
    path: PathBuf,
}

impl JsonCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for JsonCheckpoint {
    fn save(&mut self, weights: &WeightTable) -> Result<()> {
        let mut out = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(&mut out, weights)?;
        out.flush()?;
        tracing::debug!(path = %self.path.display(), "checkpoint salvo");
        Ok(())
    }

    fn load(&self) -> Result<WeightTable> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PosError::MissingCheckpoint)
            }
            Err(e) => return Err(e.into()),
        };
        let weights = serde_json::from_reader(BufReader::new(file))?;
        tracing::debug!(path = %self.path.display(), "checkpoint carregado");
        Ok(weights)
    }
}

/// Checkpoint em memória. Passa pela mesma serialização JSON do arquivo.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpoint {
    snapshot: Option<String>,
    saves: usize,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantas vezes `save` foi chamado.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl CheckpointStore for MemoryCheckpoint {
    fn save(&mut self, weights: &WeightTable) -> Result<()> {
        self.snapshot = Some(serde_json::to_string(weights)?);
        self.saves += 1;
        Ok(())
    }

    fn load(&self) -> Result<WeightTable> {
        let json = self.snapshot.as_deref().ok_or(PosError::MissingCheckpoint)?;
        Ok(serde_json::from_str(json)?)
    }
}
