//! # Corpus Anotado em Duas Colunas
//!
//! Leitura de arquivos `palavra tag` (uma palavra por linha, colunas separadas
//! por espaço em branco, linhas vazias ignoradas) e escrita das predições no
//! formato `palavra \t tag` consumido pela avaliação.
//!
//! ## Exemplo de arquivo
//!
//! ```text
//! The     DT
//! dog     NN
//! barks   VBZ
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PosError, Result};

/// Uma palavra do corpus e sua posição (0, 1, 2...) na sequência lida.
///
/// Imutável depois de lida: features e predições referenciam o token pelo índice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// A palavra exatamente como aparece no arquivo.
    pub word: String,
    /// Índice sequencial do token no corpus.
    pub index: usize,
}

/// Corpus com tags gold, alinhado por índice (`tokens[i]` ↔ `tags[i]`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaggedCorpus {
    pub tokens: Vec<Token>,
    pub tags: Vec<String>,
}

impl TaggedCorpus {
    /// Monta um corpus a partir de pares `(palavra, tag)`.
    pub fn from_pairs<W, T>(pairs: impl IntoIterator<Item = (W, T)>) -> Self
    where
        W: Into<String>,
        T: Into<String>,
    {
        let mut corpus = Self::default();
        for (word, tag) in pairs {
            corpus.push(word.into(), tag.into());
        }
        corpus
    }

    /// Lê um arquivo gold de duas colunas.
    ///
    /// Colunas além da segunda são ignoradas. Uma linha não vazia sem coluna
    /// de tag é [`PosError::MalformedLine`]: para dados gold a tag é obrigatória.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::parse(BufReader::new(file), path)
    }

    /// Igual a [`TaggedCorpus::read`], mas sobre qualquer leitor. `origin` só
    /// aparece nas mensagens de erro.
    pub fn parse(reader: impl BufRead, origin: &Path) -> Result<Self> {
        let mut corpus = Self::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let mut columns = line.split_whitespace();
            let Some(word) = columns.next() else {
                continue;
            };
            let Some(tag) = columns.next() else {
                return Err(PosError::MalformedLine {
                    path: origin.to_path_buf(),
                    line: i + 1,
                    content: line.clone(),
                });
            };
            corpus.push(word.to_string(), tag.to_string());
        }
        Ok(corpus)
    }

    fn push(&mut self, word: String, tag: String) {
        let index = self.tokens.len();
        self.tokens.push(Token { word, index });
        self.tags.push(tag);
    }

    /// As palavras, na ordem do arquivo.
    pub fn words(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.word.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Destino das predições de cada passada de treino.
///
/// `tags[i]` é a predição para `tokens[i]`; `None` é a tag "não atribuída".
pub trait PredictionSink {
    fn write(&mut self, tokens: &[Token], tags: &[Option<&str>]) -> Result<()>;
}

/// Escreve `palavra \t tag` por linha, sobrescrevendo o arquivo a cada chamada.
///
/// A tag não atribuída vira uma coluna vazia; relida pela avaliação, essa linha
/// não tem duas colunas e recebe a tag substituta `"X"`.
#[derive(Debug, Clone)]
pub struct TsvSink {
    path: PathBuf,
}

impl TsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PredictionSink for TsvSink {
    fn write(&mut self, tokens: &[Token], tags: &[Option<&str>]) -> Result<()> {
        let mut out = BufWriter::new(File::create(&self.path)?);
        for (token, tag) in tokens.iter().zip(tags) {
            writeln!(out, "{}\t{}", token.word, tag.unwrap_or(""))?;
        }
        out.flush()?;
        tracing::debug!(path = %self.path.display(), linhas = tokens.len(), "predições gravadas");
        Ok(())
    }
}

/// Guarda em memória todos os lotes de predições recebidos (um por passada).
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub batches: Vec<Vec<(String, Option<String>)>>,
}

impl MemorySink {
    /// O último lote gravado, se houver.
    pub fn last(&self) -> Option<&[(String, Option<String>)]> {
        self.batches.last().map(Vec::as_slice)
    }
}

impl PredictionSink for MemorySink {
    fn write(&mut self, tokens: &[Token], tags: &[Option<&str>]) -> Result<()> {
        let batch = tokens
            .iter()
            .zip(tags)
            .map(|(token, tag)| (token.word.clone(), tag.map(str::to_string)))
            .collect();
        self.batches.push(batch);
        Ok(())
    }
}
