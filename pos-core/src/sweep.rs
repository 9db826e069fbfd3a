//! # Varredura de Combinações de Features
//!
//! Enumera todos os subconjuntos não vazios dos 8 tipos de feature
//! (2⁸ − 1 = 255), em ordem de tamanho e, dentro do mesmo tamanho, em ordem
//! lexicográfica: `1`, `2`, ..., `8`, `12`, `13`, ..., `12345678`.
//!
//! Duas formas de uso:
//! - [`write_script`]: gera um script bash que chama `postag train` e
//!   `postag evaluate` para cada combinação, acumulando os relatórios num arquivo.
//! - [`run_sweep`]: treina e avalia cada combinação no próprio processo.

use std::io::Write;

use serde::{Serialize, Serializer};

use crate::checkpoint::MemoryCheckpoint;
use crate::corpus::{MemorySink, TaggedCorpus};
use crate::error::Result;
use crate::evaluation::{align_predictions, Confusion, ScoreReport};
use crate::features::{FeatureFlags, FEATURE_KINDS};
use crate::trainer::{TrainConfig, Trainer};

/// Todas as combinações não vazias de flags, na ordem da varredura.
pub fn flag_combinations() -> Vec<FeatureFlags> {
    let digits: Vec<u8> = (1..=FEATURE_KINDS).collect();
    let mut out = Vec::new();
    for size in 1..=digits.len() {
        combine(&digits, size, FeatureFlags::empty(), &mut out);
    }
    out
}

fn combine(digits: &[u8], size: usize, acc: FeatureFlags, out: &mut Vec<FeatureFlags>) {
    if size == 0 {
        out.push(acc);
        return;
    }
    for (i, &d) in digits.iter().enumerate() {
        if digits.len() - i < size {
            break;
        }
        if let Some(flag) = FeatureFlags::from_digit(d) {
            combine(&digits[i + 1..], size - 1, acc | flag, out);
        }
    }
}

/// Caminhos usados pelo script gerado.
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Executável do etiquetador.
    pub program: String,
    pub train: String,
    pub test: String,
    pub predictions: String,
    /// Arquivo que acumula os relatórios.
    pub output: String,
    pub iterations: usize,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            program: "postag".to_string(),
            train: "train.col".to_string(),
            test: "dev.col".to_string(),
            predictions: "prediction.txt".to_string(),
            output: "output.txt".to_string(),
            iterations: 1,
        }
    }
}

/// Escreve o script bash da varredura em `out`.
pub fn write_script(mut out: impl Write, opts: &ScriptOptions) -> Result<()> {
    let program = shell_quote(&opts.program);
    let train = shell_quote(&opts.train);
    let test = shell_quote(&opts.test);
    let predictions = shell_quote(&opts.predictions);
    let output = shell_quote(&opts.output);

    writeln!(out, "#!/bin/bash")?;
    writeln!(out)?;
    for flags in flag_combinations() {
        writeln!(out, "echo \"flags: {flags}\" >> {output}")?;
        writeln!(
            out,
            "{program} train {train} {test} {flags} --iterations {} --predictions {predictions}",
            opts.iterations
        )?;
        writeln!(out, "{program} evaluate {test} {predictions} >> {output}")?;
    }
    Ok(())
}

fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | '+' | '='));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Resultado de uma combinação.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    #[serde(serialize_with = "serialize_flags")]
    pub flags: FeatureFlags,
    pub report: ScoreReport,
    /// Tokens de teste errados na última passada.
    pub errors: usize,
}

fn serialize_flags<S: Serializer>(flags: &FeatureFlags, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(flags)
}

/// Treina e avalia cada combinação em memória, chamando `on_result` a cada uma.
pub fn run_sweep(
    train: &TaggedCorpus,
    test: &TaggedCorpus,
    config: &TrainConfig,
    combinations: &[FeatureFlags],
    mut on_result: impl FnMut(&SweepResult),
) -> Result<Vec<SweepResult>> {
    let mut results = Vec::with_capacity(combinations.len());
    for &flags in combinations {
        let mut trainer = Trainer::new(
            train,
            test.clone(),
            flags,
            config.clone(),
            MemoryCheckpoint::new(),
            MemorySink::default(),
        );
        let outcome = trainer.train()?;
        let alignment = align_predictions(test, &outcome.predictions)?;
        let result = SweepResult {
            flags,
            report: ScoreReport::from_confusion(&Confusion::build(&alignment)),
            errors: outcome.final_errors(),
        };
        tracing::info!(%flags, erros = result.errors, "combinação avaliada");
        on_result(&result);
        results.push(result);
    }
    Ok(results)
}
