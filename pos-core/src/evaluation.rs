//! # Avaliação por Matriz de Confusão
//!
//! Alinha as tags gold com as preditas token a token, conta verdadeiros
//! positivos, falsos positivos e falsos negativos por tag e calcula
//! precisão, cobertura e F1 em média **micro** e **macro**.
//!
//! ## Médias
//!
//! - **Micro**: soma as contagens de todas as tags antes de dividir.
//!   $$ P = \frac{\sum tp}{\sum tp + \sum fp} \quad R = \frac{\sum tp}{\sum tp + \sum fn} $$
//! - **Macro**: calcula P/R por tag e tira a média.
//!
//! Na macro, o termo de precisão de uma tag entra na soma sempre que
//! `tp + fp > 0`; o de cobertura só entra quando também `tp + fn > 0` (a tag é
//! abandonada no primeiro denominador zero). O divisor é sempre o número total
//! de tags, inclusive as abandonadas.
//!
//! Denominador zero nunca vira `0.0` em silêncio: a métrica fica `None`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::corpus::TaggedCorpus;
use crate::error::{PosError, Result};

/// Tag atribuída a linhas preditas malformadas e a predições não atribuídas.
pub const PLACEHOLDER_TAG: &str = "X";

/// Uma palavra com sua tag gold e a tag predita.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedToken {
    pub word: String,
    pub gold: String,
    pub predicted: String,
}

/// Sequência alinhada gold × predito.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    pub tokens: Vec<AlignedToken>,
}

impl Alignment {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens em que gold e predito discordam.
    pub fn disagreements(&self) -> usize {
        self.tokens.iter().filter(|t| t.gold != t.predicted).count()
    }

    /// Fração de tokens corretos; `None` para alinhamento vazio.
    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.len() - self.disagreements(), self.len())
    }
}

/// Lê as tags de um arquivo predito (`palavra \t tag`).
///
/// Linhas vazias são ignoradas. Qualquer linha que não tenha exatamente duas
/// colunas recebe [`PLACEHOLDER_TAG`] e o processamento continua.
pub fn parse_predicted(reader: impl BufRead) -> Result<Vec<String>> {
    let mut tags = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let columns: Vec<&str> = line.split_whitespace().collect();
        match columns.as_slice() {
            [] => continue,
            [_, tag] => tags.push(tag.to_string()),
            _ => {
                tracing::warn!(linha = i + 1, conteudo = %line, "linha predita malformada, usando \"X\"");
                tags.push(PLACEHOLDER_TAG.to_string());
            }
        }
    }
    Ok(tags)
}

/// Alinha um arquivo gold com um arquivo predito.
///
/// Quantidades diferentes de tokens resultam em [`PosError::LengthMismatch`]
/// e nenhum alinhamento.
pub fn align(gold_path: impl AsRef<Path>, pred_path: impl AsRef<Path>) -> Result<Alignment> {
    let gold = TaggedCorpus::read(gold_path)?;
    let predicted = parse_predicted(BufReader::new(File::open(pred_path)?))?;
    align_tags(&gold, predicted)
}

/// Alinha um corpus gold com predições em memória (`None` vira `"X"`).
pub fn align_predictions(gold: &TaggedCorpus, predictions: &[Option<String>]) -> Result<Alignment> {
    let predicted = predictions
        .iter()
        .map(|p| match p {
            Some(tag) if !tag.is_empty() => tag.clone(),
            _ => PLACEHOLDER_TAG.to_string(),
        })
        .collect();
    align_tags(gold, predicted)
}

fn align_tags(gold: &TaggedCorpus, predicted: Vec<String>) -> Result<Alignment> {
    if gold.len() != predicted.len() {
        tracing::warn!(gold = gold.len(), predito = predicted.len(), "documentos de tamanhos diferentes");
        return Err(PosError::LengthMismatch {
            gold: gold.len(),
            predicted: predicted.len(),
        });
    }
    let tokens = gold
        .tokens
        .iter()
        .zip(&gold.tags)
        .zip(predicted)
        .map(|((token, gold), predicted)| AlignedToken {
            word: token.word.clone(),
            gold: gold.clone(),
            predicted,
        })
        .collect();
    Ok(Alignment { tokens })
}

/// Contagens de uma tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    #[serde(rename = "tp")]
    pub true_pos: usize,
    #[serde(rename = "fp")]
    pub false_pos: usize,
    #[serde(rename = "fn")]
    pub false_neg: usize,
}

impl ConfusionCounts {
    pub fn precision(&self) -> Option<f64> {
        ratio(self.true_pos, self.true_pos + self.false_pos)
    }

    pub fn recall(&self) -> Option<f64> {
        ratio(self.true_pos, self.true_pos + self.false_neg)
    }

    pub fn f1(&self) -> Option<f64> {
        f1(self.precision(), self.recall())
    }
}

/// Contagens por tag, em ordem alfabética de tag.
///
/// Invariantes: `Σ(tp + fn)` = tokens gold e `Σ(tp + fp)` = tokens preditos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confusion {
    pub tags: BTreeMap<String, ConfusionCounts>,
}

impl Confusion {
    /// Acerto soma `tp` na tag; erro soma `fn` na gold e `fp` na predita.
    pub fn build(alignment: &Alignment) -> Self {
        let mut tags: BTreeMap<String, ConfusionCounts> = BTreeMap::new();
        for t in &alignment.tokens {
            tags.entry(t.gold.clone()).or_default();
            tags.entry(t.predicted.clone()).or_default();
            if t.gold == t.predicted {
                if let Some(c) = tags.get_mut(&t.gold) {
                    c.true_pos += 1;
                }
            } else {
                if let Some(c) = tags.get_mut(&t.gold) {
                    c.false_neg += 1;
                }
                if let Some(c) = tags.get_mut(&t.predicted) {
                    c.false_pos += 1;
                }
            }
        }
        Self { tags }
    }

    pub fn get(&self, tag: &str) -> Option<&ConfusionCounts> {
        self.tags.get(tag)
    }

    pub fn num_tags(&self) -> usize {
        self.tags.len()
    }

    /// Soma das contagens de todas as tags.
    pub fn totals(&self) -> ConfusionCounts {
        self.tags.values().fold(ConfusionCounts::default(), |acc, c| ConfusionCounts {
            true_pos: acc.true_pos + c.true_pos,
            false_pos: acc.false_pos + c.false_pos,
            false_neg: acc.false_neg + c.false_neg,
        })
    }
}

impl fmt::Display for Confusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Desempenho por tag (tp, fp, fn) (precisão, cobertura, F1):")?;
        for (tag, c) in &self.tags {
            writeln!(
                f,
                "\t{}: ({}, {}, {}) ({}, {}, {})",
                tag,
                c.true_pos,
                c.false_pos,
                c.false_neg,
                Cell(c.precision()),
                Cell(c.recall()),
                Cell(c.f1()),
            )?;
        }
        Ok(())
    }
}

struct Cell(Option<f64>);

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.4}"),
            None => f.write_str("******"),
        }
    }
}

/// Precisão, cobertura e F1 de uma média. `None` = indefinida.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
}

impl Averages {
    /// Os três valores, ou [`PosError::UndefinedMetric`] nomeando o primeiro indefinido.
    pub fn require(&self) -> Result<(f64, f64, f64)> {
        let precision = self.precision.ok_or(PosError::UndefinedMetric("precisão"))?;
        let recall = self.recall.ok_or(PosError::UndefinedMetric("cobertura"))?;
        let f1 = self.f1.ok_or(PosError::UndefinedMetric("F1"))?;
        Ok((precision, recall, f1))
    }
}

pub fn micro_average(confusion: &Confusion) -> Averages {
    let totals = confusion.totals();
    let averages = Averages {
        precision: totals.precision(),
        recall: totals.recall(),
        f1: totals.f1(),
    };
    if averages.f1.is_none() {
        tracing::warn!(?totals, "média micro indefinida");
    }
    averages
}

pub fn macro_average(confusion: &Confusion) -> Averages {
    let n = confusion.num_tags();
    if n == 0 {
        tracing::warn!("média macro indefinida: nenhuma tag");
        return Averages::default();
    }

    let mut sum_precision = 0.0;
    let mut sum_recall = 0.0;
    for c in confusion.tags.values() {
        let Some(p) = c.precision() else {
            continue;
        };
        sum_precision += p;
        let Some(r) = c.recall() else {
            continue;
        };
        sum_recall += r;
    }

    let precision = sum_precision / n as f64;
    let recall = sum_recall / n as f64;
    Averages {
        precision: Some(precision),
        recall: Some(recall),
        f1: f1(Some(precision), Some(recall)),
    }
}

/// As seis métricas da avaliação.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub micro_precision: Option<f64>,
    pub micro_recall: Option<f64>,
    pub micro_f1: Option<f64>,
    pub macro_precision: Option<f64>,
    pub macro_recall: Option<f64>,
    pub macro_f1: Option<f64>,
}

impl ScoreReport {
    pub fn from_confusion(confusion: &Confusion) -> Self {
        let micro = micro_average(confusion);
        let macro_ = macro_average(confusion);
        Self {
            micro_precision: micro.precision,
            micro_recall: micro.recall,
            micro_f1: micro.f1,
            macro_precision: macro_.precision,
            macro_recall: macro_.recall,
            macro_f1: macro_.f1,
        }
    }

    pub fn micro(&self) -> Averages {
        Averages {
            precision: self.micro_precision,
            recall: self.micro_recall,
            f1: self.micro_f1,
        }
    }

    pub fn macro_(&self) -> Averages {
        Averages {
            precision: self.macro_precision,
            recall: self.macro_recall,
            f1: self.macro_f1,
        }
    }
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Micro Precision", self.micro_precision),
            ("Micro Recall", self.micro_recall),
            ("Micro F-Score", self.micro_f1),
            ("Macro Precision", self.macro_precision),
            ("Macro Recall", self.macro_recall),
            ("Macro F-Score", self.macro_f1),
        ];
        for (name, value) in rows {
            match value {
                Some(v) => writeln!(f, "{name}: {v:.3}")?,
                None => writeln!(f, "{name}: undefined")?,
            }
        }
        Ok(())
    }
}

/// Alinha, conta e pontua um par de arquivos gold/predito.
pub fn evaluate(gold_path: impl AsRef<Path>, pred_path: impl AsRef<Path>) -> Result<ScoreReport> {
    let alignment = align(gold_path, pred_path)?;
    Ok(ScoreReport::from_confusion(&Confusion::build(&alignment)))
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

fn f1(precision: Option<f64>, recall: Option<f64>) -> Option<f64> {
    let (p, r) = (precision?, recall?);
    (p + r > 0.0).then(|| 2.0 * p * r / (p + r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn aligned(gold: &[&str], predicted: &[&str]) -> Alignment {
        let corpus = TaggedCorpus::from_pairs(gold.iter().map(|t| ("w", *t)));
        let predicted = predicted.iter().map(|t| Some(t.to_string())).collect::<Vec<_>>();
        align_predictions(&corpus, &predicted).unwrap()
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("métrica indefinida");
        assert!((actual - expected).abs() < 1e-12, "{actual} != {expected}");
    }

    #[test]
    fn test_confusion_counts() {
        let confusion = Confusion::build(&aligned(&["A", "A", "B"], &["A", "B", "B"]));

        let a = confusion.get("A").unwrap();
        assert_eq!((a.true_pos, a.false_pos, a.false_neg), (1, 0, 1));
        let b = confusion.get("B").unwrap();
        assert_eq!((b.true_pos, b.false_pos, b.false_neg), (1, 1, 0));
    }

    #[test]
    fn test_confusion_totals_match_token_counts() {
        let alignment = aligned(&["A", "B", "C", "A"], &["B", "B", "X", "A"]);
        let totals = Confusion::build(&alignment).totals();
        assert_eq!(totals.true_pos + totals.false_neg, alignment.len());
        assert_eq!(totals.true_pos + totals.false_pos, alignment.len());
    }

    #[test]
    fn test_micro_average() {
        let confusion = Confusion::build(&aligned(&["A", "A", "B"], &["A", "B", "B"]));
        let micro = micro_average(&confusion);
        assert_close(micro.precision, 2.0 / 3.0);
        assert_close(micro.recall, 2.0 / 3.0);
        assert_close(micro.f1, 2.0 / 3.0);
    }

    #[test]
    fn test_micro_average_undefined_is_signaled() {
        let empty = micro_average(&Confusion::default());
        assert_eq!(empty, Averages::default());
        assert!(matches!(empty.require(), Err(PosError::UndefinedMetric("precisão"))));

        // Tudo errado: P = R = 0, F1 indefinido
        let wrong = micro_average(&Confusion::build(&aligned(&["A"], &["B"])));
        assert_eq!(wrong.precision, Some(0.0));
        assert_eq!(wrong.f1, None);
        assert!(matches!(wrong.require(), Err(PosError::UndefinedMetric("F1"))));
    }

    #[test]
    fn test_macro_average() {
        let confusion = Confusion::build(&aligned(&["A", "A", "B"], &["A", "B", "B"]));
        let macro_ = macro_average(&confusion);
        assert_close(macro_.precision, 0.75);
        assert_close(macro_.recall, 0.75);
        assert_close(macro_.f1, 0.75);
    }

    #[test]
    fn test_macro_average_divides_by_all_tags() {
        // A: tp=1 fn=1        -> P=1, R=0.5
        // B: fn=1             -> P indefinida, tag abandonada
        // C: fp=2             -> P=0 entra, R indefinida
        let confusion = Confusion::build(&aligned(&["A", "A", "B"], &["A", "C", "C"]));
        assert_eq!(confusion.num_tags(), 3);

        let macro_ = macro_average(&confusion);
        assert_close(macro_.precision, 1.0 / 3.0);
        assert_close(macro_.recall, 0.5 / 3.0);
        assert_close(macro_.f1, 2.0 / 9.0);
    }

    #[test]
    fn test_parse_predicted_uses_placeholder() {
        let text = "The\tDT\n\ndog\t\nbarks VBZ extra\nruns\tVBZ\n";
        let tags = parse_predicted(Cursor::new(text)).unwrap();
        assert_eq!(tags, vec!["DT", "X", "X", "VBZ"]);
    }

    #[test]
    fn test_length_mismatch() {
        let gold = TaggedCorpus::from_pairs([("a", "DT"), ("dog", "NN")]);
        let err = align_predictions(&gold, &[Some("DT".to_string())]).unwrap_err();
        assert!(matches!(err, PosError::LengthMismatch { gold: 2, predicted: 1 }));
    }

    #[test]
    fn test_unassigned_prediction_becomes_placeholder() {
        let gold = TaggedCorpus::from_pairs([("a", "DT"), ("dog", "NN")]);
        let alignment = align_predictions(&gold, &[Some("DT".to_string()), None]).unwrap();
        assert_eq!(alignment.tokens[1].predicted, PLACEHOLDER_TAG);
        assert_eq!(alignment.disagreements(), 1);
        assert_eq!(alignment.accuracy(), Some(0.5));
    }

    #[test]
    fn test_report_display() {
        let confusion = Confusion::build(&aligned(&["A", "A", "B"], &["A", "B", "B"]));
        let report = ScoreReport::from_confusion(&confusion);
        let text = report.to_string();
        assert!(text.contains("Micro Precision: 0.667"));
        assert!(text.contains("Macro F-Score: 0.750"));

        let empty = ScoreReport::from_confusion(&Confusion::default()).to_string();
        assert!(empty.contains("Micro F-Score: undefined"));
    }

    #[test]
    fn test_per_tag_display_marks_undefined() {
        let confusion = Confusion::build(&aligned(&["A"], &["B"]));
        let text = confusion.to_string();
        assert!(text.contains("A: (0, 0, 1) (******, 0.0000, ******)"));
        assert!(text.contains("B: (0, 1, 0) (0.0000, ******, ******)"));
    }
}
