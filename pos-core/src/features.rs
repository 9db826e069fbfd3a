//! # Engenharia de Features para POS
//!
//! Para cada palavra, extrai um conjunto de features textuais `nome=valor`
//! que o perceptron soma para pontuar cada tag. As features olham apenas
//! para a sequência de palavras, nunca para tags.
//!
//! ## Tipos de Feature (ligados individualmente por flag)
//!
//! | Flag | Feature       | Quando dispara                                          |
//! |------|---------------|---------------------------------------------------------|
//! | 1    | `w=<palavra>` | sempre                                                  |
//! | 2    | `w+1=<p>`     | existe palavra seguinte                                 |
//! | 3    | `w-1=<p>`     | existe palavra anterior                                 |
//! | 4    | `w=CAP`       | inicial maiúscula e a anterior não é `.`, `!` ou `?`    |
//! | 5    | `w-2=<p>`     | existem duas palavras antes                             |
//! | 6    | `w+2=<p>`     | existem duas palavras depois                            |
//! | 7    | `suf=<s>`     | primeiro sufixo que casar: ing, ed, ness, tion, tional  |
//! | 8    | `w=NUM`       | a palavra é um numeral de ponto flutuante               |
//!
//! A ordem das features dentro de um [`FeatureSet`] segue a ordem da tabela,
//! o que torna a extração reprodutível.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::PosError;

bitflags! {
    /// Conjunto de tipos de feature habilitados.
    ///
    /// Na linha de comando é escrito como uma string de dígitos `1`..`8`
    /// (ex: `"137"`), sem importar ordem ou repetições.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FeatureFlags: u8 {
        const WORD = 1 << 0;
        const NEXT_WORD = 1 << 1;
        const PREV_WORD = 1 << 2;
        const CAPITALIZED = 1 << 3;
        const PREV2_WORD = 1 << 4;
        const NEXT2_WORD = 1 << 5;
        const SUFFIX = 1 << 6;
        const NUMBER = 1 << 7;
    }
}

/// Quantidade de tipos de feature disponíveis.
pub const FEATURE_KINDS: u8 = 8;

impl FeatureFlags {
    /// Flag correspondente ao dígito `1`..`8`.
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1..=FEATURE_KINDS => Some(Self::from_bits_retain(1 << (digit - 1))),
            _ => None,
        }
    }

    /// Dígitos habilitados em ordem crescente.
    pub fn digits(&self) -> impl Iterator<Item = u8> + '_ {
        (1..=FEATURE_KINDS).filter(move |&d| {
            Self::from_digit(d).is_some_and(|flag| self.contains(flag))
        })
    }
}

impl FromStr for FeatureFlags {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = FeatureFlags::empty();
        for c in s.trim().chars() {
            let flag = c
                .to_digit(10)
                .and_then(|d| FeatureFlags::from_digit(d as u8))
                .ok_or(PosError::InvalidFlag(c))?;
            flags |= flag;
        }
        if flags.is_empty() {
            return Err(PosError::EmptyFlags);
        }
        Ok(flags)
    }
}

impl fmt::Display for FeatureFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in self.digits() {
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Classe de sufixo (flag 7). No máximo uma por palavra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixClass {
    Ing,
    Ed,
    Ness,
    Tion,
    Tional,
}

impl SuffixClass {
    /// Testa os sufixos na ordem de prioridade; o primeiro que casar vence.
    ///
    /// `tional` vem depois de `tion` e só é alcançado por palavras que não
    /// terminam em `tion` (ex: "national").
    pub fn classify(word: &str) -> Option<Self> {
        if word.ends_with("ing") {
            Some(SuffixClass::Ing)
        } else if word.ends_with("ed") {
            Some(SuffixClass::Ed)
        } else if word.ends_with("ness") {
            Some(SuffixClass::Ness)
        } else if word.ends_with("tion") {
            Some(SuffixClass::Tion)
        } else if word.ends_with("tional") {
            Some(SuffixClass::Tional)
        } else {
            None
        }
    }

    pub fn feature(&self) -> &'static str {
        match self {
            SuffixClass::Ing => "suf=ing",
            SuffixClass::Ed => "suf=ed",
            SuffixClass::Ness => "suf=ness",
            SuffixClass::Tion => "suf=tion",
            SuffixClass::Tional => "suf=tional",
        }
    }
}

/// Features ativas de um token, na ordem de extração.
///
/// A ordem não altera o score (a soma é comutativa), mas é estável para testes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Features no formato `nome=valor`. Ex: `["w=dog", "w-1=the"]`.
    pub features: Vec<String>,
    /// Índice do token de origem.
    pub token_index: usize,
}

impl FeatureSet {
    pub fn new(token_index: usize) -> Self {
        Self {
            features: Vec::new(),
            token_index,
        }
    }

    pub fn push(&mut self, feature: impl Into<String>) {
        self.features.push(feature.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(String::as_str)
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Gera um [`FeatureSet`] por palavra, alinhado por índice com a entrada.
pub fn extract_features<S: AsRef<str>>(words: &[S], flags: FeatureFlags) -> Vec<FeatureSet> {
    (0..words.len())
        .map(|i| extract_for_token(words, i, flags))
        .collect()
}

/// Extrai as features da palavra `i` dentro do seu contexto.
///
/// # Panics
///
/// Se `i >= words.len()`.
pub fn extract_for_token<S: AsRef<str>>(words: &[S], i: usize, flags: FeatureFlags) -> FeatureSet {
    let mut fs = FeatureSet::new(i);
    let word = words[i].as_ref();
    let n = words.len();

    if flags.contains(FeatureFlags::WORD) {
        fs.push(format!("w={word}"));
    }
    if flags.contains(FeatureFlags::NEXT_WORD) && i + 1 < n {
        fs.push(format!("w+1={}", words[i + 1].as_ref()));
    }
    if flags.contains(FeatureFlags::PREV_WORD) && i >= 1 {
        fs.push(format!("w-1={}", words[i - 1].as_ref()));
    }
    if flags.contains(FeatureFlags::CAPITALIZED) && is_capitalized_mid_sentence(words, i) {
        fs.push("w=CAP");
    }
    if flags.contains(FeatureFlags::PREV2_WORD) && i >= 2 {
        fs.push(format!("w-2={}", words[i - 2].as_ref()));
    }
    if flags.contains(FeatureFlags::NEXT2_WORD) && i + 2 < n {
        fs.push(format!("w+2={}", words[i + 2].as_ref()));
    }
    if flags.contains(FeatureFlags::SUFFIX) {
        if let Some(suffix) = SuffixClass::classify(word) {
            fs.push(suffix.feature());
        }
    }
    if flags.contains(FeatureFlags::NUMBER) && is_number(word) {
        fs.push("w=NUM");
    }

    fs
}

/// Inicial maiúscula fora de começo de frase.
///
/// Na primeira palavra não existe anterior: conta como "sem pontuação de fim
/// de frase", então a feature pode disparar.
fn is_capitalized_mid_sentence<S: AsRef<str>>(words: &[S], i: usize) -> bool {
    let first_upper = words[i]
        .as_ref()
        .chars()
        .next()
        .is_some_and(char::is_uppercase);
    let after_boundary = i > 0 && matches!(words[i - 1].as_ref(), "." | "!" | "?");
    first_upper && !after_boundary
}

/// A palavra é um numeral de ponto flutuante (`12`, `-3.5`, `1e6`, `inf`...).
pub fn is_number(word: &str) -> bool {
    word.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(s: &str) -> FeatureFlags {
        s.parse().unwrap()
    }

    #[test]
    fn test_word_feature_only() {
        let features = extract_features(&["dog"], flags("1"));
        assert_eq!(features[0].features, vec!["w=dog"]);
    }

    #[test]
    fn test_context_features_respect_bounds() {
        let words = ["the", "old", "dog", "barks"];
        let features = extract_features(&words, flags("2356"));

        // Primeira palavra: sem w-1/w-2
        assert_eq!(features[0].features, vec!["w+1=old", "w+2=dog"]);
        // Palavra do meio: janela completa, na ordem dos tipos
        assert_eq!(
            features[2].features,
            vec!["w+1=barks", "w-1=old", "w-2=the"]
        );
        // Última palavra: sem w+1/w+2
        assert_eq!(features[3].features, vec!["w-1=dog", "w-2=old"]);
    }

    #[test]
    fn test_suffix_priority() {
        let features = extract_features(&["running"], flags("7"));
        assert_eq!(features[0].features, vec!["suf=ing"]);

        assert_eq!(SuffixClass::classify("walked"), Some(SuffixClass::Ed));
        assert_eq!(SuffixClass::classify("darkness"), Some(SuffixClass::Ness));
        assert_eq!(SuffixClass::classify("nation"), Some(SuffixClass::Tion));
        assert_eq!(SuffixClass::classify("national"), Some(SuffixClass::Tional));
        assert_eq!(SuffixClass::classify("dog"), None);
        // "ing" tem prioridade mesmo quando outra regra também casaria
        assert_eq!(SuffixClass::classify("bedding"), Some(SuffixClass::Ing));
    }

    #[test]
    fn test_capitalization_guard() {
        let words = ["He", "met", "Anna", ".", "She", "left"];
        let features = extract_features(&words, flags("4"));

        // Primeira palavra: sem anterior, a feature dispara
        assert!(features[0].contains("w=CAP"));
        assert!(!features[1].contains("w=CAP"));
        assert!(features[2].contains("w=CAP"));
        // Depois de "." não dispara
        assert!(!features[4].contains("w=CAP"));
    }

    #[test]
    fn test_number_feature() {
        // Separadores de milhar não são aceitos, nem `,` nem `_`
        let words = ["12", "3.5", "-7", "1e3", "dog", "1,000", "1_000"];
        let features = extract_features(&words, flags("8"));
        let fired: Vec<bool> = features.iter().map(|f| f.contains("w=NUM")).collect();
        assert_eq!(fired, vec![true, true, true, true, false, false, false]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let words = ["The", "cat", "sat", "quietly", ".", "Running", "42"];
        for bits in 1..=u8::MAX {
            let flags = FeatureFlags::from_bits_truncate(bits);
            assert_eq!(extract_features(&words, flags), extract_features(&words, flags));
        }
    }

    #[test]
    fn test_flags_parse_and_display() {
        assert_eq!(flags("31"), FeatureFlags::WORD | FeatureFlags::PREV_WORD);
        assert_eq!(flags("8811").to_string(), "18");
        assert_eq!(flags("12345678"), FeatureFlags::all());

        assert!(matches!("19".parse::<FeatureFlags>(), Err(PosError::InvalidFlag('9'))));
        assert!(matches!("0".parse::<FeatureFlags>(), Err(PosError::InvalidFlag('0'))));
        assert!(matches!("".parse::<FeatureFlags>(), Err(PosError::EmptyFlags)));
    }
}
