//! Title statistics
//!
//! Character and word counts are exact. Token counts come from real
//! `tokenizer.json` files when configured (feature `hf-tokenizers`);
//! otherwise each scheme's pre-tokenization rules are applied, which gives
//! the number of pre-tokens (a lower bound on the subword count).

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tubeset_common::TitleAnalysis;

/// Counts tokens of a text under one tokenization scheme
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    /// Short label for logs
    fn name(&self) -> &str;
}

/// BERT basic tokenization: whitespace split, then every punctuation or
/// CJK character becomes its own token
#[derive(Debug, Clone, Copy, Default)]
pub struct BertPreTokenizer;

impl TokenCounter for BertPreTokenizer {
    fn count(&self, text: &str) -> usize {
        let mut tokens = 0;
        for word in text.split_whitespace() {
            let mut in_word = false;
            for c in word.chars() {
                if c.is_control() {
                    continue;
                }
                if is_bert_punctuation(c) || is_cjk(c) {
                    tokens += 1;
                    in_word = false;
                } else if !in_word {
                    tokens += 1;
                    in_word = true;
                }
            }
        }
        tokens
    }

    fn name(&self) -> &str {
        "bert-basic"
    }
}

/// ASCII symbols count as punctuation, plus the common Unicode punctuation blocks
fn is_bert_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(c as u32,
            0x00A1..=0x00BF
            | 0x2010..=0x2027
            | 0x2030..=0x205E
            | 0x3001..=0x3003
            | 0x3008..=0x3011)
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2B73F
        | 0x2B740..=0x2B81F
        | 0x2B820..=0x2CEAF
        | 0xF900..=0xFAFF
        | 0x2F800..=0x2FA1F)
}

static GPT2_PRETOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[sdmt]|ll|ve|re)| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+")
        .unwrap_or_else(|e| panic!("invalid GPT-2 pre-token pattern: {}", e))
});

/// GPT-2 byte-level pre-tokenization (contractions, letter runs, digit
/// runs, symbol runs, each optionally led by one space)
#[derive(Debug, Clone, Copy, Default)]
pub struct Gpt2PreTokenizer;

impl TokenCounter for Gpt2PreTokenizer {
    fn count(&self, text: &str) -> usize {
        GPT2_PRETOKEN.find_iter(text).count()
    }

    fn name(&self) -> &str {
        "gpt2-pretokens"
    }
}

/// Token counts from a Hugging Face `tokenizer.json`
#[cfg(feature = "hf-tokenizers")]
pub struct HfTokenCounter {
    name: String,
    tokenizer: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizers")]
impl HfTokenCounter {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let tokenizer = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| format!("Failed to load tokenizer {}: {}", path.display(), e))?;
        Ok(Self {
            name: path.display().to_string(),
            tokenizer,
        })
    }
}

#[cfg(feature = "hf-tokenizers")]
impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.get_ids().len(),
            Err(e) => {
                tracing::warn!(tokenizer = %self.name, error = %e, "Tokenization failed, counting 0");
                0
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Load a configured tokenizer, or fall back to the built-in rules
fn counter_for(
    configured: Option<&Path>,
    fallback: Box<dyn TokenCounter>,
) -> Box<dyn TokenCounter> {
    let Some(path) = configured else {
        return fallback;
    };

    #[cfg(feature = "hf-tokenizers")]
    {
        match HfTokenCounter::from_file(path) {
            Ok(counter) => {
                tracing::info!(tokenizer = %path.display(), "Loaded tokenizer");
                return Box::new(counter);
            }
            Err(e) => tracing::warn!("{}; using {}", e, fallback.name()),
        }
    }

    #[cfg(not(feature = "hf-tokenizers"))]
    tracing::warn!(
        tokenizer = %path.display(),
        "Built without hf-tokenizers; using {}",
        fallback.name()
    );

    fallback
}

/// Computes `TitleAnalysis` for item titles
pub struct TitleAnalyzer {
    bert: Box<dyn TokenCounter>,
    gpt: Box<dyn TokenCounter>,
}

impl TitleAnalyzer {
    pub fn new(bert: Box<dyn TokenCounter>, gpt: Box<dyn TokenCounter>) -> Self {
        Self { bert, gpt }
    }

    /// Built-in pre-tokenization rules for both schemes
    pub fn builtin() -> Self {
        Self::new(Box::new(BertPreTokenizer), Box::new(Gpt2PreTokenizer))
    }

    /// Use configured tokenizer files where given
    pub fn from_paths(bert: Option<&Path>, gpt: Option<&Path>) -> Self {
        Self::new(
            counter_for(bert, Box::new(BertPreTokenizer)),
            counter_for(gpt, Box::new(Gpt2PreTokenizer)),
        )
    }

    pub fn analyze(&self, title: &str) -> TitleAnalysis {
        TitleAnalysis {
            title: title.to_string(),
            title_length: title.chars().count(),
            word_count: title.split_whitespace().count(),
            num_tokens_bert: self.bert.count(title),
            num_tokens_gpt: self.gpt.count(title),
        }
    }
}

impl Default for TitleAnalyzer {
    fn default() -> Self {
        Self::builtin()
    }
}
