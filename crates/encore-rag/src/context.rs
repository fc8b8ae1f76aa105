//! Context assembly under a character budget.
//!
//! Ranked paths are rendered best first. Each path becomes one line of
//! sentences; a sentence already stated by a higher-ranked path is not
//! repeated. A line that does not fit the budget is omitted whole, and
//! assembly stops there.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use encore_core::ScoredPath;

use crate::error::{Result, RetrievalError};
use crate::verbalizer::TripleVerbalizer;

/// Returned in place of an empty context.
pub const NO_INFORMATION: &str = "No relevant information found in the knowledge graph.";

const BLOCK_SEPARATOR: &str = "\n";
const SENTENCE_SEPARATOR: &str = " ";

/// Output of `ContextBuilder::assemble`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltContext {
    pub text: String,
    /// Paths that contributed at least one sentence.
    pub paths_used: usize,
    /// Longest contributing path, in hops.
    pub max_path_len: usize,
}

#[derive(Debug, Clone)]
pub struct ContextBuilder {
    verbalizer: TripleVerbalizer,
    max_paths: usize,
}

impl ContextBuilder {
    pub fn new(max_paths: usize) -> Self {
        Self {
            verbalizer: TripleVerbalizer::new(),
            max_paths,
        }
    }

    /// Context text for `paths`, at most `max_length` characters.
    pub fn build(&self, paths: &[ScoredPath], question: &str, max_length: usize) -> Result<String> {
        self.assemble(paths, question, max_length).map(|built| built.text)
    }

    /// Like `build`, also reporting which paths made it in.
    ///
    /// `paths` must already be in rank order. The result is never empty:
    /// when nothing fits, the text is `NO_INFORMATION` and `paths_used` is 0.
    pub fn assemble(
        &self,
        paths: &[ScoredPath],
        question: &str,
        max_length: usize,
    ) -> Result<BuiltContext> {
        if max_length == 0 {
            return Err(RetrievalError::InvalidArgument(
                "max_length must be positive".to_string(),
            ));
        }

        let mut text = String::new();
        let mut length = 0usize;
        let mut paths_used = 0usize;
        let mut max_path_len = 0usize;
        let mut stated: HashSet<String> = HashSet::new();

        for scored in paths {
            if paths_used >= self.max_paths {
                break;
            }

            let fresh: Vec<String> = self
                .verbalizer
                .verbalize_path(&scored.path)
                .into_iter()
                .map(|fragment| format!("{fragment}."))
                .filter(|sentence| !stated.contains(sentence))
                .collect();

            let mut unique = Vec::with_capacity(fresh.len());
            for sentence in fresh {
                if !unique.contains(&sentence) {
                    unique.push(sentence);
                }
            }
            if unique.is_empty() {
                continue;
            }

            let block = unique.join(SENTENCE_SEPARATOR);
            let separator = if text.is_empty() { 0 } else { BLOCK_SEPARATOR.len() };
            let block_len = block.chars().count();
            if length + separator + block_len > max_length {
                tracing::debug!(
                    rank = scored.rank,
                    block_len,
                    used = length,
                    max_length,
                    "Context budget reached"
                );
                break;
            }

            if !text.is_empty() {
                text.push_str(BLOCK_SEPARATOR);
            }
            text.push_str(&block);
            length += separator + block_len;
            stated.extend(unique);
            paths_used += 1;
            max_path_len = max_path_len.max(scored.path.len());
        }

        if text.is_empty() {
            tracing::debug!(question, candidates = paths.len(), "No context assembled");
            return Ok(BuiltContext {
                text: NO_INFORMATION.to_string(),
                paths_used: 0,
                max_path_len: 0,
            });
        }

        Ok(BuiltContext {
            text,
            paths_used,
            max_path_len,
        })
    }

    /// The prompt handed to the answer generator.
    pub fn answer_prompt(&self, context: &str, question: &str) -> String {
        format!(
            "Based on the following information from the music knowledge graph:\n\n\
             {context}\n\n\
             Please answer the question: {question}\n\n\
             If the information above is sufficient, provide a direct answer.\n\
             If more information is needed, say so clearly."
        )
    }
}

/// Size figures for a built context.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextStats {
    /// Characters.
    pub length: usize,
    pub sentences: usize,
    pub words: usize,
    pub lines: usize,
}

impl ContextStats {
    pub fn of(context: &str) -> Self {
        Self {
            length: context.chars().count(),
            sentences: context
                .split('.')
                .filter(|s| !s.trim().is_empty())
                .count(),
            words: context.split_whitespace().count(),
            lines: context.lines().count(),
        }
    }
}
