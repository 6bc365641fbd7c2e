//! Lexical retriever over JSONL guideline records

use super::{route_doc_type, ContextRetriever, DocType, NO_CONTEXT};
use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// One line of the guideline JSONL file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuidelineRecord {
    pub doc: String,
    pub section: String,
    pub rule: String,
    pub numeric: String,
    pub basis: String,
}

#[derive(Debug, Clone)]
struct Passage {
    doc: String,
    doc_type: DocType,
    text: String,
    grams: HashSet<(char, char)>,
}

/// Ranks passages by character-bigram overlap with the question
#[derive(Debug, Clone)]
pub struct KeywordRetriever {
    passages: Vec<Passage>,
    top_k: usize,
}

impl KeywordRetriever {
    /// Build a retriever from in-memory records
    pub fn from_records(records: Vec<GuidelineRecord>, top_k: usize) -> Self {
        let passages = records
            .into_iter()
            .map(|record| {
                let text = format!(
                    "문서: {}\n항목: {}\n규칙: {}\n수치: {}\n근거: {}",
                    record.doc, record.section, record.rule, record.numeric, record.basis
                );
                Passage {
                    doc_type: DocType::from_document_name(&record.doc),
                    grams: bigrams(&text),
                    doc: record.doc,
                    text,
                }
            })
            .collect();

        Self {
            passages,
            top_k: top_k.max(1),
        }
    }

    /// Load records from a JSONL file, skipping blank lines
    pub fn from_jsonl<P: AsRef<Path>>(path: P, top_k: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)?;
        let mut records = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            records.push(serde_json::from_str::<GuidelineRecord>(line)?);
        }

        Ok(Self::from_records(records, top_k))
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

impl ContextRetriever for KeywordRetriever {
    fn get_relevant_context(&self, question: &str) -> String {
        if self.passages.is_empty() {
            return NO_CONTEXT.to_string();
        }

        let doc_type = route_doc_type(question);
        let query = bigrams(question);

        let mut scored: Vec<(usize, usize)> = self
            .passages
            .iter()
            .enumerate()
            .filter(|(_, p)| doc_type.map_or(true, |t| p.doc_type == t))
            .map(|(i, p)| (i, query.intersection(&p.grams).count()))
            .filter(|(_, score)| *score > 0)
            .collect();
        // stable sort keeps file order among equal scores
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        debug!(
            "Retrieval: doc_type={:?}, candidates={}",
            doc_type.map(|t| t.as_str()),
            scored.len()
        );

        let lines: Vec<String> = scored
            .into_iter()
            .take(self.top_k)
            .map(|(i, _)| {
                let passage = &self.passages[i];
                let source = if passage.doc.is_empty() {
                    "알 수 없음"
                } else {
                    passage.doc.as_str()
                };
                format!("[출처: {}]\n{}", source, passage.text)
            })
            .collect();

        if lines.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            lines.join("\n\n---\n\n")
        }
    }
}

fn bigrams(text: &str) -> HashSet<(char, char)> {
    let mut grams = HashSet::new();
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let chars: Vec<char> = word.chars().collect();
        for pair in chars.windows(2) {
            grams.insert((pair[0], pair[1]));
        }
    }
    grams
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(doc: &str, section: &str, rule: &str) -> GuidelineRecord {
        GuidelineRecord {
            doc: doc.to_string(),
            section: section.to_string(),
            rule: rule.to_string(),
            numeric: String::new(),
            basis: "지침 3조".to_string(),
        }
    }

    fn retriever() -> KeywordRetriever {
        KeywordRetriever::from_records(
            vec![
                record("아동복지법", "정의", "아동이란 18세 미만인 사람을 말한다"),
                record("지역아동센터 지원사업 안내", "운영비", "운영비는 시설 규모에 따라 지원한다"),
                record("종사자 인건비 가이드라인", "호봉", "시설장 인건비는 호봉표를 따른다"),
                record("종사자 인건비 가이드라인", "수당", "명절 수당을 지급한다"),
            ],
            3,
        )
    }

    #[test]
    fn test_routed_question_only_returns_matching_doc_type() {
        let context = retriever().get_relevant_context("시설장 인건비 호봉 기준");
        assert!(context.starts_with("[출처: 종사자 인건비 가이드라인]"));
        assert!(!context.contains("아동복지법"));
        assert!(!context.contains("지원사업"));
    }

    #[test]
    fn test_passages_are_joined_with_separator() {
        let context = retriever().get_relevant_context("인건비 수당 호봉");
        assert_eq!(context.matches("[출처:").count(), 2);
        assert!(context.contains("\n\n---\n\n"));
        assert!(context.contains("규칙: 명절 수당을 지급한다"));
    }

    #[test]
    fn test_no_overlap_returns_sentinel() {
        let context = retriever().get_relevant_context("xyz");
        assert_eq!(context, NO_CONTEXT);

        let empty = KeywordRetriever::from_records(Vec::new(), 3);
        assert_eq!(empty.get_relevant_context("인건비"), NO_CONTEXT);
    }

    #[test]
    fn test_from_jsonl_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"doc": "아동복지법", "section": "정의", "rule": "아동 정의"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"doc": "인건비 기준", "rule": "기본급"}}"#).unwrap();

        let retriever = KeywordRetriever::from_jsonl(file.path(), 3).unwrap();
        assert_eq!(retriever.len(), 2);
    }
}
