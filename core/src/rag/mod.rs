//! Guideline retrieval for question answering

pub mod retriever;

pub use retriever::{GuidelineRecord, KeywordRetriever};

use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Returned when no guideline passage is available
pub const NO_CONTEXT: &str = "참조할 수 있는 운영 지침 데이터가 없습니다.";

/// Source of source-attributed passages for a question
pub trait ContextRetriever: Send + Sync {
    /// Concatenated passages relevant to the question, or [`NO_CONTEXT`]
    fn get_relevant_context(&self, question: &str) -> String;
}

/// Category of a guideline document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocType {
    Law,
    Support,
    Salary,
    Etc,
}

impl DocType {
    /// Category derived from a document name
    pub fn from_document_name(name: &str) -> Self {
        if name.contains("복지법") {
            DocType::Law
        } else if name.contains("지원사업") {
            DocType::Support
        } else if name.contains("인건비") {
            DocType::Salary
        } else {
            DocType::Etc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Law => "law",
            DocType::Support => "support",
            DocType::Salary => "salary",
            DocType::Etc => "etc",
        }
    }
}

const SALARY_KEYWORDS: &[&str] = &["인건비", "급여", "호봉", "수당", "보수", "연봉", "돈", "월급"];
const SUPPORT_KEYWORDS: &[&str] = &[
    "지원", "보조금", "운영비", "배치기준", "정원", "시설장", "생활복지사",
];
const LAW_KEYWORDS: &[&str] = &["법", "조문", "시행령", "시행규칙", "아동복지법"];

/// Route a question to a document category, salary first, then support, then law
pub fn route_doc_type(question: &str) -> Option<DocType> {
    let q = question.to_lowercase();
    let hit = |keywords: &[&str]| keywords.iter().any(|k| q.contains(k));

    if hit(SALARY_KEYWORDS) {
        Some(DocType::Salary)
    } else if hit(SUPPORT_KEYWORDS) {
        Some(DocType::Support)
    } else if hit(LAW_KEYWORDS) {
        Some(DocType::Law)
    } else {
        None
    }
}

/// Retriever that loads its document store on first use
pub struct LazyRetriever {
    path: PathBuf,
    top_k: usize,
    inner: OnceLock<Option<KeywordRetriever>>,
}

impl LazyRetriever {
    pub fn new<P: Into<PathBuf>>(path: P, top_k: usize) -> Self {
        Self {
            path: path.into(),
            top_k,
            inner: OnceLock::new(),
        }
    }

    /// Acquire the underlying store, loading it on the first call
    pub fn acquire(&self) -> Option<&KeywordRetriever> {
        self.inner
            .get_or_init(|| {
                info!("📚 Loading guideline documents from {}", self.path.display());
                match KeywordRetriever::from_jsonl(&self.path, self.top_k) {
                    Ok(retriever) if !retriever.is_empty() => Some(retriever),
                    Ok(_) => {
                        warn!("Guideline store is empty: {}", self.path.display());
                        None
                    }
                    Err(e) => {
                        warn!("Guideline store unavailable: {}", e);
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Whether the store has been loaded
    pub fn is_loaded(&self) -> bool {
        self.inner.get().is_some()
    }
}

impl ContextRetriever for LazyRetriever {
    fn get_relevant_context(&self, question: &str) -> String {
        match self.acquire() {
            Some(retriever) => retriever.get_relevant_context(question),
            None => NO_CONTEXT.to_string(),
        }
    }
}
