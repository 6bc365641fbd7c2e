//! Short-term memory of finalized question/answer pairs

use std::collections::VecDeque;

/// Bounded FIFO of `"Q: .. / A: .."` entries kept by the caller across runs
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl ConversationMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a finalized exchange, evicting the oldest when full
    pub fn record(&mut self, question: &str, answer: &str) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries
            .push_back(format!("Q: {} / A: {}", question.trim(), answer.trim()));
    }

    /// Up to `n` most recent entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<String> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_evicts_oldest() {
        let mut memory = ConversationMemory::new(2);
        memory.record("하나", "1");
        memory.record("둘", "2");
        memory.record("셋", "3");

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.recent(10), vec!["Q: 둘 / A: 2", "Q: 셋 / A: 3"]);
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let mut memory = ConversationMemory::default();
        for i in 0..5 {
            memory.record(&format!("질문{}", i), "답");
        }
        let recent = memory.recent(2);
        assert_eq!(recent, vec!["Q: 질문3 / A: 답", "Q: 질문4 / A: 답"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut memory = ConversationMemory::new(0);
        memory.record("q", "a");
        assert!(memory.is_empty());
    }
}
