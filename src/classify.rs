// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Keyword-count category classifier

use crate::registry::CategoryRegistry;

/// Best category for a document and the number of its keywords that matched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub category: Option<String>,
    pub confidence: usize,
}

/// Score every category by how many of its keywords occur in `text`.
///
/// A keyword hits if its whitespace-normalized form occurs in the normalized
/// text, or its raw lower-cased form occurs in the raw lower-cased text. The
/// strictly highest score wins, so ties go to the category listed first.
pub fn classify(text: &str, registry: &CategoryRegistry) -> Classification {
    let raw = text.to_lowercase();
    let normalized = normalize(&raw);

    let mut best = Classification::default();
    for entry in registry.iter() {
        let hits = entry
            .keywords
            .iter()
            .filter(|keyword| {
                let keyword = keyword.to_lowercase();
                let flat = normalize(&keyword);
                !flat.is_empty() && (normalized.contains(&flat) || raw.contains(&keyword))
            })
            .count();

        if hits > best.confidence {
            best = Classification {
                category: Some(entry.name.clone()),
                confidence: hits,
            };
        }
    }
    best
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CategoryEntry;

    fn registry(entries: &[(&str, &[&str])]) -> CategoryRegistry {
        CategoryRegistry::from_entries(
            entries
                .iter()
                .map(|(name, keywords)| CategoryEntry::new(*name).with_keywords(keywords.iter().copied())),
        )
    }

    #[test]
    fn test_more_hits_wins() {
        let reg = registry(&[("A", &["invoice"]), ("B", &["invoice", "overdue"])]);
        let result = classify("This invoice is overdue", &reg);
        assert_eq!(result.category.as_deref(), Some("B"));
        assert_eq!(result.confidence, 2);
    }

    #[test]
    fn test_tie_goes_to_first_category() {
        let reg = registry(&[("A", &["invoice"]), ("B", &["invoice"])]);
        assert_eq!(classify("INVOICE", &reg).category.as_deref(), Some("A"));
    }

    #[test]
    fn test_whitespace_in_text_and_keyword() {
        let reg = registry(&[("tax", &["Tax   Return"])]);
        let result = classify("Your tax\n\treturn for 2023", &reg);
        assert_eq!(result.category.as_deref(), Some("tax"));
        assert_eq!(result.confidence, 1);
    }

    #[test]
    fn test_keyword_counts_once() {
        let reg = registry(&[("bank", &["balance"])]);
        assert_eq!(classify("balance balance balance", &reg).confidence, 1);
    }

    #[test]
    fn test_nothing_matches() {
        let reg = registry(&[("empty", &[]), ("blank", &["", "   "]), ("bank", &["iban"])]);
        assert_eq!(classify("a letter from grandma", &reg), Classification::default());
        assert_eq!(classify("", &CategoryRegistry::new()), Classification::default());
    }
}
