//! Fenced code block extraction from model replies.
//!
//! Three fence patterns are applied to the same input independently, in order
//! of specificity, and their matches are concatenated pattern-major: all
//! tagged-fence matches first, then all untagged, then all bare pairs. The
//! result is deliberately NOT in document order, and because the bare pattern
//! has no newline anchor it can re-match text the other two already captured.
//! Both behaviors are part of the contract; consumers that need uniqueness
//! dedup with [`unique_fragments`].

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Which fence pattern produced a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    /// ```` ```lang\n … \n``` ````
    Tagged,
    /// ```` ```\n … \n``` ````
    Untagged,
    /// ```` ``` … ``` ```` with no newline requirement
    Bare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFragment {
    pub text: String,
    pub fence: FenceKind,
}

static TAGGED_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]\w*\n(.*?)\n```").expect("invalid tagged fence regex")
});

static UNTAGGED_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\n(.*?)\n```").expect("invalid untagged fence regex"));

static BARE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("invalid bare fence regex"));

/// Extract every fenced code fragment from `text`.
///
/// Pure and deterministic; fragments are trimmed and empty ones dropped.
pub fn extract_code_blocks(text: &str) -> Vec<CodeFragment> {
    let passes: [(&Regex, FenceKind); 3] = [
        (&TAGGED_FENCE, FenceKind::Tagged),
        (&UNTAGGED_FENCE, FenceKind::Untagged),
        (&BARE_FENCE, FenceKind::Bare),
    ];

    let mut fragments = Vec::new();
    for (re, fence) in passes {
        for cap in re.captures_iter(text) {
            let code = cap[1].trim();
            if !code.is_empty() {
                fragments.push(CodeFragment {
                    text: code.to_string(),
                    fence,
                });
            }
        }
    }
    fragments
}

/// Drop fragments whose text was already seen, keeping first occurrences.
pub fn unique_fragments(fragments: Vec<CodeFragment>) -> Vec<CodeFragment> {
    let mut seen = HashSet::new();
    fragments
        .into_iter()
        .filter(|f| seen.insert(f.text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fences_yields_nothing() {
        assert!(extract_code_blocks("just prose, no delimiters").is_empty());
        assert!(extract_code_blocks("").is_empty());
    }

    #[test]
    fn tagged_block_comes_before_its_bare_duplicate() {
        let got = extract_code_blocks("```python\nX\n```");
        assert_eq!(got[0].text, "X");
        assert_eq!(got[0].fence, FenceKind::Tagged);
        // The bare pattern re-matches the same region, tag included.
        assert!(got[1..].iter().all(|f| f.fence == FenceKind::Bare));
        assert!(got.len() > 1);
    }

    #[test]
    fn sequential_tagged_blocks_keep_document_order() {
        let text = "```python\nalpha\n```\nsome prose\n```python\nbeta\n```\nmore\n```python\ngamma\n```";
        let got = extract_code_blocks(text);
        let tagged: Vec<&str> = got
            .iter()
            .filter(|f| f.fence == FenceKind::Tagged)
            .map(|f| f.text.as_str())
            .collect();
        assert_eq!(tagged, ["alpha", "beta", "gamma"]);
        // Pattern-major concatenation: the result starts with all tagged matches.
        assert_eq!(got[0].text, "alpha");
        assert_eq!(got[1].text, "beta");
        assert_eq!(got[2].text, "gamma");
    }

    #[test]
    fn tagged_matches_precede_untagged_regardless_of_position() {
        // Untagged block appears first in the document.
        let text = "```\nplain\n```\n\nlater:\n\n```python\ntyped\n```";
        let got = extract_code_blocks(text);
        let typed_at = got.iter().position(|f| f.text == "typed").unwrap();
        let plain_at = got.iter().position(|f| f.text == "plain").unwrap();
        assert!(
            typed_at < plain_at,
            "tagged fragment must sort before untagged one"
        );
        assert_eq!(got[typed_at].fence, FenceKind::Tagged);
        assert_eq!(got[plain_at].fence, FenceKind::Untagged);
    }

    #[test]
    fn bare_pair_without_newlines_matches() {
        let got = extract_code_blocks("inline ```x = 1``` here");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "x = 1");
        assert_eq!(got[0].fence, FenceKind::Bare);
    }

    #[test]
    fn whitespace_only_fragments_are_dropped() {
        assert!(extract_code_blocks("``` \t ```").is_empty());
        assert!(extract_code_blocks("```\n   \n```").is_empty());
    }

    #[test]
    fn extraction_is_idempotent_on_its_own_output() {
        let text = "```python\ndef f():\n    return 1\n```";
        let first = extract_code_blocks(text);
        // Re-running over extracted text (which carries no fences) finds nothing new.
        for frag in &first {
            assert!(extract_code_blocks(&frag.text).is_empty());
        }
    }

    #[test]
    fn unique_fragments_keeps_first_occurrence() {
        let frags = vec![
            CodeFragment {
                text: "a".into(),
                fence: FenceKind::Tagged,
            },
            CodeFragment {
                text: "b".into(),
                fence: FenceKind::Untagged,
            },
            CodeFragment {
                text: "a".into(),
                fence: FenceKind::Bare,
            },
        ];
        let unique = unique_fragments(frags);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].text, "a");
        assert_eq!(unique[0].fence, FenceKind::Tagged);
        assert_eq!(unique[1].text, "b");
    }
}
