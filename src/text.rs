// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Sentence segmentation and the filters applied to candidate sentences.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Characters that end a sentence. The half-width and ASCII forms are what
/// NFKC relates to the full-width ones.
const TERMINATORS: [char; 6] = ['。', '｡', '！', '？', '!', '?'];

/// Candidates shorter or longer than this (in characters) are rejected.
const MIN_LENGTH: usize = 5;
const MAX_LENGTH: usize = 200;

/// Anything above the ideographic space counts as the studied script. This
/// is deliberately coarse: it covers kana, CJK ideographs, and full-width
/// forms.
const SCRIPT_FLOOR: u32 = 0x3000;

const IDEOGRAPH_START: u32 = 0x4E00;
const IDEOGRAPH_END: u32 = 0x9FFF;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Compatibility-normalize (NFKC) and trim. Two texts are duplicates iff
/// their normalized forms are equal.
pub fn normalize(text: &str) -> String {
    text.trim().nfkc().collect::<String>().trim().to_string()
}

/// Collapse runs of whitespace into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").to_string()
}

/// Split text after each terminator, keeping the terminator with its
/// sentence. Whatever follows the last terminator is not a sentence and is
/// dropped. Pieces are trimmed; empty pieces are skipped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (index, ch) in text.char_indices() {
        if TERMINATORS.contains(&ch) {
            let end = index + ch.len_utf8();
            let body = &text[start..index];
            // A run of terminators ("！？") has an empty body after the
            // first one; it is not a sentence.
            if !body.is_empty() {
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
            }
            start = end;
        }
    }
    sentences
}

pub fn has_target_script(text: &str) -> bool {
    text.chars().any(|c| c as u32 > SCRIPT_FLOOR)
}

/// Whether a trimmed candidate may become a study unit.
pub fn is_valid_sentence(text: &str) -> bool {
    let length = text.chars().count();
    (MIN_LENGTH..=MAX_LENGTH).contains(&length) && has_target_script(text)
}

/// Score in `[0, 5]` averaging the density of ideographs and the length.
pub fn difficulty(text: &str) -> f64 {
    let length = text.chars().count();
    if length == 0 {
        return 1.0;
    }
    let ideographs = text
        .chars()
        .filter(|c| (IDEOGRAPH_START..=IDEOGRAPH_END).contains(&(*c as u32)))
        .count();
    let ideograph_score = f64::min(5.0, ideographs as f64 / length as f64 * 10.0);
    let length_score = f64::min(5.0, length as f64 / 40.0);
    let score = (ideograph_score + length_score) / 2.0;
    (score * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_terminators() {
        let sentences = split_sentences("猫が好きです。犬も好きです！本当？");
        assert_eq!(sentences, vec!["猫が好きです。", "犬も好きです！", "本当？"]);
    }

    #[test]
    fn test_split_drops_unterminated_tail() {
        let sentences = split_sentences("猫が好きです。そして");
        assert_eq!(sentences, vec!["猫が好きです。"]);
    }

    #[test]
    fn test_split_trims() {
        let sentences = split_sentences("  猫が好きです。\n  犬も好きです。 ");
        assert_eq!(sentences, vec!["猫が好きです。", "犬も好きです。"]);
    }

    #[test]
    fn test_split_ascii_marks_after_normalization() {
        let normalized = normalize("すごいですね！ほんとうですか？");
        let sentences = split_sentences(&normalized);
        assert_eq!(sentences, vec!["すごいですね!", "ほんとうですか?"]);
    }

    #[test]
    fn test_split_half_width_full_stop() {
        let sentences = split_sentences("ｺﾚﾊﾍﾟﾝﾃﾞｽ｡ｿﾚﾓﾍﾟﾝﾃﾞｽ｡");
        assert_eq!(sentences, vec!["ｺﾚﾊﾍﾟﾝﾃﾞｽ｡", "ｿﾚﾓﾍﾟﾝﾃﾞｽ｡"]);
    }

    #[test]
    fn test_split_terminator_runs() {
        let sentences = split_sentences("ほんとうですか！？");
        assert_eq!(sentences, vec!["ほんとうですか！"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_validity() {
        assert!(is_valid_sentence("猫が好きです。"));
        // Too short.
        assert!(!is_valid_sentence("猫。"));
        // Wrong script.
        assert!(!is_valid_sentence("I like cats!"));
        // Too long.
        let long = "あ".repeat(201);
        assert!(!is_valid_sentence(&long));
        let limit = "あ".repeat(200);
        assert!(is_valid_sentence(&limit));
    }

    #[test]
    fn test_normalize_folds_widths() {
        assert_eq!(normalize("  ＡＢＣ１２３です。 "), "ABC123です。");
        assert_eq!(normalize("ｶﾀｶﾅです。"), "カタカナです。");
    }

    #[test]
    fn test_difficulty() {
        assert_eq!(difficulty(""), 1.0);
        // 2 ideographs out of 7 characters: (2.857 + 0.175) / 2.
        assert_eq!(difficulty("猫が好きです。"), 1.5);
        // Both components cap at 5.
        let long = "漢".repeat(400);
        assert_eq!(difficulty(&long), 5.0);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a \n\t b"), "a b");
    }
}
