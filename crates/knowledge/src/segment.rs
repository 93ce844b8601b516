//! Splits a constitution-like document into citation-tagged units.
//!
//! The text before the first chapter marker is the introduction. Each chapter
//! is split on article markers and every article becomes one unit cited as
//! `"<chapter marker>, <article marker>"`. A chapter with no article marker
//! yields nothing and is reported as a gap.

use crate::profile::Profile;
use crate::types::DocumentUnit;
use charter_core::{AppError, AppResult};
use regex::Regex;
use std::collections::HashMap;

/// A chapter dropped because it contained no article marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationGap {
    pub chapter: String,
}

#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub units: Vec<DocumentUnit>,
    pub gaps: Vec<SegmentationGap>,
}

pub struct Segmenter {
    chapter_re: Regex,
    article_re: Regex,
    introduction_citation: String,
}

impl Segmenter {
    pub fn new(profile: &Profile) -> AppResult<Self> {
        let chapter_re = Regex::new(&format!(
            r"\b{}\s+[IVXLCDM]+\b",
            regex::escape(&profile.chapter_keyword)
        ))
        .map_err(|e| AppError::Config(format!("Invalid chapter keyword: {}", e)))?;

        let article_re = Regex::new(&format!(
            r"\b{}\s+\d+\.",
            regex::escape(&profile.article_keyword)
        ))
        .map_err(|e| AppError::Config(format!("Invalid article keyword: {}", e)))?;

        Ok(Self {
            chapter_re,
            article_re,
            introduction_citation: profile.introduction_citation.clone(),
        })
    }

    /// Segment raw text into units, logging and discarding gaps.
    pub fn segment(&self, raw_text: &str) -> Vec<DocumentUnit> {
        self.segment_with_report(raw_text).units
    }

    pub fn segment_with_report(&self, raw_text: &str) -> Segmentation {
        let text = normalize_whitespace(raw_text);
        let mut segmentation = Segmentation::default();
        let mut seen: HashMap<String, u32> = HashMap::new();

        let chapters: Vec<(usize, usize)> = self
            .chapter_re
            .find_iter(&text)
            .map(|m| (m.start(), m.end()))
            .collect();

        let intro_end = chapters.first().map(|c| c.0).unwrap_or(text.len());
        segmentation.units.push(DocumentUnit::new(
            text[..intro_end].trim(),
            self.introduction_citation.clone(),
        ));
        seen.insert(self.introduction_citation.clone(), 1);

        for (i, &(start, end)) in chapters.iter().enumerate() {
            let chapter_marker = &text[start..end];
            let block_end = chapters.get(i + 1).map(|c| c.0).unwrap_or(text.len());
            let body = &text[end..block_end];

            let articles: Vec<(usize, usize)> = self
                .article_re
                .find_iter(body)
                .map(|m| (m.start(), m.end()))
                .collect();

            if articles.is_empty() {
                tracing::warn!(chapter = %chapter_marker, "Chapter has no article marker, skipping");
                segmentation.gaps.push(SegmentationGap {
                    chapter: chapter_marker.to_string(),
                });
                continue;
            }

            for (j, &(a_start, a_end)) in articles.iter().enumerate() {
                let article_marker = body[a_start..a_end].trim_end_matches('.');
                let article_end = articles.get(j + 1).map(|a| a.0).unwrap_or(body.len());
                let citation = unique_citation(
                    &mut seen,
                    format!("{}, {}", chapter_marker, article_marker),
                );
                segmentation
                    .units
                    .push(DocumentUnit::new(body[a_end..article_end].trim(), citation));
            }
        }

        tracing::debug!(
            units = segmentation.units.len(),
            chapters = chapters.len(),
            gaps = segmentation.gaps.len(),
            "Segmented document"
        );

        segmentation
    }
}

/// Non-breaking spaces and line breaks become spaces; runs collapse to one.
fn normalize_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn unique_citation(seen: &mut HashMap<String, u32>, citation: String) -> String {
    let count = seen.entry(citation.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        return citation;
    }
    tracing::warn!(citation = %citation, "Duplicate locator in document");
    let disambiguated = format!("{} ({})", citation, count);
    seen.insert(disambiguated.clone(), 1);
    disambiguated
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;

    const ROMAN: [&str; 5] = ["I", "II", "III", "IV", "V"];

    /// Builds a document with the given number of articles per chapter,
    /// numbering articles consecutively from 1.
    pub(crate) fn sample_document(articles_per_chapter: &[usize]) -> String {
        let mut doc = String::from("We, the people,\u{a0}establish this Constitution.\n\n");
        let mut article = 1;
        for (i, count) in articles_per_chapter.iter().enumerate() {
            doc.push_str(&format!("Chapter {}\nTHE TOPIC OF CHAPTER {}\n", ROMAN[i], i + 1));
            for _ in 0..*count {
                doc.push_str(&format!(
                    "Article {}.\nThis is the body of article number {}.\n\n",
                    article, article
                ));
                article += 1;
            }
        }
        doc
    }

    fn english() -> Segmenter {
        Segmenter::new(&Profile::english()).unwrap()
    }

    #[test]
    fn test_introduction_plus_one_unit_per_article() {
        let units = english().segment(&sample_document(&[3, 4, 3]));

        assert_eq!(units.len(), 1 + 10);
        assert_eq!(units[0].citation, "Introduction and preamble");
        assert_eq!(units[0].text, "We, the people, establish this Constitution.");
        assert_eq!(units[1].citation, "Chapter I, Article 1");
        assert_eq!(units[5].citation, "Chapter II, Article 5");
        assert_eq!(units[5].text, "This is the body of article number 5.");
        assert_eq!(units[10].citation, "Chapter III, Article 10");
    }

    #[test]
    fn test_citations_are_unique() {
        let units = english().segment(&sample_document(&[2, 5, 1, 2]));
        let citations: HashSet<&str> = units.iter().map(|u| u.citation.as_str()).collect();
        assert_eq!(citations.len(), units.len());
        assert!(units.iter().all(|u| !u.citation.is_empty()));
    }

    #[test]
    fn test_chapter_without_articles_is_a_gap() {
        let segmentation = english().segment_with_report(&sample_document(&[2, 0, 1]));

        assert_eq!(segmentation.units.len(), 1 + 3);
        assert_eq!(
            segmentation.gaps,
            vec![SegmentationGap {
                chapter: "Chapter II".to_string()
            }]
        );
        assert_eq!(segmentation.units[3].citation, "Chapter III, Article 3");
    }

    #[test]
    fn test_chapter_heading_is_not_part_of_article() {
        let units = english().segment(&sample_document(&[1]));
        assert!(!units[1].text.contains("THE TOPIC"));
        assert!(!units[0].text.contains("THE TOPIC"));
    }

    #[test]
    fn test_word_boundary_avoids_false_markers() {
        let text = "Preamble. Chapter I Article 1. Subchapter IV of Articles 12. applies. \
                    Article 2. Second.";
        let units = english().segment(text);

        let citations: Vec<&str> = units.iter().map(|u| u.citation.as_str()).collect();
        assert_eq!(
            citations,
            vec![
                "Introduction and preamble",
                "Chapter I, Article 1",
                "Chapter I, Article 2"
            ]
        );
        assert!(units[1].text.contains("Subchapter IV of Articles 12."));
    }

    #[test]
    fn test_text_without_chapters_is_all_introduction() {
        let units = english().segment("Just a preamble with no structure.");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "Just a preamble with no structure.");
    }

    #[test]
    fn test_empty_document_still_has_introduction() {
        let units = english().segment("");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "");
    }

    #[test]
    fn test_polish_profile() {
        let text = "Preambuła narodu.\nRozdział I\nRZECZPOSPOLITA\nArt. 1.\nRzeczpospolita Polska jest dobrem wspólnym.\nArt. 2.\nRzeczpospolita Polska jest demokratycznym państwem prawnym.\nRozdział II\nArt. 30.\nGodność człowieka.";
        let units = Segmenter::new(&Profile::polish()).unwrap().segment(text);

        let citations: Vec<&str> = units.iter().map(|u| u.citation.as_str()).collect();
        assert_eq!(
            citations,
            vec![
                "Wstęp i preambuła",
                "Rozdział I, Art. 1",
                "Rozdział I, Art. 2",
                "Rozdział II, Art. 30"
            ]
        );
        assert_eq!(units[1].text, "Rzeczpospolita Polska jest dobrem wspólnym.");
    }

    #[test]
    fn test_duplicate_locators_are_disambiguated() {
        let text = "Intro. Chapter I Article 1. First. Chapter I Article 1. Again.";
        let units = english().segment(text);
        assert_eq!(units[1].citation, "Chapter I, Article 1");
        assert_eq!(units[2].citation, "Chapter I, Article 1 (2)");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        const NUMERALS: [&str; 12] = [
            "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII",
        ];

        /// Lowercase filler never forms a chapter or article marker.
        fn filler() -> impl Strategy<Value = String> {
            "[a-z,;]{1,10}( [a-z,;]{1,10}){0,12}"
        }

        /// Chapters as (numeral index, article numbers); numerals and
        /// article numbers may repeat, and chapters may have no articles.
        fn layout() -> impl Strategy<Value = Vec<(usize, Vec<u32>)>> {
            prop::collection::vec(
                (0..NUMERALS.len(), prop::collection::vec(1u32..30, 0..6)),
                0..10,
            )
        }

        fn render(intro: &str, chapters: &[(usize, Vec<u32>)], body: &str) -> String {
            let mut doc = format!("{}\n\n", intro);
            for (numeral, articles) in chapters {
                doc.push_str(&format!("Chapter {}\n{}\n", NUMERALS[*numeral], body.to_uppercase()));
                for article in articles {
                    doc.push_str(&format!("Article {}.\n{}\n\n", article, body));
                }
            }
            doc
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(128))]

            #[test]
            fn every_layout_yields_introduction_plus_one_unit_per_article(
                intro in filler(),
                chapters in layout(),
                body in filler(),
            ) {
                let segmentation = english().segment_with_report(&render(&intro, &chapters, &body));
                let articles: usize = chapters.iter().map(|(_, a)| a.len()).sum();
                let empty_chapters = chapters.iter().filter(|(_, a)| a.is_empty()).count();

                prop_assert_eq!(segmentation.units.len(), 1 + articles);
                prop_assert_eq!(segmentation.gaps.len(), empty_chapters);
                prop_assert_eq!(&segmentation.units[0].citation, "Introduction and preamble");
            }

            #[test]
            fn citations_are_pairwise_unique(
                intro in filler(),
                chapters in layout(),
                body in filler(),
            ) {
                let units = english().segment(&render(&intro, &chapters, &body));
                let citations: HashSet<&str> = units.iter().map(|u| u.citation.as_str()).collect();

                prop_assert_eq!(citations.len(), units.len());
                prop_assert!(units.iter().all(|u| !u.citation.is_empty()));
            }
        }
    }
}
