// src/job_acquisition/render/heuristics.rs
//! Turning a rendered DOM into description text when we know nothing
//! site-specific, or when the site selectors missed.
use regex::{Regex, RegexBuilder};
use scraper::Html;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::job_acquisition::html_text::{block_text, page_text, parse_posting, parse_selector};
use crate::job_acquisition::site_rules::{HeuristicRules, SiteRule};
use crate::job_acquisition::types::JobPosting;
use crate::utils::char_len;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageExtraction {
    /// A site selector matched a long enough container.
    Selector(JobPosting),
    /// The keyword-scored scan picked a container.
    Heuristic(JobPosting),
    /// Nothing structural matched; approximate body text.
    Raw(String),
}

pub fn extract_from_html(
    html: &str,
    site: &SiteRule,
    rules: &HeuristicRules,
    min_chars: usize,
) -> PageExtraction {
    let document = Html::parse_document(html);

    if let Some(posting) = parse_posting(&document, &site.selectors, min_chars) {
        return PageExtraction::Selector(posting);
    }

    let scorer = CandidateScorer::new(rules, min_chars);
    if let Some(description) = best_candidate(&document, rules, &scorer) {
        let title = parse_posting(&document, &site.selectors, 1).and_then(|p| p.title);
        return PageExtraction::Heuristic(JobPosting {
            title,
            ..JobPosting::from_description(description)
        });
    }

    PageExtraction::Raw(middle_lines(&page_text(&document, &rules.chrome_tags), rules))
}

/// Keyword/boilerplate scoring of candidate blocks, with the boilerplate
/// vocabulary compiled once per page.
pub struct CandidateScorer<'a> {
    rules: &'a HeuristicRules,
    min_chars: usize,
    boilerplate: Option<Regex>,
}

impl<'a> CandidateScorer<'a> {
    pub fn new(rules: &'a HeuristicRules, min_chars: usize) -> Self {
        Self {
            rules,
            min_chars,
            boilerplate: boilerplate_pattern(&rules.boilerplate),
        }
    }

    /// `None` disqualifies the block.
    pub fn score(&self, text: &str) -> Option<i64> {
        let len = char_len(text);
        if len < self.min_chars.max(self.rules.min_candidate_chars) {
            return None;
        }

        let lower = text.to_lowercase();
        let keyword_hits = self
            .rules
            .keywords
            .iter()
            .filter(|keyword| lower.contains(keyword.as_str()))
            .count() as i64;
        if keyword_hits == 0 {
            return None;
        }

        // Each boilerplate term counts once, however often a posting repeats it.
        let boilerplate_hits = self.boilerplate.as_ref().map_or(0, |pattern| {
            pattern
                .find_iter(&lower)
                .map(|m| m.as_str())
                .collect::<HashSet<_>>()
                .len() as i64
        });

        let length_bonus = (len as i64 / 250).min(8);
        let score = keyword_hits * 10 + length_bonus - boilerplate_hits * 15;
        (score > 0).then_some(score)
    }
}

/// Whole-word alternation over the terms, so "home" never hits "homeoffice".
fn boilerplate_pattern(terms: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = terms
        .iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .map(|term| regex::escape(&term))
        .collect();
    if alternatives.is_empty() {
        return None;
    }

    let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("Ignoring boilerplate vocabulary: {}", e);
            None
        }
    }
}

fn best_candidate(document: &Html, rules: &HeuristicRules, scorer: &CandidateScorer) -> Option<String> {
    let selector_str = rules
        .container_hints
        .iter()
        .flat_map(|hint| [format!("[class*='{}']", hint), format!("[id*='{}']", hint)])
        .collect::<Vec<_>>()
        .join(", ");
    if selector_str.is_empty() {
        return None;
    }
    let selector = parse_selector(&selector_str)?;

    let mut best: Option<(i64, String)> = None;
    for element in document.select(&selector) {
        let text = block_text(element);
        let Some(score) = scorer.score(&text) else {
            continue;
        };
        debug!("Heuristic candidate scored {} ({} chars)", score, char_len(&text));
        // Ties keep the earlier, usually outer, container.
        if best.as_ref().map_or(true, |(top, _)| score > *top) {
            best = Some((score, text));
        }
    }
    best.map(|(_, text)| text)
}

/// Last-resort cut: keep non-trivial lines, drop the leading and trailing
/// fractions where site chrome tends to live.
pub fn middle_lines(text: &str, rules: &HeuristicRules) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| char_len(line) >= rules.min_line_chars)
        .collect();

    let total = lines.len();
    let head = (total as f32 * rules.head_fraction).floor() as usize;
    let tail = (total as f32 * rules.tail_fraction).floor() as usize;
    let end = total.saturating_sub(tail);
    if head >= end {
        return lines.join("\n");
    }
    lines[head..end].join("\n")
}
