// src/job_acquisition/html_text.rs
//! DOM-to-text helpers shared by the HTTP and headless extractors.
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::site_rules::FieldSelectors;
use super::types::JobPosting;
use crate::utils::{char_len, clean_text, normalize_lines};

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6",
    "table", "tr", "blockquote", "pre", "dl", "dt", "dd", "main",
];

const ALWAYS_SKIPPED: &[&str] = &["script", "style", "noscript", "template"];

/// Text of `element` with block boundaries kept as newlines and list items
/// prefixed with `- `.
pub fn block_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    walk(element, &[], &mut out);
    normalize_lines(&out)
}

/// Like `block_text`, but whole subtrees whose tag is in `skip_tags` are dropped.
pub fn block_text_without(element: ElementRef<'_>, skip_tags: &[String]) -> String {
    let skip: Vec<&str> = skip_tags.iter().map(String::as_str).collect();
    let mut out = String::new();
    walk(element, &skip, &mut out);
    normalize_lines(&out)
}

fn walk(element: ElementRef<'_>, skip: &[&str], out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if skip.contains(&name) || ALWAYS_SKIPPED.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if name == "li" {
                    let mut item = String::new();
                    walk(child_el, skip, &mut item);
                    let item = clean_text(&item);
                    if !item.is_empty() {
                        out.push_str("\n- ");
                        out.push_str(&item);
                        out.push('\n');
                    }
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                walk(child_el, skip, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// First selector (in order) whose first match has more than `min_chars`
/// characters of single-line text.
pub fn first_text(document: &Html, selectors: &[String], min_chars: usize) -> Option<String> {
    selectors.iter().find_map(|selector_str| {
        let selector = parse_selector(selector_str)?;
        document.select(&selector).find_map(|element| {
            let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));
            (char_len(&text) > min_chars).then_some(text)
        })
    })
}

/// First description container (in selector order) whose block text reaches
/// `min_chars`, together with its list items.
pub fn description_block(
    document: &Html,
    selectors: &[String],
    min_chars: usize,
) -> Option<(String, Vec<String>)> {
    for selector_str in selectors {
        let Some(selector) = parse_selector(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = block_text(element);
            if char_len(&text) >= min_chars && !text.is_empty() {
                debug!("Description matched selector {}", selector_str);
                return Some((text, list_items(element)));
            }
        }
    }
    None
}

/// Text of every `<li>` inside `container`.
pub fn list_items(container: ElementRef<'_>) -> Vec<String> {
    let Some(selector) = parse_selector("li") else {
        return Vec::new();
    };
    container
        .select(&selector)
        .map(|li| clean_text(&li.text().collect::<Vec<_>>().join(" ")))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Build a posting from a parsed page using a site's field selectors.
/// Returns `None` when no description container has any text at all.
pub fn parse_posting(document: &Html, selectors: &FieldSelectors, min_chars: usize) -> Option<JobPosting> {
    let (description, items) = description_block(document, &selectors.description, min_chars.max(1))?;

    let title = first_text(document, &selectors.title, 1)
        .or_else(|| first_text(document, &["h1".to_string()], 1));
    let company = first_text(document, &selectors.company, 1);
    let location = first_text(document, &selectors.location, 1);

    Some(JobPosting {
        title,
        company,
        location,
        description,
        requirements: items
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n"),
        skills: Vec::new(),
    })
}

/// Body text of a whole page, `skip_tags` subtrees removed.
pub fn page_text(document: &Html, skip_tags: &[String]) -> String {
    let body = parse_selector("body").and_then(|selector| document.select(&selector).next());
    match body {
        Some(body) => block_text_without(body, skip_tags),
        None => block_text_without(document.root_element(), skip_tags),
    }
}

pub fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(selector) => Some(selector),
        Err(e) => {
            debug!("Ignoring invalid selector {}: {:?}", selector, e);
            None
        }
    }
}
