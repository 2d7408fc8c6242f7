use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::similarity::ratio;

pub const MAX_STORIES: usize = 10;
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.6;
pub const VOTE_URL: &str = "https://api.prixsix.com/vote";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub source: String,
}

/// Keeps stories in order, skipping any whose title is too close to one
/// already kept, and stops at [`MAX_STORIES`].
pub fn dedupe_stories(stories: Vec<Story>) -> Vec<Story> {
    let mut kept: Vec<Story> = Vec::new();
    let mut kept_titles: Vec<String> = Vec::new();

    for story in stories {
        let title = story.title.to_lowercase();
        let dominated = kept_titles
            .iter()
            .any(|t| ratio(&title, t) > TITLE_SIMILARITY_THRESHOLD);
        if !dominated {
            kept_titles.push(title);
            kept.push(story);
        }
        if kept.len() >= MAX_STORIES {
            break;
        }
    }
    kept
}

/// Removes a leading ```` ``` ```` / ```` ```html ```` fence and a trailing ```` ``` ````.
pub fn strip_code_fences(text: &str) -> String {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest.strip_prefix("html").unwrap_or(rest);
        // the fence line may carry trailing spaces before its newline
        let rest = rest.trim_start_matches(|c: char| c == ' ' || c == '\t' || c == '\r');
        body = rest.strip_prefix('\n').unwrap_or(rest);
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest.strip_suffix('\n').unwrap_or(rest);
    }

    body.trim().to_string()
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// A "Headlines" section linking each story to its source.
pub fn headlines_html(stories: &[Story]) -> String {
    if stories.is_empty() {
        return String::new();
    }
    let items: Vec<String> = stories
        .iter()
        .map(|s| {
            let title = escape_html(&s.title);
            let source = escape_html(&s.source);
            if s.link.is_empty() {
                format!("  <li>{} <i>({})</i></li>", title, source)
            } else {
                format!(r#"  <li><a href="{}">{}</a> <i>({})</i></li>"#, escape_html(&s.link), title, source)
            }
        })
        .collect();
    format!("<h3>Headlines</h3>\n<ul>\n{}\n</ul>", items.join("\n"))
}

fn voting_footer() -> String {
    format!(
        r#"<div style="text-align:center; margin-top:40px; padding:20px; border-top:2px solid #e10600;">
  <p style="font-size:18px; font-weight:bold; color:#1a1a2e;">Rate this issue</p>
  <a href="{VOTE_URL}?type=love" style="display:inline-block; margin:8px 12px; padding:12px 28px; background:#00d200; color:#fff; text-decoration:none; border-radius:6px; font-weight:bold; font-size:16px;">&#127937; Chequered Flag (Love it)</a>
  <a href="{VOTE_URL}?type=hate" style="display:inline-block; margin:8px 12px; padding:12px 28px; background:#e10600; color:#fff; text-decoration:none; border-radius:6px; font-weight:bold; font-size:16px;">&#x1F3F4; Black Flag (Disqualified)</a>
</div>"#
    )
}

/// Full standalone document around a newsletter body.
pub fn build_newsletter_html(body: &str, date: NaiveDate) -> String {
    let date = escape_html(&date.format("%d %B %Y").to_string());
    let footer = voting_footer();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>The Paddock Pub Chat — {date}</title>
<style>
  body {{ max-width: 680px; margin: 0 auto; padding: 24px; font-family: Georgia, 'Times New Roman', serif; background: #f9f9f9; color: #1a1a2e; line-height: 1.6; }}
  h1 {{ text-align: center; color: #e10600; border-bottom: 3px solid #e10600; padding-bottom: 8px; }}
  h3 {{ color: #15151e; margin-top: 28px; }}
  b {{ color: #e10600; }}
  ul {{ padding-left: 20px; }}
  li {{ margin-bottom: 6px; }}
  .date {{ text-align: center; color: #666; font-size: 14px; }}
</style>
</head>
<body>
<h1>&#127937; The Paddock Pub Chat</h1>
<p class="date">{date}</p>
{body}
{footer}
</body>
</html>
"#
    )
}
