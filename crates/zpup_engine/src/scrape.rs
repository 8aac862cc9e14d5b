use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

fn server_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"var\s+server\s*=\s*['"](www\d{1,3})['"]\s*;"#).expect("valid server regex")
    })
}

/// Server identifier (`www<1-3 digits>`) assigned in the landing page script.
pub fn extract_server_id(body: &str) -> Option<String> {
    server_pattern()
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Finds the share link in an upload response page.
#[derive(Debug, Clone)]
pub struct ShareLinkScraper {
    link: Regex,
    embedded: Regex,
}

impl ShareLinkScraper {
    pub fn new(host: &str) -> Self {
        let link = format!(
            r"https://www\d{{1,3}}\.{}/v/[a-zA-Z\d]{{8}}/file\.html",
            regex::escape(host)
        );
        Self {
            link: Regex::new(&format!("^{link}$")).expect("valid share link regex"),
            embedded: Regex::new(&format!(r#"value="({link})""#))
                .expect("valid embedded share link regex"),
        }
    }

    /// Prefers the readonly text input holding the link; falls back to a raw
    /// scan of `value="..."` attributes for markup that does not parse cleanly.
    pub fn extract(&self, html: &str) -> Option<String> {
        self.from_inputs(html).or_else(|| {
            self.embedded
                .captures(html)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
    }

    fn from_inputs(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let inputs = Selector::parse("input[value]").ok()?;
        doc.select(&inputs)
            .filter(|input| {
                let element = input.value();
                element.attr("readonly").is_some()
                    || element.attr("onclick").is_some_and(|js| js.contains("select()"))
            })
            .filter_map(|input| input.value().attr("value"))
            .map(str::trim)
            .find(|value| self.link.is_match(value))
            .map(ToOwned::to_owned)
    }
}
