//! Pulls the generated image link out of a chat-completion reply.
//!
//! Image models answer with free text that may contain several links
//! (markdown images, plain URLs, progress links). The last link that looks
//! like an image wins; otherwise the last http(s) link.

use url::Url;

const IMAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".gif", ".webp"];

pub fn extract_image_url(content: &str) -> Option<String> {
    let candidates: Vec<&str> = content
        .split(|c: char| {
            c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '<' | '>' | '"' | '\'')
        })
        .map(|token| token.trim_end_matches(['.', ',', ';', ':', '!', '*']))
        .filter(|token| is_http_url(token))
        .collect();

    candidates
        .iter()
        .rev()
        .find(|url| has_image_extension(url))
        .or_else(|| candidates.last())
        .map(|url| url.to_string())
}

fn is_http_url(token: &str) -> bool {
    matches!(Url::parse(token), Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

fn has_image_extension(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
