//! Meta-tag frame codec
//!
//! Reads and writes the `fc:frame*` / `og:*` `<meta>` tags of a frame page.
//! Only the head tags matter to a frame client, so parsing is a tag scan
//! rather than a full HTML parse.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;
use url::Url;

use super::{Button, ButtonAction, Card, CardError, FrameCodec, MAX_BUTTONS};

static META_TAG_RE: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE_RE: OnceLock<Regex> = OnceLock::new();

fn meta_tag_regex() -> &'static Regex {
    META_TAG_RE.get_or_init(|| {
        // 引号内的 `>` 不结束标签
        Regex::new(r#"(?is)<meta\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
            .unwrap_or_else(|error| panic!("meta tag regex failed to compile: {error}"))
    })
}

fn attribute_regex() -> &'static Regex {
    ATTRIBUTE_RE.get_or_init(|| {
        Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
            .unwrap_or_else(|error| panic!("attribute regex failed to compile: {error}"))
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetaTagCodec;

impl MetaTagCodec {
    pub fn new() -> Self {
        Self
    }

    /// 收集 `property`/`name` → `content`，同名标签取第一个
    fn collect_meta(html: &str) -> HashMap<String, String> {
        let mut tags = HashMap::new();

        for tag in meta_tag_regex().captures_iter(html) {
            let mut key = None;
            let mut content = None;

            for attr in attribute_regex().captures_iter(&tag[1]) {
                let name = attr[1].to_ascii_lowercase();
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .or_else(|| attr.get(4))
                    .map(|m| m.as_str())
                    .unwrap_or_default();

                match name.as_str() {
                    "property" | "name" if key.is_none() => key = Some(value.to_string()),
                    "content" => content = Some(unescape_html(value)),
                    _ => {}
                }
            }

            if let (Some(key), Some(content)) = (key, content) {
                tags.entry(key).or_insert(content);
            }
        }

        tags
    }

    fn parse_buttons(tags: &HashMap<String, String>, base: Option<&Url>) -> Result<Vec<Button>, CardError> {
        let mut indexed: Vec<(usize, String)> = tags
            .iter()
            .filter_map(|(key, value)| {
                let rest = key.strip_prefix("fc:frame:button:")?;
                let index = rest.parse::<usize>().ok()?;
                Some((index, value.clone()))
            })
            .collect();
        indexed.sort_by_key(|(index, _)| *index);

        if indexed.len() > MAX_BUTTONS {
            return Err(CardError::Malformed(format!(
                "{} buttons, at most {} allowed",
                indexed.len(),
                MAX_BUTTONS
            )));
        }

        let mut buttons = Vec::with_capacity(indexed.len());
        for (position, (index, label)) in indexed.into_iter().enumerate() {
            // 按钮编号必须从 1 开始连续
            if index != position + 1 {
                return Err(CardError::Malformed(format!(
                    "button index {} out of sequence",
                    index
                )));
            }
            if label.trim().is_empty() {
                return Err(CardError::Malformed(format!("button {} has no label", index)));
            }

            let action = match tags.get(&format!("fc:frame:button:{}:action", index)) {
                Some(raw) => raw.parse::<ButtonAction>().map_err(|_| {
                    CardError::Malformed(format!("button {} has unknown action '{}'", index, raw))
                })?,
                None => ButtonAction::Post,
            };

            let target = tags
                .get(&format!("fc:frame:button:{}:target", index))
                .map(|raw| {
                    // mint 的 target 是 CAIP-10 地址，不做 URL 解析
                    if action == ButtonAction::Mint {
                        raw.clone()
                    } else {
                        resolve_url(base, raw)
                    }
                });
            if action.requires_target() && target.is_none() {
                return Err(CardError::Malformed(format!(
                    "button {} ({}) requires a target",
                    index,
                    action.as_ref()
                )));
            }

            let post_url = tags
                .get(&format!("fc:frame:button:{}:post_url", index))
                .map(|raw| resolve_url(base, raw));

            buttons.push(Button {
                label,
                action,
                target,
                post_url,
            });
        }

        Ok(buttons)
    }
}

impl FrameCodec for MetaTagCodec {
    fn parse_card(&self, html: &str, base_url: &str) -> Result<Card, CardError> {
        let tags = Self::collect_meta(html);

        let version = tags.get("fc:frame").cloned().ok_or(CardError::NotAFrame)?;
        let image = tags
            .get("fc:frame:image")
            .cloned()
            .filter(|image| !image.is_empty())
            .ok_or_else(|| CardError::Malformed("missing fc:frame:image".to_string()))?;

        let base = Url::parse(base_url).ok();
        let post_url = tags
            .get("fc:frame:post_url")
            .map(|raw| resolve_url(base.as_ref(), raw))
            .unwrap_or_else(|| base_url.to_string());

        let buttons = Self::parse_buttons(&tags, base.as_ref())?;

        trace!(
            "Parsed frame card from {} with {} buttons",
            base_url,
            buttons.len()
        );

        Ok(Card {
            version,
            image,
            image_aspect_ratio: tags.get("fc:frame:image:aspect_ratio").cloned(),
            post_url,
            buttons,
            input_text: tags.get("fc:frame:input:text").cloned(),
            state: tags.get("fc:frame:state").cloned(),
            title: tags.get("og:title").cloned(),
            og_image: tags.get("og:image").cloned(),
        })
    }

    fn render_card(&self, card: &Card) -> String {
        let mut html = String::from("<!DOCTYPE html><html><head>");

        if let Some(title) = &card.title {
            let _ = write!(html, "<title>{}</title>", escape_html(title));
            push_meta(&mut html, "og:title", title);
        }
        push_meta(
            &mut html,
            "og:image",
            card.og_image.as_deref().unwrap_or(&card.image),
        );
        push_meta(&mut html, "fc:frame", &card.version);
        push_meta(&mut html, "fc:frame:image", &card.image);
        if let Some(ratio) = &card.image_aspect_ratio {
            push_meta(&mut html, "fc:frame:image:aspect_ratio", ratio);
        }
        push_meta(&mut html, "fc:frame:post_url", &card.post_url);
        if let Some(input) = &card.input_text {
            push_meta(&mut html, "fc:frame:input:text", input);
        }
        if let Some(state) = &card.state {
            push_meta(&mut html, "fc:frame:state", state);
        }

        for (i, button) in card.buttons.iter().enumerate() {
            let index = i + 1;
            push_meta(&mut html, &format!("fc:frame:button:{}", index), &button.label);
            push_meta(
                &mut html,
                &format!("fc:frame:button:{}:action", index),
                button.action.as_ref(),
            );
            if let Some(target) = &button.target {
                push_meta(&mut html, &format!("fc:frame:button:{}:target", index), target);
            }
            if let Some(post_url) = &button.post_url {
                push_meta(
                    &mut html,
                    &format!("fc:frame:button:{}:post_url", index),
                    post_url,
                );
            }
        }

        html.push_str("</head><body></body></html>");
        html
    }
}

fn push_meta(html: &mut String, property: &str, content: &str) {
    let _ = write!(
        html,
        r#"<meta property="{}" content="{}"/>"#,
        property,
        escape_html(content)
    );
}

fn resolve_url(base: Option<&Url>, raw: &str) -> String {
    match base.and_then(|b| b.join(raw).ok()) {
        Some(url) => url.to_string(),
        None => raw.to_string(),
    }
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_html(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    // &amp; 最后处理，避免二次解码
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
