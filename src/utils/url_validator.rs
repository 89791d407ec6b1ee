//! 帧 URL 校验与代理链接构造

use std::sync::OnceLock;

use regex::Regex;

/// 注册时接受的帧地址：仅 https，主机 + 可选路径
fn frame_url_regex() -> &'static Regex {
    static FRAME_URL: OnceLock<Regex> = OnceLock::new();
    FRAME_URL.get_or_init(|| {
        Regex::new(r"^https://([\da-z.-]+)\.([a-z.]{2,6})([/\w .-]*)*/?$")
            .unwrap_or_else(|e| panic!("frame url pattern must compile: {e}"))
    })
}

pub fn is_valid_frame_url(url: &str) -> bool {
    frame_url_regex().is_match(url)
}

/// Root alias link handed out at registration: `{public_url}/a?r={root}`.
pub fn root_link(public_url: &str, root: &str) -> String {
    format!(
        "{}/a?r={}",
        public_url.trim_end_matches('/'),
        urlencoding::encode(root)
    )
}

/// Rewritten action URL: `{public_url}/a?r={root}&n={child}`.
pub fn wrap_url(public_url: &str, root: &str, child: &str) -> String {
    format!(
        "{}/a?r={}&n={}",
        public_url.trim_end_matches('/'),
        urlencoding::encode(root),
        urlencoding::encode(child)
    )
}
