// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 计算URI的规范形式
///
/// 小写 scheme 和 host，去掉默认端口、片段和空查询，并按键排序查询参数。
/// 无法解析的输入只做首尾空白裁剪。
pub fn canonicalize(uri: &str) -> String {
    let trimmed = uri.trim();
    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => return trimmed.to_string(),
    };

    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        pairs.sort();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    url.to_string()
}

/// 提取URI的主机名，用于按主机限速
pub fn host_of(uri: &str) -> Option<String> {
    Url::parse(uri)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_url() {
        let base = Url::parse("http://example.com/a/b").unwrap();
        assert_eq!(
            resolve_url(&base, "c").unwrap().as_str(),
            "http://example.com/a/c"
        );
    }

    #[test]
    fn test_canonicalize_lowercases_and_drops_default_port() {
        assert_eq!(
            canonicalize("HTTPS://Repo1.Maven.ORG:443/maven2/"),
            "https://repo1.maven.org/maven2/"
        );
    }

    #[test]
    fn test_canonicalize_sorts_query_and_drops_fragment() {
        assert_eq!(
            canonicalize("http://x.org/p?b=2&a=1#top"),
            "http://x.org/p?a=1&b=2"
        );
        assert_eq!(canonicalize("http://x.org/p?"), "http://x.org/p");
    }

    #[test]
    fn test_canonicalize_keeps_unparsable_input() {
        assert_eq!(canonicalize("  not a uri "), "not a uri");
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://PyPI.org/simple"), Some("pypi.org".to_string()));
        assert_eq!(host_of("garbage"), None);
    }
}
