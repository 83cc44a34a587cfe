// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// 许可证表达式规范化接口
pub trait LicenseNormalizer: Send + Sync {
    /// 将提取到的许可证声明转换为 SPDX 表达式，无法识别时返回 None
    fn normalize(&self, statement: &str) -> Option<String>;
}

static KNOWN_LICENSES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("mit", "MIT"),
        ("mit license", "MIT"),
        ("the mit license", "MIT"),
        ("isc", "ISC"),
        ("isc license", "ISC"),
        ("apache-2.0", "Apache-2.0"),
        ("apache 2.0", "Apache-2.0"),
        ("apache 2", "Apache-2.0"),
        ("apache2", "Apache-2.0"),
        ("apache license 2.0", "Apache-2.0"),
        ("apache license, version 2.0", "Apache-2.0"),
        ("apache software license", "Apache-2.0"),
        ("bsd", "BSD-3-Clause"),
        ("bsd-2-clause", "BSD-2-Clause"),
        ("bsd-3-clause", "BSD-3-Clause"),
        ("new bsd license", "BSD-3-Clause"),
        ("simplified bsd license", "BSD-2-Clause"),
        ("gpl", "GPL-2.0-or-later"),
        ("gpl-2.0", "GPL-2.0-only"),
        ("gplv2", "GPL-2.0-only"),
        ("gpl-3.0", "GPL-3.0-only"),
        ("gplv3", "GPL-3.0-only"),
        ("lgpl", "LGPL-2.1-or-later"),
        ("lgpl-2.1", "LGPL-2.1-only"),
        ("lgpl-3.0", "LGPL-3.0-only"),
        ("mpl-2.0", "MPL-2.0"),
        ("mozilla public license 2.0", "MPL-2.0"),
        ("epl-1.0", "EPL-1.0"),
        ("epl-2.0", "EPL-2.0"),
        ("unlicense", "Unlicense"),
        ("the unlicense", "Unlicense"),
        ("cc0-1.0", "CC0-1.0"),
        ("zlib", "Zlib"),
        ("python software foundation license", "PSF-2.0"),
        ("psf", "PSF-2.0"),
        ("artistic-2.0", "Artistic-2.0"),
        ("ruby", "Ruby"),
        ("public domain", "LicenseRef-public-domain"),
    ])
});

static SPLITTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(or|and)\s+|\s*,\s*|\s*/\s*").expect("license splitter is a valid regex")
});

/// 基于常见名称映射表的 SPDX 规范化实现
#[derive(Debug, Default, Clone)]
pub struct SpdxLicenseNormalizer;

impl SpdxLicenseNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn lookup(term: &str) -> Option<String> {
        let cleaned = term
            .trim()
            .trim_matches(|c| c == '(' || c == ')' || c == '"' || c == '\'')
            .trim();
        if cleaned.is_empty() {
            return None;
        }
        KNOWN_LICENSES
            .get(cleaned.to_lowercase().as_str())
            .map(|id| id.to_string())
    }
}

impl LicenseNormalizer for SpdxLicenseNormalizer {
    fn normalize(&self, statement: &str) -> Option<String> {
        let statement = statement.trim();
        if statement.is_empty() {
            return None;
        }
        if let Some(single) = Self::lookup(statement) {
            return Some(single);
        }

        // Compound statement: "MIT or Apache 2.0", "MIT, BSD", "GPL/LGPL"
        let mut terms = Vec::new();
        let mut operators = Vec::new();
        let mut last = 0;
        for captures in SPLITTER.captures_iter(statement) {
            let whole = captures.get(0)?;
            terms.push(&statement[last..whole.start()]);
            let operator = match captures.get(1).map(|m| m.as_str().to_lowercase()) {
                Some(op) if op == "and" => "AND",
                _ => "OR",
            };
            operators.push(operator);
            last = whole.end();
        }
        terms.push(&statement[last..]);
        if terms.len() < 2 {
            return None;
        }

        let ids = terms
            .into_iter()
            .map(Self::lookup)
            .collect::<Option<Vec<_>>>()?;

        let mut expression = ids[0].clone();
        for (id, operator) in ids.iter().skip(1).zip(operators) {
            expression.push(' ');
            expression.push_str(operator);
            expression.push(' ');
            expression.push_str(id);
        }
        Some(expression)
    }
}
