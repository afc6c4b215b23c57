//! パスパターン
//!
//! Unix風のパステンプレートをアンカー付き正規表現にコンパイルする。
//! リテラルセグメント、名前付き可変セグメント `{name}`、正規表現制約付き
//! セグメント `{name:[0-9]+}` をサポートする。

use std::collections::HashMap;

use regex::Regex;

use crate::error::Error;

/// コンパイル済みパスパターン
#[derive(Debug)]
pub struct PathPattern {
    template: String,
    regex: Regex,
}

impl PathPattern {
    /// テンプレートをパースしてコンパイルする
    ///
    /// 生成される正規表現は必ず `^...$` でアンカーされる。
    /// 不正なテンプレート（空、括弧の不整合、無効なセグメント名・制約）は
    /// 登録時点でエラーになる。
    pub fn parse(template: &str) -> Result<Self, Error> {
        if template.is_empty() {
            return Err(Error::InvalidRoutePattern(
                "empty path template is not allowed".to_string(),
            ));
        }

        let mut pattern = String::from("^");
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();

                    // 対応する'}'までを切り出す（制約内の入れ子括弧も考慮）
                    let mut segment = String::new();
                    let mut depth = 1;
                    for inner in chars.by_ref() {
                        match inner {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        segment.push(inner);
                    }
                    if depth != 0 {
                        return Err(Error::InvalidRoutePattern(format!(
                            "unbalanced braces in template: {}",
                            template
                        )));
                    }

                    let (name, constraint) = match segment.split_once(':') {
                        Some((name, constraint)) => (name, Some(constraint)),
                        None => (segment.as_str(), None),
                    };
                    if !is_valid_param_name(name) {
                        return Err(Error::InvalidRoutePattern(format!(
                            "invalid parameter name: {:?}",
                            name
                        )));
                    }

                    pattern.push_str("(?P<");
                    pattern.push_str(name);
                    pattern.push('>');
                    pattern.push_str(constraint.unwrap_or("[^/]+"));
                    pattern.push(')');
                }
                '}' => {
                    return Err(Error::InvalidRoutePattern(format!(
                        "unbalanced braces in template: {}",
                        template
                    )));
                }
                _ => literal.push(c),
            }
        }
        pattern.push_str(&regex::escape(&literal));
        pattern.push('$');

        let regex = Regex::new(&pattern)
            .map_err(|e| Error::InvalidRoutePattern(format!("{}: {}", template, e)))?;

        Ok(Self {
            template: template.to_string(),
            regex,
        })
    }

    /// パスがパターンに一致する場合、抽出したパラメータを返す
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;
        let mut params = HashMap::new();
        for name in self.regex.capture_names().flatten() {
            if let Some(value) = captures.name(name) {
                params.insert(name.to_string(), value.as_str().to_string());
            }
        }
        Some(params)
    }

    /// 元のテンプレート文字列
    pub fn template(&self) -> &str {
        &self.template
    }
}

/// パラメータ名が正規表現のキャプチャ名として有効か
fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
