//! `orm` 标签的词法解析
//!
//! 标签语法：`prop1(arg1,arg2);prop2;prop3(arg)`。分号分隔属性，
//! 括号内的逗号分隔参数，词法单元之间的空白不参与语义。解析结果
//! 只是属性调用序列，属性名是否合法由模型编译器判断。

/// 一次属性调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    pub args: Vec<&'a str>,
}

/// 解析整条标签串
///
/// 出错时返回错误描述，字段名由调用方补充。空串与纯空白串返回空序列。
pub fn parse(tag: &str) -> Result<Vec<Tag<'_>>, String> {
    let mut out = Vec::new();

    for segment in split_props(tag)? {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        out.push(parse_prop(segment)?);
    }

    Ok(out)
}

/// 在括号深度为 0 的分号处切分属性
fn split_props(tag: &str) -> Result<Vec<&str>, String> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, ch) in tag.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced `)` in tag `{tag}`"))?;
            }
            ';' if depth == 0 => {
                segments.push(&tag[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(format!("unbalanced `(` in tag `{tag}`"));
    }

    segments.push(&tag[start..]);
    Ok(segments)
}

fn parse_prop(segment: &str) -> Result<Tag<'_>, String> {
    let Some(open) = segment.find('(') else {
        if segment.contains(')') {
            return Err(format!("stray `)` in property `{segment}`"));
        }
        return Ok(Tag {
            name: segment,
            args: Vec::new(),
        });
    };

    let name = segment[..open].trim();
    if name.is_empty() {
        return Err(format!("property name missing in `{segment}`"));
    }

    let rest = segment[open + 1..].trim_end();
    let Some(inner) = rest.strip_suffix(')') else {
        return Err(format!("missing `)` in property `{segment}`"));
    };
    if inner.contains('(') || inner.contains(')') {
        return Err(format!("nested parentheses in property `{segment}`"));
    }

    let args = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(str::trim).collect()
    };

    Ok(Tag { name, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let tags = parse("name(id);ai").unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "name");
        assert_eq!(tags[0].args, vec!["id"]);
        assert_eq!(tags[1].name, "ai");
        assert!(tags[1].args.is_empty());
    }

    #[test]
    fn test_parse_multi_args_and_whitespace() {
        let tags = parse(" fk( fk_name , #groups , id , NO ACTION ) ; len(5, 6) ").unwrap();
        assert_eq!(tags[0].name, "fk");
        assert_eq!(tags[0].args, vec!["fk_name", "#groups", "id", "NO ACTION"]);
        assert_eq!(tags[1].args, vec!["5", "6"]);
    }

    #[test]
    fn test_parse_trailing_semicolon() {
        // 结尾多出的分号不算错误
        let tags = parse("name(id);ai(1,2);").unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[1].args, vec!["1", "2"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  ;; ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_empty_args() {
        let tags = parse("nullable()").unwrap();
        assert!(tags[0].args.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("name(id").is_err());
        assert!(parse("name)id(").is_err());
        assert!(parse("(id)").is_err());
        assert!(parse("fk(a(b))").is_err());
    }
}
