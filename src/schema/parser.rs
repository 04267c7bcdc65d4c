use super::node::{Join, SchemaNode};
use crate::error::{MapperError, MapperResult};

const INDENT_STEP: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberType {
    Value,
    Struct,
    List,
    Dict,
}

/// One `name: type [variable] [for (...) (...)]` line.
#[derive(Debug)]
struct DeclarationLine {
    line: usize,
    indent: usize,
    name: String,
    member_type: MemberType,
    variable: Option<String>,
    join: Option<Join>,
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    Open,
    Close,
}

/// Parse a schema declaration into a schema tree
///
/// Each line declares one member:
///
/// ```text
/// items: list for (c d) (bar c d)
///     _val_: struct
///         c: value c
///         s: struct for (a b) (foo a b c)
///             a: value a
/// ```
///
/// Children are indented four spaces deeper than their parent. Top-level
/// members form a join-less root record.
///
/// # Errors
///
/// Returns a `Declaration` error naming the offending line if:
/// - indentation is wrong or uses tabs
/// - a member type is unknown or unsupported
/// - a `for` clause is malformed
/// - a list or dict lacks its `_val_`/`_key_` children
pub fn parse_schema(text: &str) -> MapperResult<SchemaNode> {
    let mut lines = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines.push(parse_line(raw, i + 1)?);
    }
    if lines.is_empty() {
        return Err(MapperError::declaration(1, "declaration has no members"));
    }

    let mut pos = 0;
    let members = parse_block(&lines, &mut pos, 0)?;
    if let Some(line) = lines.get(pos) {
        return Err(MapperError::declaration(line.line, "unexpected indentation"));
    }
    Ok(SchemaNode::record(members))
}

fn parse_line(raw: &str, line: usize) -> MapperResult<DeclarationLine> {
    let indent = raw.chars().take_while(|c| *c == ' ').count();
    let rest = &raw[indent..];
    if rest.starts_with('\t') {
        return Err(MapperError::declaration(line, "tabs are not allowed for indentation"));
    }

    let (name, rest) = rest
        .split_once(':')
        .ok_or_else(|| MapperError::declaration(line, "expected a \"member: declaration\" line"))?;
    if !is_identifier(name) {
        return Err(MapperError::declaration(
            line,
            format!("invalid member name \"{}\"", name),
        ));
    }
    let rest = rest
        .strip_prefix(' ')
        .ok_or_else(|| MapperError::declaration(line, "expected a space after ':'"))?;

    let tokens = tokenize(rest, line)?;
    let mut tokens = tokens.into_iter().peekable();

    let member_type = match tokens.next() {
        Some(Token::Word(word)) => parse_member_type(&word, line)?,
        _ => return Err(MapperError::declaration(line, "expected a member type")),
    };

    let variable = if member_type == MemberType::Value {
        match tokens.next() {
            Some(Token::Word(word)) if word != "for" && is_identifier(&word) => Some(word),
            _ => return Err(MapperError::declaration(line, "value member needs a variable")),
        }
    } else {
        None
    };

    let join = match tokens.next() {
        None => None,
        Some(Token::Word(word)) if word == "for" => {
            let fresh = parse_list(&mut tokens, line)?;
            let mut clause = parse_list(&mut tokens, line)?;
            if clause.is_empty() {
                return Err(MapperError::declaration(line, "empty table clause"));
            }
            let table = clause.remove(0);
            Some(Join {
                table,
                columns: clause,
                fresh,
            })
        }
        Some(_) => return Err(MapperError::declaration(line, "expected \"for\" clause")),
    };
    if tokens.next().is_some() {
        return Err(MapperError::declaration(line, "unexpected text after declaration"));
    }

    Ok(DeclarationLine {
        line,
        indent,
        name: name.to_string(),
        member_type,
        variable,
        join,
    })
}

fn parse_member_type(word: &str, line: usize) -> MapperResult<MemberType> {
    match word {
        "value" => Ok(MemberType::Value),
        "struct" => Ok(MemberType::Struct),
        "list" => Ok(MemberType::List),
        "dict" => Ok(MemberType::Dict),
        "set" | "option" | "reference" => Err(MapperError::declaration(
            line,
            format!("member type \"{}\" is not supported", word),
        )),
        _ => Err(MapperError::declaration(
            line,
            format!(
                "not a valid member type: \"{}\". Valid types are: value struct list dict",
                word
            ),
        )),
    }
}

fn tokenize(text: &str, line: usize) -> MapperResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in text.chars() {
        match c {
            '(' | ')' | ' ' => {
                if !word.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut word)));
                }
                match c {
                    '(' => tokens.push(Token::Open),
                    ')' => tokens.push(Token::Close),
                    _ => {}
                }
            }
            c if c.is_ascii_alphanumeric() || c == '_' => word.push(c),
            other => {
                return Err(MapperError::declaration(
                    line,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    Ok(tokens)
}

fn parse_list<I>(tokens: &mut std::iter::Peekable<I>, line: usize) -> MapperResult<Vec<String>>
where
    I: Iterator<Item = Token>,
{
    if tokens.next() != Some(Token::Open) {
        return Err(MapperError::declaration(line, "expected '('"));
    }
    let mut names = Vec::new();
    loop {
        match tokens.next() {
            Some(Token::Close) => return Ok(names),
            Some(Token::Word(word)) if is_identifier(&word) => names.push(word),
            _ => return Err(MapperError::declaration(line, "expected identifier or ')'")),
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn parse_block(
    lines: &[DeclarationLine],
    pos: &mut usize,
    indent: usize,
) -> MapperResult<Vec<(String, SchemaNode)>> {
    let mut members: Vec<(String, SchemaNode)> = Vec::new();
    while let Some(decl) = lines.get(*pos) {
        if decl.indent < indent {
            break;
        }
        if decl.indent > indent {
            return Err(MapperError::declaration(
                decl.line,
                format!("wrong amount of indentation (need {})", indent),
            ));
        }
        if members.iter().any(|(name, _)| *name == decl.name) {
            return Err(MapperError::declaration(
                decl.line,
                format!("member \"{}\" declared twice", decl.name),
            ));
        }
        *pos += 1;

        let node = match decl.member_type {
            MemberType::Value => {
                let variable = decl.variable.as_deref().unwrap_or_default();
                let node = SchemaNode::scalar(variable);
                match &decl.join {
                    Some(join) => node.with_join(join.clone()),
                    None => node,
                }
            }
            MemberType::Struct => {
                let children = parse_block(lines, pos, indent + INDENT_STEP)?;
                if let Some((name, _)) = children.iter().find(|(name, _)| name.starts_with('_')) {
                    return Err(MapperError::declaration(
                        decl.line,
                        format!("struct member \"{}\" must not start with underscore", name),
                    ));
                }
                SchemaNode::Record {
                    members: children,
                    join: decl.join.clone(),
                }
            }
            MemberType::List => {
                let join = required_join(decl)?;
                let mut children = parse_block(lines, pos, indent + INDENT_STEP)?;
                let element = take_only(&mut children, &["_val_"], decl)?.remove(0);
                SchemaNode::sequence(element, join)
            }
            MemberType::Dict => {
                let join = required_join(decl)?;
                let mut children = parse_block(lines, pos, indent + INDENT_STEP)?;
                let mut parts = take_only(&mut children, &["_key_", "_val_"], decl)?;
                let value = parts.remove(1);
                let key = parts.remove(0);
                SchemaNode::mapping(key, value, join)
            }
        };
        members.push((decl.name.clone(), node));
    }
    Ok(members)
}

fn required_join(decl: &DeclarationLine) -> MapperResult<Join> {
    decl.join.clone().ok_or_else(|| {
        MapperError::declaration(
            decl.line,
            format!("member \"{}\" needs a \"for\" clause", decl.name),
        )
    })
}

/// Takes exactly the pseudo-members `names`, in that order.
fn take_only(
    children: &mut Vec<(String, SchemaNode)>,
    names: &[&str],
    decl: &DeclarationLine,
) -> MapperResult<Vec<SchemaNode>> {
    let wrong = || {
        MapperError::declaration(
            decl.line,
            format!("member \"{}\" needs exactly the children {}", decl.name, names.join(" ")),
        )
    };
    if children.len() != names.len() {
        return Err(wrong());
    }
    let mut nodes = Vec::with_capacity(names.len());
    for name in names {
        let at = children.iter().position(|(n, _)| n == name).ok_or_else(wrong)?;
        nodes.push(children.remove(at).1);
    }
    Ok(nodes)
}
