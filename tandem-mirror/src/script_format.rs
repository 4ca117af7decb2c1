//! Re-indents intercepted scripts so they are readable in the mirror.
//!
//! Line breaks are added after `{`, `;` and `}` and blocks are indented;
//! strings, template literals, comments and regular expressions are copied
//! verbatim. Existing line breaks are kept because statement boundaries
//! may depend on them. Anything the scanner cannot delimit is an error,
//! and the cache then serves the body untouched.
use crate::intercept::{ContentTransform, InterceptError};

/// Words after which a `/` starts a regular expression rather than a division.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "case", "do", "else", "in", "of", "new", "delete", "void",
    "throw", "yield", "await",
];

/// Words that stay on the line of the `}` before them.
const BLOCK_CONTINUATIONS: &[&str] = &["else", "catch", "finally", "while"];

pub struct ScriptFormatter {
    indent: usize,
}

impl ScriptFormatter {
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }
}

impl Default for ScriptFormatter {
    fn default() -> Self {
        Self::new(2)
    }
}

impl ContentTransform for ScriptFormatter {
    fn transform(&self, body: &[u8], _mime: &str) -> Result<Vec<u8>, InterceptError> {
        let source = std::str::from_utf8(body)
            .map_err(|err| InterceptError::Transform(format!("script is not utf-8: {err}")))?;
        Ok(Printer::new(self.indent).run(source)?.into_bytes())
    }
}

/// Separation owed before the next token, widest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Gap {
    None,
    Space,
    AfterBlock,
    Newline,
}

struct Printer {
    out: String,
    unit: usize,
    depth: usize,
    brackets: usize,
    gap: Gap,
    prev: Option<char>,
    word: String,
}

impl Printer {
    fn new(unit: usize) -> Self {
        Self {
            out: String::new(),
            unit,
            depth: 0,
            brackets: 0,
            gap: Gap::None,
            prev: None,
            word: String::new(),
        }
    }

    fn run(mut self, source: &str) -> Result<String, InterceptError> {
        let chars: Vec<char> = source.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            if c.is_whitespace() {
                let start = i;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                let gap = if chars[start..i].contains(&'\n') {
                    Gap::Newline
                } else {
                    Gap::Space
                };
                self.gap = self.gap.max(gap);
                continue;
            }

            let end = match c {
                '"' | '\'' => {
                    let end = quoted_end(&chars, i)?;
                    self.emit(&collect(&chars[i..end]));
                    end
                }
                '`' => {
                    let end = template_end(&chars, i)?;
                    self.emit(&collect(&chars[i..end]));
                    end
                }
                '/' if next == Some('/') => {
                    let end = chars[i..]
                        .iter()
                        .position(|&ch| ch == '\n')
                        .map_or(chars.len(), |offset| i + offset);
                    self.emit_comment(&collect(&chars[i..end]));
                    end
                }
                '/' if next == Some('*') => {
                    let end = block_comment_end(&chars, i)?;
                    self.emit_comment(&collect(&chars[i..end]));
                    end
                }
                '/' if self.regex_allowed() => {
                    let end = regex_end(&chars, i)?;
                    self.emit(&collect(&chars[i..end]));
                    end
                }
                '{' => {
                    if matches!(self.prev, Some(p) if p == ')' || is_word_char(p))
                        && self.gap < Gap::AfterBlock
                    {
                        self.gap = self.gap.max(Gap::Space);
                    }
                    self.emit("{");
                    self.depth += 1;
                    self.gap = Gap::Newline;
                    i + 1
                }
                '}' => {
                    self.depth = self.depth.checked_sub(1).ok_or_else(|| {
                        InterceptError::Transform("unbalanced closing brace".into())
                    })?;
                    self.gap = Gap::Newline;
                    self.emit("}");
                    self.gap = Gap::AfterBlock;
                    i + 1
                }
                ';' => {
                    self.emit(";");
                    if self.brackets == 0 {
                        self.gap = Gap::Newline;
                    }
                    i + 1
                }
                c if is_word_char(c) => {
                    let end = chars[i..]
                        .iter()
                        .position(|&ch| !is_word_char(ch))
                        .map_or(chars.len(), |offset| i + offset);
                    self.emit(&collect(&chars[i..end]));
                    end
                }
                c => {
                    match c {
                        '(' | '[' => self.brackets += 1,
                        ')' | ']' => self.brackets = self.brackets.saturating_sub(1),
                        _ => {}
                    }
                    self.emit(c.encode_utf8(&mut [0; 4]));
                    i + 1
                }
            };
            i = end;
        }

        if self.depth != 0 {
            return Err(InterceptError::Transform(format!(
                "{} unclosed brace(s)",
                self.depth
            )));
        }
        self.newline();
        Ok(self.out)
    }

    fn emit(&mut self, token: &str) {
        self.separate(token);
        self.out.push_str(token);
        self.prev = token.chars().last();
        self.word = if token.chars().all(is_word_char) {
            token.to_string()
        } else {
            String::new()
        };
    }

    /// Comments do not change how a following `/` is read.
    fn emit_comment(&mut self, comment: &str) {
        self.separate(comment);
        self.out.push_str(comment);
    }

    fn separate(&mut self, token: &str) {
        let gap = std::mem::replace(&mut self.gap, Gap::None);
        match gap {
            Gap::Newline => self.newline(),
            Gap::AfterBlock if token.starts_with(&[',', ';', ')', ']', '.'][..]) => {}
            Gap::AfterBlock if BLOCK_CONTINUATIONS.contains(&token) => self.out.push(' '),
            Gap::AfterBlock => self.newline(),
            Gap::Space if !self.at_line_start() => self.out.push(' '),
            Gap::Space | Gap::None => {}
        }
        if self.at_line_start() {
            let width = self.depth * self.unit;
            self.out.extend(std::iter::repeat(' ').take(width));
        }
    }

    fn newline(&mut self) {
        let trimmed = self.out.trim_end_matches(' ').len();
        self.out.truncate(trimmed);
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn regex_allowed(&self) -> bool {
        match self.prev {
            None => true,
            Some(p) if is_word_char(p) => EXPRESSION_KEYWORDS.contains(&self.word.as_str()),
            Some(p) => !matches!(p, ')' | ']' | '"' | '\'' | '`'),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

fn unterminated(what: &str) -> InterceptError {
    InterceptError::Transform(format!("unterminated {what}"))
}

fn quoted_end(chars: &[char], start: usize) -> Result<usize, InterceptError> {
    let quote = chars[start];
    let mut j = start + 1;
    while let Some(&c) = chars.get(j) {
        match c {
            '\\' => j += 2,
            '\n' => break,
            c if c == quote => return Ok(j + 1),
            _ => j += 1,
        }
    }
    Err(unterminated("string literal"))
}

fn template_end(chars: &[char], start: usize) -> Result<usize, InterceptError> {
    let mut j = start + 1;
    let mut substitution = 0usize;
    while let Some(&c) = chars.get(j) {
        match c {
            '\\' => j += 2,
            '`' if substitution == 0 => return Ok(j + 1),
            '`' => {
                return Err(InterceptError::Transform(
                    "nested template literal".into(),
                ))
            }
            '$' if substitution == 0 && chars.get(j + 1) == Some(&'{') => {
                substitution = 1;
                j += 2;
            }
            '{' if substitution > 0 => {
                substitution += 1;
                j += 1;
            }
            '}' if substitution > 0 => {
                substitution -= 1;
                j += 1;
            }
            _ => j += 1,
        }
    }
    Err(unterminated("template literal"))
}

fn block_comment_end(chars: &[char], start: usize) -> Result<usize, InterceptError> {
    (start + 2..chars.len())
        .find(|&j| chars[j] == '*' && chars.get(j + 1) == Some(&'/'))
        .map(|j| j + 2)
        .ok_or_else(|| unterminated("comment"))
}

fn regex_end(chars: &[char], start: usize) -> Result<usize, InterceptError> {
    let mut j = start + 1;
    let mut in_class = false;
    while let Some(&c) = chars.get(j) {
        match c {
            '\\' => j += 2,
            '\n' => break,
            '[' => {
                in_class = true;
                j += 1;
            }
            ']' => {
                in_class = false;
                j += 1;
            }
            '/' if !in_class => return Ok(j + 1),
            _ => j += 1,
        }
    }
    Err(unterminated("regular expression"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(source: &str) -> Result<String, InterceptError> {
        let out = ScriptFormatter::default().transform(source.as_bytes(), "text/javascript")?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn blocks_are_broken_and_indented() {
        assert_eq!(
            format("function f(a){if(a){return 1;}return 2;}").unwrap(),
            "function f(a) {\n  if(a) {\n    return 1;\n  }\n  return 2;\n}\n"
        );
    }

    #[test]
    fn closing_braces_keep_their_continuations() {
        assert_eq!(
            format("if(a){b()}else{c()}").unwrap(),
            "if(a) {\n  b()\n} else {\n  c()\n}\n"
        );
        assert_eq!(
            format("f(function(){x()});").unwrap(),
            "f(function() {\n  x()\n});\n"
        );
    }

    #[test]
    fn loop_headers_stay_on_one_line() {
        assert_eq!(
            format("for(var i=0;i<3;i++){x+=i;}").unwrap(),
            "for(var i=0;i<3;i++) {\n  x+=i;\n}\n"
        );
    }

    #[test]
    fn literals_and_comments_are_copied_verbatim() {
        assert_eq!(
            format(r#"var s="{;}";var t='a\'{';var r=/[;{]/g;/* {; */"#).unwrap(),
            "var s=\"{;}\";\nvar t='a\\'{';\nvar r=/[;{]/g;\n/* {; */\n"
        );
        assert_eq!(
            format("var u=`a${b({c:1})}{;}`;").unwrap(),
            "var u=`a${b({c:1})}{;}`;\n"
        );
    }

    #[test]
    fn division_is_not_read_as_a_pattern() {
        assert_eq!(format("a=b/c;d=e/f;").unwrap(), "a=b/c;\nd=e/f;\n");
        assert_eq!(format("return /x;/.test(y)").unwrap(), "return /x;/.test(y)\n");
    }

    #[test]
    fn existing_line_breaks_are_kept() {
        assert_eq!(format("a=1\nb=2").unwrap(), "a=1\nb=2\n");
    }

    #[test]
    fn undelimited_input_is_rejected() {
        assert!(format("var s='open;").is_err());
        assert!(format("function f(){").is_err());
        assert!(format("}").is_err());
        assert!(format("x=`a${`b`}`").is_err());
    }
}
