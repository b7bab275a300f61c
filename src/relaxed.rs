use serde_json::{Map, Number, Value};

/// Parse a relaxed object/array literal into a JSON value.
///
/// A superset of JSON: keys may be bare identifiers or numbers, strings may
/// use `'`, `"` or backticks, trailing commas are allowed, numbers may carry
/// a leading `+` or start with `.`, `//` and `/* */` comments count as
/// whitespace, and `undefined` is a value (dropped from objects, `null` in
/// arrays). Nothing is evaluated; only data comes out.
pub fn parse(input: &str) -> Result<Value, String> {
    let mut p = RelaxedParser {
        input,
        pos: 0,
        depth: 0,
    };
    let value = match p.parse_value()? {
        Literal::Value(v) => v,
        Literal::Undefined => return Err("Top-level undefined".to_string()),
    };
    p.skip_ws()?;
    if p.pos < p.input.len() {
        return Err(format!("Trailing content at position {}", p.pos));
    }
    Ok(value)
}

enum Literal {
    Value(Value),
    Undefined,
}

/// Nesting limit for objects and arrays, the same as serde_json's.
const MAX_DEPTH: usize = 128;

struct RelaxedParser<'a> {
    input: &'a str,
    pos: usize,
    /// Number of currently open objects and arrays
    depth: usize,
}

impl<'a> RelaxedParser<'a> {
    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) -> Result<(), String> {
        loop {
            while let Some(ch) = self.peek_char() {
                if ch.is_whitespace() {
                    self.pos += ch.len_utf8();
                } else {
                    break;
                }
            }
            if self.remaining().starts_with("//") {
                match self.remaining().find('\n') {
                    Some(i) => self.pos += i + 1,
                    None => self.pos = self.input.len(),
                }
            } else if self.remaining().starts_with("/*") {
                match self.remaining()[2..].find("*/") {
                    Some(i) => self.pos += i + 4,
                    None => return Err("Unterminated comment".to_string()),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn peek(&mut self) -> Result<Option<char>, String> {
        self.skip_ws()?;
        Ok(self.peek_char())
    }

    fn expect(&mut self, ch: char) -> Result<(), String> {
        match self.peek()? {
            Some(c) if c == ch => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(format!(
                "Expected '{}' at position {}, found '{}'",
                ch, self.pos, c
            )),
            None => Err(format!("Expected '{}' at position {}, found EOF", ch, self.pos)),
        }
    }

    fn parse_value(&mut self) -> Result<Literal, String> {
        match self.peek()? {
            Some('{') => self.parse_object().map(Literal::Value),
            Some('[') => self.parse_array().map(Literal::Value),
            Some(q @ ('"' | '\'' | '`')) => self.parse_string(q).map(|s| Literal::Value(Value::String(s))),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                self.parse_number().map(|n| Literal::Value(Value::Number(n)))
            }
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                let word = self.parse_identifier();
                match word {
                    "true" => Ok(Literal::Value(Value::Bool(true))),
                    "false" => Ok(Literal::Value(Value::Bool(false))),
                    "null" => Ok(Literal::Value(Value::Null)),
                    "undefined" => Ok(Literal::Undefined),
                    other => Err(format!("Unexpected identifier '{}' at position {}", other, start)),
                }
            }
            Some(c) => Err(format!("Unexpected character '{}' at position {}", c, self.pos)),
            None => Err("Unexpected end of input".to_string()),
        }
    }

    fn enter(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(format!("Nesting deeper than {} at position {}", MAX_DEPTH, self.pos));
        }
        Ok(())
    }

    fn parse_object(&mut self) -> Result<Value, String> {
        self.expect('{')?;
        self.enter()?;
        let mut map = Map::new();
        loop {
            if self.peek()? == Some('}') {
                self.pos += 1;
                self.depth -= 1;
                return Ok(Value::Object(map));
            }
            let key = self.parse_key()?;
            self.expect(':')?;
            if let Literal::Value(v) = self.parse_value()? {
                map.insert(key, v);
            }
            match self.peek()? {
                Some(',') => self.pos += 1,
                Some('}') => {}
                Some(c) => {
                    return Err(format!(
                        "Expected ',' or '}}' at position {}, found '{}'",
                        self.pos, c
                    ))
                }
                None => return Err("Unterminated object".to_string()),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, String> {
        match self.peek()? {
            Some(q @ ('"' | '\'' | '`')) => self.parse_string(q),
            Some(c) if is_ident_start(c) => Ok(self.parse_identifier().to_string()),
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let n = self.parse_number()?;
                Ok(crate::coerce::CoercedValue::Number(n).to_key_string())
            }
            Some(c) => Err(format!("Invalid object key start '{}' at position {}", c, self.pos)),
            None => Err("Unterminated object".to_string()),
        }
    }

    fn parse_array(&mut self) -> Result<Value, String> {
        self.expect('[')?;
        self.enter()?;
        let mut items = Vec::new();
        loop {
            if self.peek()? == Some(']') {
                self.pos += 1;
                self.depth -= 1;
                return Ok(Value::Array(items));
            }
            match self.parse_value()? {
                Literal::Value(v) => items.push(v),
                Literal::Undefined => items.push(Value::Null),
            }
            match self.peek()? {
                Some(',') => self.pos += 1,
                Some(']') => {}
                Some(c) => {
                    return Err(format!(
                        "Expected ',' or ']' at position {}, found '{}'",
                        self.pos, c
                    ))
                }
                None => return Err("Unterminated array".to_string()),
            }
        }
    }

    fn parse_identifier(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn parse_string(&mut self, quote: char) -> Result<String, String> {
        self.expect(quote)?;
        let mut s = String::new();
        while let Some(ch) = self.bump() {
            if ch == quote {
                return Ok(s);
            }
            if ch != '\\' {
                s.push(ch);
                continue;
            }
            let esc = self
                .bump()
                .ok_or_else(|| "Unexpected end of input in string escape".to_string())?;
            match esc {
                'n' => s.push('\n'),
                'r' => s.push('\r'),
                't' => s.push('\t'),
                'b' => s.push('\u{0008}'),
                'f' => s.push('\u{000C}'),
                'v' => s.push('\u{000B}'),
                '0' => s.push('\0'),
                'u' => s.push(self.parse_unicode_escape()?),
                'x' => {
                    let code = self.parse_hex(2)?;
                    s.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                // Line continuation
                '\n' => {}
                // Any other escaped character stands for itself
                other => s.push(other),
            }
        }
        Err("Unterminated string".to_string())
    }

    fn parse_unicode_escape(&mut self) -> Result<char, String> {
        if self.peek_char() == Some('{') {
            self.pos += 1;
            let end = self
                .remaining()
                .find('}')
                .ok_or_else(|| "Unterminated \\u{} escape".to_string())?;
            let hex = &self.remaining()[..end];
            let cp = u32::from_str_radix(hex, 16)
                .map_err(|_| format!("Invalid hex in \\u escape: {}", hex))?;
            self.pos += end + 1;
            return Ok(char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER));
        }

        let cp = self.parse_hex(4)?;
        if (0xD800..=0xDBFF).contains(&cp) && self.remaining().starts_with("\\u") {
            let saved = self.pos;
            self.pos += 2;
            let low = self.parse_hex(4)?;
            if (0xDC00..=0xDFFF).contains(&low) {
                let combined = 0x10000 + ((cp - 0xD800) << 10) + (low - 0xDC00);
                return Ok(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            self.pos = saved;
        }
        Ok(char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn parse_hex(&mut self, digits: usize) -> Result<u32, String> {
        let hex = self
            .remaining()
            .get(..digits)
            .ok_or_else(|| "Unexpected end of input in escape".to_string())?;
        let val = u32::from_str_radix(hex, 16).map_err(|_| format!("Invalid hex escape: {}", hex))?;
        self.pos += digits;
        Ok(val)
    }

    fn parse_number(&mut self) -> Result<Number, String> {
        self.skip_ws()?;
        let start = self.pos;
        if matches!(self.peek_char(), Some('+' | '-')) {
            self.pos += 1;
        }
        let int_start = self.pos;
        self.consume_digits();
        let mut integral = true;
        if self.peek_char() == Some('.') {
            integral = false;
            self.pos += 1;
            self.consume_digits();
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            integral = false;
            self.pos += 1;
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.pos += 1;
            }
            self.consume_digits();
        }

        let text = &self.input[start..self.pos];
        let digits = &self.input[int_start..self.pos];
        if digits.is_empty() || digits == "." {
            return Err(format!("Invalid number at position {}", start));
        }
        let text = text.strip_prefix('+').unwrap_or(text);

        if integral {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Number::from(i));
            }
        }
        let f: f64 = text
            .parse()
            .map_err(|_| format!("Invalid number '{}' at position {}", text, start))?;
        Number::from_f64(f).ok_or_else(|| format!("Non-finite number '{}' at position {}", text, start))
    }

    fn consume_digits(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
