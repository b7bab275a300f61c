/// Split the text between a call's parentheses into its top-level
/// arguments.
///
/// Commas only separate arguments when they sit outside every quoted
/// string and every `()`, `[]` and `{}` group. A quote preceded by an
/// unescaped backslash does not open or close a string. Each argument is
/// trimmed; an empty body yields no arguments.
pub fn split_params(body: &str) -> Vec<String> {
    scan(body).params
}

/// Like [`split_params`], but `None` when the body leaves a quote or a
/// group open (e.g. `'a', {foo: 1`).
pub fn split_balanced(body: &str) -> Option<Vec<String>> {
    let scanned = scan(body);
    scanned.balanced.then_some(scanned.params)
}

struct Scanned {
    params: Vec<String>,
    balanced: bool,
}

fn scan(body: &str) -> Scanned {
    let mut params = Vec::new();
    let mut current = String::new();

    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut parens = 0i32;
    let mut brackets = 0i32;
    let mut braces = 0i32;

    for ch in body.chars() {
        if escaped {
            escaped = false;
            current.push(ch);
            continue;
        }
        if ch == '\\' {
            escaped = true;
            current.push(ch);
            continue;
        }

        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            current.push(ch);
            continue;
        }

        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '(' => parens += 1,
            ')' => parens -= 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            '{' => braces += 1,
            '}' => braces -= 1,
            ',' if parens == 0 && brackets == 0 && braces == 0 => {
                params.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    let last = current.trim();
    if !last.is_empty() {
        params.push(last.to_string());
    }
    Scanned {
        params,
        balanced: quote.is_none() && parens == 0 && brackets == 0 && braces == 0,
    }
}
