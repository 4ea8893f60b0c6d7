//! Entity-name title-case normalization (design §4.6 branch B step b,
//! §8 testable property 13).

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '-'
}

/// Capitalize a lowercase word; leave acronyms, mixed-case words, and
/// digit-only tokens untouched.
fn transform_part(part: &str) -> String {
    if part.is_empty() {
        return part.to_string();
    }
    let has_upper = part.chars().any(|c| c.is_uppercase());
    let has_lower = part.chars().any(|c| c.is_lowercase());

    if has_lower && !has_upper {
        let mut chars = part.chars();
        let first = chars.next().expect("non-empty").to_uppercase().to_string();
        let rest: String = chars.flat_map(|c| c.to_lowercase()).collect();
        format!("{first}{rest}")
    } else {
        part.to_string()
    }
}

/// Split `name` into alternating (part, separator) runs and capitalize
/// each lowercase-only part, preserving every separator exactly.
pub fn normalize(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    let mut tokens: Vec<(String, bool)> = Vec::new(); // (text, is_separator)
    let mut current = String::new();
    let mut current_is_sep: Option<bool> = None;

    for c in name.chars() {
        let c_is_sep = is_separator(c);
        match current_is_sep {
            Some(flag) if flag == c_is_sep => current.push(c),
            Some(flag) => {
                tokens.push((std::mem::take(&mut current), flag));
                current.push(c);
                current_is_sep = Some(c_is_sep);
            }
            None => {
                current.push(c);
                current_is_sep = Some(c_is_sep);
            }
        }
    }
    if let Some(flag) = current_is_sep {
        tokens.push((current, flag));
    }

    tokens
        .into_iter()
        .map(|(text, is_sep)| if is_sep { text } else { transform_part(&text) })
        .collect()
}
