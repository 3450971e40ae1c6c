//! Stateless case-conversion helpers exposed to templates and computed variables.
//!
//! Identifier transforms split their input on `-`, `_`, whitespace and before every
//! uppercase letter. An acronym is therefore a run of one-letter words:
//! `to_snake_case("HTTPServer") == "h_t_t_p_server"`.

/// Splits an identifier into words.
pub fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();

    for c in input.chars() {
        if c == '-' || c == '_' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if c.is_uppercase() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(c);
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn to_upper(input: &str) -> String {
    input.to_uppercase()
}

pub fn to_lower(input: &str) -> String {
    input.to_lowercase()
}

/// Uppercases the first letter of every whitespace-separated word, leaving the rest as-is.
pub fn to_title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;
    for c in input.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn to_pascal_case(input: &str) -> String {
    split_words(input).iter().map(|w| capitalize(w)).collect()
}

pub fn to_camel_case(input: &str) -> String {
    split_words(input)
        .iter()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
        .collect()
}

pub fn to_snake_case(input: &str) -> String {
    join_lower(input, "_")
}

pub fn to_kebab_case(input: &str) -> String {
    join_lower(input, "-")
}

fn join_lower(input: &str, separator: &str) -> String {
    split_words(input).iter().map(|w| w.to_lowercase()).collect::<Vec<_>>().join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("my-app_name"), vec!["my", "app", "name"]);
        assert_eq!(split_words("myAppName"), vec!["my", "App", "Name"]);
        assert_eq!(split_words("--a__b--"), vec!["a", "b"]);
        assert!(split_words("").is_empty());
    }

    #[test]
    fn test_identifier_cases() {
        assert_eq!(to_snake_case("my-app"), "my_app");
        assert_eq!(to_kebab_case("MyApp"), "my-app");
        assert_eq!(to_pascal_case("my_app"), "MyApp");
        assert_eq!(to_camel_case("my-app"), "myApp");
        assert_eq!(to_camel_case("MyApp"), "myApp");
    }

    #[test]
    fn test_acronyms_split_per_letter() {
        assert_eq!(to_snake_case("HTTPServer"), "h_t_t_p_server");
        assert_eq!(to_kebab_case("APIKey"), "a-p-i-key");
        assert_eq!(to_pascal_case("HTTPServer"), "HTTPServer");
    }

    #[test]
    fn test_title_and_plain_cases() {
        assert_eq!(to_title_case("hello big world"), "Hello Big World");
        assert_eq!(to_upper("abc"), "ABC");
        assert_eq!(to_lower("AbC"), "abc");
    }
}
