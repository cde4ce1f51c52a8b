//! Text-transform functions available inside every template
//!
//! | name          | effect                                   | example                     |
//! |---------------|------------------------------------------|-----------------------------|
//! | `tolower`     | lower case                               | `MyApi` -> `myapi`          |
//! | `toupper`     | upper case                               | `my_api` -> `MY_API`        |
//! | `tocamel`     | lowerCamelCase                           | `my_field` -> `myField`     |
//! | `topascal`    | UpperCamelCase                           | `order-api` -> `OrderApi`   |
//! | `toplural`    | English plural of the last word          | `box` -> `boxes`            |
//! | `topackage`   | valid Go package name                    | `My-Service_v2` -> `myservicev2` |
//! | `tosnakecase` | snake_case                               | `OrderApi` -> `order_api`   |
//!
//! Pluralization is rule based and independent of locale, applied in order:
//! uncountable words are unchanged; a fixed table of irregular nouns;
//! a fixed list of `f`/`fe` nouns take `ves`; consonant + `y` takes `ies`;
//! words ending in `s`, `x`, `z`, `ch` or `sh` take `es`; everything else
//! takes `s`.

use handlebars::{handlebars_helper, Handlebars};
use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};

/// Names of every registered helper
pub const VOCABULARY: [&str; 7] = [
    "tolower",
    "toupper",
    "tocamel",
    "topascal",
    "toplural",
    "topackage",
    "tosnakecase",
];

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "fish",
    "information",
    "metadata",
    "news",
    "series",
    "sheep",
    "species",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("datum", "data"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("man", "men"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    ("person", "people"),
    ("tooth", "teeth"),
    ("woman", "women"),
];

const F_TO_VES: &[&str] = &[
    "calf", "elf", "half", "knife", "leaf", "life", "loaf", "self", "shelf", "thief", "wife",
    "wolf",
];

const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

pub fn to_camel(s: &str) -> String {
    s.to_lower_camel_case()
}

pub fn to_pascal(s: &str) -> String {
    s.to_upper_camel_case()
}

pub fn to_snake(s: &str) -> String {
    s.to_snake_case()
}

/// Pluralize the last word of `s`, keeping everything before it
pub fn to_plural(s: &str) -> String {
    let split = s
        .char_indices()
        .rev()
        .find(|(_, c)| !c.is_alphanumeric())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let (head, word) = s.split_at(split);
    if word.is_empty() {
        return s.to_string();
    }
    format!("{}{}", head, pluralize_word(word))
}

fn pluralize_word(word: &str) -> String {
    let lower = word.to_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return match_case(word, plural);
    }
    if F_TO_VES.contains(&lower.as_str()) {
        let cut = if lower.ends_with("fe") { 2 } else { 1 };
        return format!("{}{}", &word[..word.len() - cut], suffix(word, "ves"));
    }

    let mut chars = lower.chars().rev();
    let last = chars.next();
    let before_last = chars.next();

    if last == Some('y') && before_last.is_some_and(|c| !"aeiou".contains(c)) {
        return format!("{}{}", &word[..word.len() - 1], suffix(word, "ies"));
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|end| lower.ends_with(end)) {
        return format!("{}{}", word, suffix(word, "es"));
    }
    format!("{}{}", word, suffix(word, "s"))
}

fn is_all_upper(word: &str) -> bool {
    word.chars().any(char::is_alphabetic) && !word.chars().any(char::is_lowercase)
}

/// Suffix in upper case when the word is written in upper case
fn suffix(word: &str, ending: &str) -> String {
    if is_all_upper(word) && word.chars().count() > 1 {
        ending.to_uppercase()
    } else {
        ending.to_string()
    }
}

/// Carry the capitalization of `word` over to `replacement`
fn match_case(word: &str, replacement: &str) -> String {
    if is_all_upper(word) && word.chars().count() > 1 {
        return replacement.to_uppercase();
    }
    let mut chars = replacement.chars();
    match (word.chars().next(), chars.next()) {
        (Some(first), Some(rep_first)) if first.is_uppercase() => {
            rep_first.to_uppercase().collect::<String>() + chars.as_str()
        }
        _ => replacement.to_string(),
    }
}

/// Sanitize a string into a Go package name
///
/// Keeps ASCII letters and digits in lower case. A leading digit or a
/// keyword gets a `pkg` prefix and an empty result becomes `main`.
pub fn to_package(s: &str) -> String {
    let mut name: String = s
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if name.is_empty() {
        return "main".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) || GO_KEYWORDS.contains(&name.as_str()) {
        name.insert_str(0, "pkg");
    }
    name
}

handlebars_helper!(tolower: |s: str| s.to_lowercase());
handlebars_helper!(toupper: |s: str| s.to_uppercase());
handlebars_helper!(tocamel: |s: str| to_camel(s));
handlebars_helper!(topascal: |s: str| to_pascal(s));
handlebars_helper!(toplural: |s: str| to_plural(s));
handlebars_helper!(topackage: |s: str| to_package(s));
handlebars_helper!(tosnakecase: |s: str| to_snake(s));

/// Register the whole vocabulary on a registry
pub fn register(registry: &mut Handlebars<'_>) {
    registry.register_helper("tolower", Box::new(tolower));
    registry.register_helper("toupper", Box::new(toupper));
    registry.register_helper("tocamel", Box::new(tocamel));
    registry.register_helper("topascal", Box::new(topascal));
    registry.register_helper("toplural", Box::new(toplural));
    registry.register_helper("topackage", Box::new(topackage));
    registry.register_helper("tosnakecase", Box::new(tosnakecase));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_camel("my_field"), "myField");
        assert_eq!(to_camel("order-api"), "orderApi");
        assert_eq!(to_pascal("order-api"), "OrderApi");
        assert_eq!(to_pascal("my_project_name"), "MyProjectName");
        assert_eq!(to_snake("OrderApi"), "order_api");
        assert_eq!(to_snake("user-auth-service"), "user_auth_service");
    }

    #[test]
    fn test_plural_rules() {
        assert_eq!(to_plural("box"), "boxes");
        assert_eq!(to_plural("account"), "accounts");
        assert_eq!(to_plural("category"), "categories");
        assert_eq!(to_plural("key"), "keys");
        assert_eq!(to_plural("match"), "matches");
        assert_eq!(to_plural("address"), "addresses");
        assert_eq!(to_plural("leaf"), "leaves");
        assert_eq!(to_plural("knife"), "knives");
    }

    #[test]
    fn test_plural_irregular_and_uncountable() {
        assert_eq!(to_plural("person"), "people");
        assert_eq!(to_plural("Child"), "Children");
        assert_eq!(to_plural("metadata"), "metadata");
        assert_eq!(to_plural("sheep"), "sheep");
    }

    #[test]
    fn test_plural_last_word_only() {
        assert_eq!(to_plural("order_item"), "order_items");
        assert_eq!(to_plural("user-category"), "user-categories");
        assert_eq!(to_plural("BOX"), "BOXES");
        assert_eq!(to_plural(""), "");
        assert_eq!(to_plural("item_"), "item_");
    }

    #[test]
    fn test_package_sanitizing() {
        assert_eq!(to_package("My-Service_v2"), "myservicev2");
        assert_eq!(to_package("billing"), "billing");
        assert_eq!(to_package("2fa-service"), "pkg2faservice");
        assert_eq!(to_package("type"), "pkgtype");
        assert_eq!(to_package("--"), "main");
    }

    #[test]
    fn test_registered_helpers_render() {
        let mut registry = Handlebars::new();
        register(&mut registry);
        for name in VOCABULARY {
            let rendered = registry
                .render_template(&format!("{{{{{} \"Order item\"}}}}", name), &())
                .unwrap();
            assert!(!rendered.is_empty(), "helper {} rendered nothing", name);
        }

        let out = registry
            .render_template("{{tocamel \"my_field\"}} {{toplural \"box\"}}", &())
            .unwrap();
        assert_eq!(out, "myField boxes");
    }
}
