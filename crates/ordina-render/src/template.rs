//! `{placeholder}` substitution for the stamp text.

/// Placeholders understood in a stamp text template.
pub const KNOWN: [&str; 5] = ["number", "date", "time", "year", "location"];

/// Values substituted into a template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateValues {
    pub number: String,
    pub date: String,
    pub time: String,
    pub year: String,
    pub location: String,
}

impl TemplateValues {
    fn get(&self, name: &str) -> Option<&str> {
        match name {
            "number" => Some(&self.number),
            "date" => Some(&self.date),
            "time" => Some(&self.time),
            "year" => Some(&self.year),
            "location" => Some(&self.location),
            _ => None,
        }
    }
}

/// Names of every `{…}` placeholder in `template`, in order.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                names.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

/// Substitute known placeholders. Unknown ones are kept verbatim.
pub fn resolve(template: &str, values: &TemplateValues) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> TemplateValues {
        TemplateValues {
            number: "42/2025".into(),
            date: "07/03/2025".into(),
            time: "09:05:01".into(),
            year: "2025".into(),
            location: "Roma".into(),
        }
    }

    #[test]
    fn resolves_all_known() {
        let text = resolve("Prot. N° {number}\n{location}, {date} {time} ({year})", &values());
        assert_eq!(text, "Prot. N° 42/2025\nRoma, 07/03/2025 09:05:01 (2025)");
    }

    #[test]
    fn unknown_placeholders_kept() {
        assert_eq!(resolve("{number} {office}", &values()), "42/2025 {office}");
    }

    #[test]
    fn unclosed_brace_kept() {
        assert_eq!(resolve("N {number} {oops", &values()), "N 42/2025 {oops");
    }

    #[test]
    fn lists_placeholders() {
        assert_eq!(placeholders("{number} at {date}{x}"), vec!["number", "date", "x"]);
        assert!(placeholders("plain").is_empty());
    }
}
