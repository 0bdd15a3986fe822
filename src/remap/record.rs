use std::fmt;

use crate::remap::mapping::ClassMapping;

/// Minimum fields on a label line: class ID plus four geometry values.
pub const MIN_FIELDS: usize = 5;

/// One label line: class ID followed by its geometry fields, kept as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub class_id: String,
    pub fields: Vec<String>,
}

impl AnnotationRecord {
    /// Parse a label line. Lines with fewer than five fields yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let class_id = parts.next()?.to_string();
        let fields: Vec<String> = parts.map(str::to_string).collect();
        if fields.len() + 1 < MIN_FIELDS {
            return None;
        }
        Some(Self { class_id, fields })
    }

    /// New record with the class ID swapped, or `None` when unmapped.
    pub fn remapped(&self, mapping: &ClassMapping) -> Option<Self> {
        mapping.translate(&self.class_id).map(|to| Self {
            class_id: to.to_string(),
            fields: self.fields.clone(),
        })
    }
}

impl fmt::Display for AnnotationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class_id)?;
        for field in &self.fields {
            write!(f, " {}", field)?;
        }
        Ok(())
    }
}

/// Translate every line of a label file, dropping short and unmapped lines.
///
/// Returns the file body to write, or `None` when nothing survived.
pub fn remap_label_text(text: &str, mapping: &ClassMapping) -> Option<String> {
    let mut out = String::new();
    for record in text
        .lines()
        .filter_map(AnnotationRecord::parse)
        .filter_map(|r| r.remapped(mapping))
    {
        out.push_str(&record.to_string());
        out.push('\n');
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lines_are_malformed() {
        assert!(AnnotationRecord::parse("0 0.5 0.5 0.1").is_none());
        assert!(AnnotationRecord::parse("").is_none());
        let rec = AnnotationRecord::parse("  0\t0.5 0.5  0.1 0.1 ").unwrap();
        assert_eq!(rec.to_string(), "0 0.5 0.5 0.1 0.1");
    }

    #[test]
    fn extra_fields_are_preserved() {
        let mapping = ClassMapping::new([("2", "4")]);
        let rec = AnnotationRecord::parse("2 0.1 0.2 0.3 0.4 0.5 0.6").unwrap();
        assert_eq!(
            rec.remapped(&mapping).unwrap().to_string(),
            "4 0.1 0.2 0.3 0.4 0.5 0.6"
        );
    }

    #[test]
    fn only_mapped_lines_survive() {
        let mapping = ClassMapping::new([("0", "5")]);
        let body = remap_label_text("0 0.5 0.5 0.1 0.1\n9 0.1 0.1 0.1 0.1\n0 1\n", &mapping);
        assert_eq!(body.as_deref(), Some("5 0.5 0.5 0.1 0.1\n"));
        assert!(remap_label_text("9 0.1 0.1 0.1 0.1\n", &mapping).is_none());
    }
}
