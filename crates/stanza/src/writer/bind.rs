//! Binding whole records into the current section.

use crate::error::Result;
use crate::fields::FieldSource;

use super::Writer;

impl Writer {
    /// Binds every field `source` yields to the current section.
    ///
    /// Fields the section does not declare, and values rejected by a
    /// [`FieldRule`](crate::FieldRule), are skipped. Returns the number of
    /// fields bound.
    pub fn set_fields<S: FieldSource + ?Sized>(&mut self, source: &S) -> usize {
        let mut bound = 0;
        for (name, value) in source.fields() {
            let value = match self.rules.get(&name) {
                Some(rule) => match rule.apply(&value) {
                    Some(value) => value,
                    None => {
                        tracing::debug!(field = %name, value = %value, "value rejected by field rule");
                        continue;
                    }
                },
                None => value,
            };

            match self.set_field(&name, value) {
                Ok(()) => bound += 1,
                Err(err) => tracing::debug!(field = %name, "skipping field: {}", err),
            }
        }
        bound
    }

    /// Writes one occurrence of child section `section` per item, then
    /// leaves the section. Returns the number of occurrences written.
    ///
    /// # Errors
    ///
    /// [`Error::SectionNotFound`](crate::Error::SectionNotFound) if the current
    /// section has no such child.
    pub fn set_section_fields<I>(&mut self, section: &str, items: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: FieldSource,
    {
        self.select_section(section)?;
        let mut count = 0;
        for item in items {
            self.set_fields(&item);
            self.append_section(false)?;
            count += 1;
        }
        self.deselect_section()?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use crate::{Error, FieldRule, Template, Writer};

    fn writer(source: &str) -> Writer {
        Template::parse(source).unwrap().writer()
    }

    #[test]
    fn undeclared_fields_skipped() {
        let mut writer = writer("@@a@@-@@b@@");
        let bound = writer.set_fields(&json!({"a": 1, "b": "two", "c": 3}));
        assert_eq!(bound, 2);
        assert_eq!(writer.render(), "1-two");
    }

    #[test]
    fn pairs_as_source() {
        let mut writer = writer("@@a@@@@b@@");
        assert_eq!(writer.set_fields(&[("a", "x"), ("b", "y")]), 2);
        assert_eq!(writer.render(), "xy");
    }

    #[test]
    fn section_rows() {
        let mut writer = writer("<table>\n<!-- @@ROW@@ -->\n<tr>@@id@@</tr>\n<!-- @@ROW@@ -->\n</table>\n");
        let rows: Vec<BTreeMap<&str, i32>> = (1..=3).map(|id| [("id", id)].into()).collect();

        assert_eq!(writer.set_section_fields("ROW", &rows).unwrap(), 3);
        assert_eq!(writer.depth(), 1);
        assert_eq!(
            writer.render(),
            "<table>\n<tr>1</tr>\n<tr>2</tr>\n<tr>3</tr>\n</table>\n"
        );
    }

    #[test]
    fn missing_section_fails() {
        let mut writer = writer("@@a@@");
        let rows: Vec<serde_json::Value> = Vec::new();
        assert_eq!(
            writer.set_section_fields("ROW", rows).unwrap_err(),
            Error::SectionNotFound("ROW".to_string())
        );
    }

    #[test]
    fn flag_rule() {
        let mut writer =
            writer("<input @@on@@>").with_field_rule("on", FieldRule::checked());
        writer.set_fields(&json!({"on": true}));
        assert_eq!(writer.render(), "<input checked>");

        writer.set_fields(&json!({"on": false}));
        assert_eq!(writer.render(), "<input >");
    }

    #[test]
    fn choice_rule_rejects_unknown_values() {
        let mut writer = writer("[@@color@@]");
        writer.configure_field("color", FieldRule::choice(["red", "green"]));

        assert_eq!(writer.set_fields(&json!({"color": "blue"})), 0);
        assert_eq!(writer.render(), "[]");

        assert_eq!(writer.set_fields(&json!({"color": "red"})), 1);
        assert_eq!(writer.render(), "[red]");
    }

    #[test]
    fn rules_do_not_affect_set_field() {
        let mut writer =
            writer("[@@color@@]").with_field_rule("color", FieldRule::choice(["red"]));
        writer.set_field("color", "blue").unwrap();
        assert_eq!(writer.render(), "[blue]");
    }
}
