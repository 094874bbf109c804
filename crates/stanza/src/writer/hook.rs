//! Output hook for literal sections.

/// Writes the content of a literal section into the rendered output.
///
/// The default [`Verbatim`] hook copies it unchanged. A specialized writer
/// can install its own hook (for example one that escapes markup) without
/// touching the rendering algorithm.
///
/// Any `Fn(&str, &str, &mut String)` closure taking the section name, the
/// raw text and the output buffer is a hook:
///
/// ```rust
/// use stanza::Template;
///
/// let template = Template::parse("<!-- ##RAW## --><b><!-- ##RAW## -->").unwrap();
/// let mut writer = template
///     .writer()
///     .with_literal_hook(|_: &str, raw: &str, out: &mut String| {
///         out.push_str(&raw.replace('<', "&lt;").replace('>', "&gt;"))
///     });
/// assert_eq!(writer.get_content(false), "&lt;b&gt;");
/// ```
pub trait LiteralHook: Send + Sync {
    fn write_literal(&self, name: &str, raw: &str, out: &mut String);
}

/// Copies literal content unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl LiteralHook for Verbatim {
    fn write_literal(&self, _name: &str, raw: &str, out: &mut String) {
        out.push_str(raw);
    }
}

impl<F> LiteralHook for F
where
    F: Fn(&str, &str, &mut String) + Send + Sync,
{
    fn write_literal(&self, name: &str, raw: &str, out: &mut String) {
        self(name, raw, out)
    }
}
