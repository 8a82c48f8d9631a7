use std::ops::Range;

use crate::core::ConvertError;

#[derive(Debug, Clone)]
struct Edit {
    range: Range<usize>,
    replacement: String,
}

/// Pending byte-range edits over an immutable text, applied in one pass.
///
/// Zero-width inserts at the same offset keep the order they were added in.
pub struct RewriteList<'a> {
    file: &'a str,
    text: &'a str,
    edits: Vec<Edit>,
}

impl<'a> RewriteList<'a> {
    pub fn new(file: &'a str, text: &'a str) -> Self {
        Self {
            file,
            text,
            edits: Vec::new(),
        }
    }

    pub fn replace(&mut self, range: Range<usize>, replacement: impl Into<String>) {
        self.edits.push(Edit {
            range,
            replacement: replacement.into(),
        });
    }

    pub fn insert(&mut self, offset: usize, text: impl Into<String>) {
        self.replace(offset..offset, text);
    }

    pub fn apply(mut self) -> Result<String, ConvertError> {
        self.edits
            .sort_by_key(|edit| (edit.range.start, edit.range.end));

        let extra: usize = self.edits.iter().map(|edit| edit.replacement.len()).sum();
        let mut out = String::with_capacity(self.text.len() + extra);
        let mut cursor = 0;

        for edit in &self.edits {
            if edit.range.start < cursor || edit.range.end > self.text.len() {
                return Err(ConvertError::OverlappingEdit {
                    file: self.file.to_string(),
                    offset: edit.range.start,
                });
            }
            out.push_str(&self.text[cursor..edit.range.start]);
            out.push_str(&edit.replacement);
            cursor = edit.range.end;
        }
        out.push_str(&self.text[cursor..]);

        Ok(out)
    }
}
