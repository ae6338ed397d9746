//! Render a `HintFile` back to the `.hint` text format

use std::fmt::{self, Write};

use super::model::{HintFile, TransformationRule};

impl HintFile {
    /// Text that parses back to an equivalent file
    pub fn to_hint_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for HintFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut has_metadata = false;
        let mut directive = |f: &mut fmt::Formatter<'_>, key: &str, value: &str| {
            has_metadata = true;
            writeln!(f, "<!{key}: {value}>")
        };

        if let Some(id) = &self.id {
            directive(f, "id", id)?;
        }
        if let Some(description) = &self.description {
            directive(f, "description", description)?;
        }
        if let Some(severity) = &self.severity {
            directive(f, "severity", severity)?;
        }
        if self.min_java_version != 0 {
            directive(f, "minJavaVersion", &self.min_java_version.to_string())?;
        }
        if !self.tags.is_empty() {
            directive(f, "tags", &self.tags.join(", "))?;
        }
        if !self.includes.is_empty() {
            directive(f, "include", &self.includes.join(", "))?;
        }

        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 || has_metadata {
                f.write_char('\n')?;
            }
            write_rule(f, rule)?;
        }
        Ok(())
    }
}

fn write_rule(f: &mut fmt::Formatter<'_>, rule: &TransformationRule) -> fmt::Result {
    if let Some(description) = &rule.description {
        writeln!(f, "\"{description}\":")?;
    }

    f.write_str(&rule.source_pattern.text)?;
    if let Some(guard) = &rule.source_guard {
        write!(f, " :: {guard}")?;
    }
    f.write_char('\n')?;

    if let Some(imports) = &rule.imports {
        for name in &imports.add_imports {
            writeln!(f, "addImport {name}")?;
        }
        for name in &imports.remove_imports {
            writeln!(f, "removeImport {name}")?;
        }
        for name in &imports.add_static_imports {
            writeln!(f, "addStaticImport {name}")?;
        }
        for name in &imports.remove_static_imports {
            writeln!(f, "removeStaticImport {name}")?;
        }
    }

    let spell_out_otherwise = rule.alternatives.len() > 1;
    for alternative in &rule.alternatives {
        write!(f, "=> {}", alternative.replacement)?;
        match &alternative.guard {
            Some(guard) => write!(f, " :: {guard}")?,
            None if spell_out_otherwise => f.write_str(" :: otherwise")?,
            None => {}
        }
        f.write_char('\n')?;
    }

    f.write_str(";;\n")
}
