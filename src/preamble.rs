//! `#version`/`#define` lines injected ahead of every stage source.

/// Ordered preamble directives.
///
/// Survives unload/load cycles; only [`Preamble::clear`] empties it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preamble {
    lines: Vec<String>,
}

impl Preamble {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `#version <version>`.
    pub fn add_version(&mut self, version: &str) {
        self.lines.push(format!("#version {}", version.trim()));
    }

    /// Appends `#define <name>`.
    pub fn add_define(&mut self, name: &str) {
        self.lines.push(format!("#define {}", name.trim()));
    }

    /// Appends `#define <name> <value>`.
    pub fn add_define_value(&mut self, name: &str, value: i32) {
        self.lines.push(format!("#define {} {}", name.trim(), value));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Concatenates the preamble and the given source chunks.
    pub fn apply<S: AsRef<str>>(&self, chunks: &[S]) -> String {
        let mut source = String::new();
        for line in &self.lines {
            source.push_str(line);
            source.push('\n');
        }
        for chunk in chunks {
            let chunk = chunk.as_ref();
            source.push_str(chunk);
            if !chunk.ends_with('\n') {
                source.push('\n');
            }
        }
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_keeps_insertion_order() {
        let mut preamble = Preamble::new();
        preamble.add_version("330 core");
        preamble.add_define("USE_FOG");
        preamble.add_define_value("LIGHTS", 4);
        let source = preamble.apply(&["void main() {}"]);
        assert_eq!(
            source,
            "#version 330 core\n#define USE_FOG\n#define LIGHTS 4\nvoid main() {}\n"
        );
    }

    #[test]
    fn test_clear_empties_preamble() {
        let mut preamble = Preamble::new();
        preamble.add_define("A");
        preamble.clear();
        assert!(preamble.is_empty());
        assert_eq!(preamble.apply(&["x\n", "y"]), "x\ny\n");
    }
}
