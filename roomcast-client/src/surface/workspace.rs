use roomcast_core::CodeEvent;
use std::collections::BTreeMap;

pub const DEFAULT_FILE: &str = "main.js";
pub const DEFAULT_LANGUAGE: &str = "javascript";
pub const DEFAULT_CONTENT: &str = "// Start coding collaboratively...\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFile {
    pub content: String,
    pub language: String,
}

/// Files of a code room. Every event replaces whatever it names.
#[derive(Debug, Clone)]
pub struct Workspace {
    files: BTreeMap<String, CodeFile>,
}

impl Default for Workspace {
    fn default() -> Self {
        let mut files = BTreeMap::new();
        files.insert(
            DEFAULT_FILE.to_owned(),
            CodeFile {
                content: DEFAULT_CONTENT.to_owned(),
                language: DEFAULT_LANGUAGE.to_owned(),
            },
        );
        Self { files }
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &CodeEvent) {
        match event {
            CodeEvent::FileAdd { name, content } | CodeEvent::FileEdit { name, content } => {
                let language = self
                    .files
                    .get(name)
                    .map(|file| file.language.clone())
                    .unwrap_or_else(|| language_for(name).to_owned());
                self.files.insert(
                    name.clone(),
                    CodeFile {
                        content: content.clone(),
                        language,
                    },
                );
            }
            CodeEvent::FileDelete { name } => {
                self.files.remove(name);
            }
            CodeEvent::LanguageChange { name, language } => {
                if let Some(file) = self.files.get_mut(name) {
                    file.language = language.clone();
                }
            }
        }
    }

    pub fn file(&self, name: &str) -> Option<&CodeFile> {
        self.files.get(name)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Editor language guessed from a file extension.
pub fn language_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js" | "mjs" | "cjs") => "javascript",
        Some("ts") => "typescript",
        Some("py") => "python",
        Some("rs") => "rust",
        Some("go") => "go",
        Some("java") => "java",
        Some("c" | "h") => "c",
        Some("cpp" | "cc" | "hpp") => "cpp",
        Some("html") => "html",
        Some("css") => "css",
        Some("json") => "json",
        Some("md") => "markdown",
        _ => "plaintext",
    }
}
