//! Rule-based fallback provider.
//!
//! Suggests idiomatic keywords and snippet openers from a static
//! per-language table. Never fails and supports every language, so the
//! chain can always end here.

use async_trait::async_trait;

use super::traits::CompletionProvider;
use crate::Result;
use crate::types::{CompletionRequest, Language, ProviderKind};

/// Maximum suggestions returned per request.
pub const MAX_RULE_SUGGESTIONS: usize = 5;

const PYTHON: &[&str] = &[
    "def ",
    "class ",
    "import ",
    "from ",
    "if __name__ == '__main__':",
    "try:",
    "except ",
    "finally:",
    "with ",
    "async def ",
    "await ",
    "return ",
    "yield ",
    "raise ",
    "assert ",
    "print(",
    "len(",
    "str(",
    "int(",
    "list(",
    "dict(",
    "set(",
    "tuple(",
];

const JAVASCRIPT: &[&str] = &[
    "function ",
    "const ",
    "let ",
    "var ",
    "if (",
    "for (",
    "while (",
    "try {",
    "catch (",
    "finally {",
    "async function ",
    "await ",
    "return ",
    "throw ",
    "console.log(",
    "console.error(",
    "console.warn(",
    "Array(",
    "Object(",
    "String(",
    "Number(",
    "Boolean(",
    "Date(",
    "Math.",
    "JSON.",
];

const TYPESCRIPT: &[&str] = &[
    "function ",
    "const ",
    "let ",
    "var ",
    "interface ",
    "type ",
    "enum ",
    "class ",
    "async function ",
    "await ",
    "return ",
    "throw ",
    "console.log(",
    "Array<",
    "Promise<",
    "Map<",
    "Set<",
    "Record<",
    "Partial<",
    "Required<",
    "Pick<",
    "Omit<",
];

const JAVA: &[&str] = &[
    "public class ",
    "public static void main(",
    "public void ",
    "private ",
    "protected ",
    "static ",
    "final ",
    "abstract ",
    "interface ",
    "enum ",
    "try {",
    "catch (",
    "finally {",
    "if (",
    "for (",
    "while (",
    "return ",
    "throw ",
    "System.out.println(",
    "System.out.print(",
    "new ",
    "super(",
    "this.",
];

const CPP: &[&str] = &[
    "#include <",
    "int main(",
    "std::",
    "class ",
    "struct ",
    "template <typename ",
    "namespace ",
    "auto ",
    "const ",
    "if (",
    "for (",
    "while (",
    "return ",
    "std::cout << ",
    "std::vector<",
    "std::string ",
    "std::unique_ptr<",
    "nullptr",
];

const CSHARP: &[&str] = &[
    "using ",
    "namespace ",
    "public class ",
    "public static void Main(",
    "private ",
    "protected ",
    "var ",
    "async Task ",
    "await ",
    "if (",
    "foreach (",
    "for (",
    "try {",
    "catch (",
    "return ",
    "throw new ",
    "Console.WriteLine(",
    "List<",
    "Dictionary<",
];

const GO: &[&str] = &[
    "func ",
    "package ",
    "import (",
    "type ",
    "struct {",
    "interface {",
    "var ",
    "const ",
    "if err != nil {",
    "for ",
    "range ",
    "return ",
    "defer ",
    "go ",
    "make(",
    "append(",
    "fmt.Println(",
    "fmt.Errorf(",
];

const RUST: &[&str] = &[
    "fn ",
    "let ",
    "let mut ",
    "pub fn ",
    "struct ",
    "enum ",
    "impl ",
    "trait ",
    "use ",
    "match ",
    "if let Some(",
    "for ",
    "while ",
    "return ",
    "Ok(",
    "Err(",
    "Some(",
    "Vec::new()",
    "String::from(",
    "println!(",
];

/// Static pattern table for `language`.
pub fn patterns(language: Language) -> &'static [&'static str] {
    match language {
        Language::Python => PYTHON,
        Language::Javascript => JAVASCRIPT,
        Language::Typescript => TYPESCRIPT,
        Language::Java => JAVA,
        Language::Cpp => CPP,
        Language::Csharp => CSHARP,
        Language::Go => GO,
        Language::Rust => RUST,
    }
}

/// Terminal fallback backed by [`patterns`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedProvider;

impl RuleBasedProvider {
    pub fn new() -> Self {
        Self
    }

    /// Table patterns not already present (case-insensitively) in the last
    /// line of the request, in table order, at most [`MAX_RULE_SUGGESTIONS`].
    pub fn suggestions(request: &CompletionRequest) -> Vec<String> {
        let last_line = request.last_line().to_lowercase();
        patterns(request.language())
            .iter()
            .filter(|pattern| !last_line.contains(&pattern.to_lowercase()))
            .take(MAX_RULE_SUGGESTIONS)
            .map(|pattern| (*pattern).to_owned())
            .collect()
    }
}

#[async_trait]
impl CompletionProvider for RuleBasedProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RuleBased
    }

    fn supports(&self, _language: Language) -> bool {
        true
    }

    async fn suggest(&self, request: &CompletionRequest) -> Result<Vec<String>> {
        Ok(Self::suggestions(request))
    }
}
