//! Non-fatal findings collected while decompiling a unit.

use std::fmt;

use nova_flow::BlockId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub block: Option<BlockId>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, block: Option<BlockId>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            block,
        }
    }

    pub fn warning(
        code: &'static str,
        message: impl Into<String>,
        block: Option<BlockId>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            block,
        }
    }

    pub fn info(code: &'static str, message: impl Into<String>, block: Option<BlockId>) -> Self {
        Self {
            severity: Severity::Info,
            code,
            message: message.into(),
            block,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(block) = self.block {
            write!(f, " (at {block})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompileDiagnosticKind {
    UnreachableBlock,
    FoldCapReached,
    FoldFailed,
    UnresolvedField,
    UnresolvedMethod,
    InferenceFailed,
}

impl DecompileDiagnosticKind {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            DecompileDiagnosticKind::UnreachableBlock => "DECOMPILE_UNREACHABLE",
            DecompileDiagnosticKind::FoldCapReached => "DECOMPILE_FOLD_CAP",
            DecompileDiagnosticKind::FoldFailed => "DECOMPILE_FOLD_FAILED",
            DecompileDiagnosticKind::UnresolvedField => "DECOMPILE_UNRESOLVED_FIELD",
            DecompileDiagnosticKind::UnresolvedMethod => "DECOMPILE_UNRESOLVED_METHOD",
            DecompileDiagnosticKind::InferenceFailed => "DECOMPILE_INFER_FAILED",
        }
    }
}

pub(crate) fn diagnostic(
    kind: DecompileDiagnosticKind,
    message: impl Into<String>,
    block: Option<BlockId>,
) -> Diagnostic {
    let code = kind.code();
    match kind {
        DecompileDiagnosticKind::UnreachableBlock => Diagnostic::info(code, message, block),
        DecompileDiagnosticKind::FoldCapReached
        | DecompileDiagnosticKind::FoldFailed
        | DecompileDiagnosticKind::UnresolvedField
        | DecompileDiagnosticKind::UnresolvedMethod
        | DecompileDiagnosticKind::InferenceFailed => Diagnostic::warning(code, message, block),
    }
}
